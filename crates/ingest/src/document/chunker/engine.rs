//! Greedy, structure-preserving packing of a node tree into chunks.
//!
//! A subtree that fits the budget becomes exactly one chunk. A subtree that
//! does not is packed child by child, each chunk re-carrying the ancestor
//! prefix. Only a leaf that is too large on its own is cut into fixed token
//! windows.

use docflow_core::config::validate_window;
use docflow_core::DocflowError;
use tracing::{debug, warn};

use super::helpers::{file_name_prefix, page_number, refine_section, simple_chunks};
use super::postprocess::coalesce;
use super::types::{Chunk, ChunkOptions, ChunkOutput, ChunkStats};
use crate::document::tree::Node;
use crate::tokenizer::Tokenizer;

/// Chunk the tree rooted at `root`.
pub fn chunk_tree<T: Tokenizer>(
    root: &Node,
    tokenizer: &T,
    file_name: Option<&str>,
    opts: &ChunkOptions,
) -> Result<ChunkOutput, DocflowError> {
    validate_window(opts.chunk_size, opts.overlap)?;

    let prefix = if opts.include_file_name {
        file_name_prefix(file_name)
    } else {
        String::new()
    };

    let mut packer = Packer {
        tokenizer,
        chunk_size: opts.chunk_size,
        overlap: opts.overlap,
        chunks: Vec::new(),
        simple_chunking: 0,
    };
    packer.pack(root, &prefix);

    let stats = ChunkStats {
        simple_chunking: packer.simple_chunking,
        total_nodes: 0,
        pre_merge_chunks: packer.chunks.len(),
    };
    if stats.simple_chunking > 0 {
        warn!(
            blocks = stats.simple_chunking,
            chunk_size = opts.chunk_size,
            "Blocks exceeded the chunk size and were split into token windows"
        );
    }

    let chunks = if opts.postprocess {
        coalesce(packer.chunks, opts.chunk_size, tokenizer)
    } else {
        packer.chunks
    };
    debug!(
        chunks = chunks.len(),
        pre_merge = stats.pre_merge_chunks,
        "Chunking complete"
    );

    Ok(ChunkOutput { chunks, stats })
}

struct Packer<'t, T: Tokenizer> {
    tokenizer: &'t T,
    chunk_size: usize,
    overlap: usize,
    chunks: Vec<Chunk>,
    simple_chunking: usize,
}

/// Children committed to the chunk being built.
struct Pending {
    text: String,
    included: usize,
    min_page: i32,
    max_page: i32,
}

impl Pending {
    fn new(prefix: &str) -> Self {
        Self {
            text: prefix.to_string(),
            included: 0,
            min_page: i32::MAX,
            max_page: i32::MIN,
        }
    }

    fn commit(&mut self, text: String, child: &Node) {
        self.text = text;
        self.included += 1;
        self.min_page = self.min_page.min(child.page_idx);
        self.max_page = self.max_page.max(child.max_page_idx);
    }
}

impl<T: Tokenizer> Packer<'_, T> {
    fn fits(&self, text: &str) -> bool {
        self.tokenizer.count(text) <= self.chunk_size
    }

    /// `prefix` is empty or ends with a newline.
    fn pack(&mut self, node: &Node, prefix: &str) {
        let candidate = format!("{prefix}{}", node.subtree_text);

        if self.fits(&candidate) {
            self.chunks.push(Chunk {
                content: candidate,
                start_page: page_number(node.page_idx),
                end_page: page_number(node.max_page_idx),
                section_info: vec![refine_section(prefix)],
            });
            return;
        }

        if node.children.is_empty() {
            self.simple_chunking += 1;
            let section = refine_section(prefix);
            for window in simple_chunks(self.tokenizer, &candidate, self.chunk_size, self.overlap) {
                self.chunks.push(Chunk {
                    content: window,
                    start_page: page_number(node.page_idx),
                    end_page: page_number(node.max_page_idx),
                    section_info: vec![section.clone()],
                });
            }
            return;
        }

        let prefix = format!("{prefix}{}\n", node.node_text);
        let mut pending = Pending::new(&prefix);
        let mut idx = 0;
        while idx < node.children.len() {
            let child = &node.children[idx];
            let attempt = format!("{}{}\n", pending.text, child.subtree_text);
            if self.fits(&attempt) {
                pending.commit(attempt, child);
                idx += 1;
            } else if pending.included == 0 {
                // Too big even alone: let the child split itself.
                self.pack(child, &prefix);
                idx += 1;
            } else {
                self.flush(std::mem::replace(&mut pending, Pending::new(&prefix)), &prefix);
            }
        }
        if pending.included > 0 {
            self.flush(pending, &prefix);
        }
    }

    fn flush(&mut self, pending: Pending, prefix: &str) {
        let start_page = page_number(pending.min_page);
        self.chunks.push(Chunk {
            content: pending.text,
            start_page,
            end_page: page_number(pending.max_page).max(start_page),
            section_info: vec![refine_section(prefix)],
        });
    }
}
