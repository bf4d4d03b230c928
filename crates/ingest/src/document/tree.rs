//! Token-aware node tree.
//!
//! A [`DocTree`] mirrors the layout tree from the top level down, caching
//! each node's own text, its whole-subtree text and the subtree's token
//! count so the chunking engine never has to re-render blocks.

use std::fmt::Write as _;

use docflow_core::config::ChunkingConfig;
use docflow_core::DocflowError;
use tracing::debug;

use super::block::BlockId;
use super::chunker::{self, ChunkOptions, ChunkOutput};
use super::record::BlockTag;
use super::Document;
use crate::tokenizer::Tokenizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeTag {
    Root,
    Block(BlockTag),
}

impl std::fmt::Display for NodeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeTag::Root => f.write_str("root"),
            NodeTag::Block(tag) => f.write_str(tag.as_str()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub tag: NodeTag,
    pub page_idx: i32,
    /// Largest page index anywhere in this subtree.
    pub max_page_idx: i32,
    pub node_text: String,
    pub subtree_text: String,
    /// `None` when the tree was built without a tokenizer.
    pub subtree_token_count: Option<usize>,
    pub children: Vec<Node>,
}

impl Node {
    fn count(&self) -> usize {
        1 + self.children.iter().map(Node::count).sum::<usize>()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TreeOptions {
    /// Accepted for compatibility with existing configs; every block child
    /// maps to one node child either way.
    pub section_only_chunking: bool,
    /// Put blocks that precede the first header under the root too, so
    /// preamble text is chunked instead of dropped. Off by default: the root
    /// holds the top-level sections only.
    pub include_preamble: bool,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            section_only_chunking: true,
            include_preamble: false,
        }
    }
}

impl From<&ChunkingConfig> for TreeOptions {
    fn from(config: &ChunkingConfig) -> Self {
        Self {
            section_only_chunking: config.section_only,
            include_preamble: config.include_preamble,
        }
    }
}

pub struct DocTree<'a, T: Tokenizer> {
    doc: &'a Document,
    tokenizer: Option<&'a T>,
    file_name: Option<String>,
    options: TreeOptions,
    root: Node,
    total_nodes: usize,
}

impl<'a, T: Tokenizer> DocTree<'a, T> {
    pub fn new(
        doc: &'a Document,
        tokenizer: Option<&'a T>,
        file_name: Option<String>,
        options: TreeOptions,
    ) -> Self {
        let tops: Vec<BlockId> = if options.include_preamble {
            doc.top_level_blocks().to_vec()
        } else {
            doc.top_sections().to_vec()
        };

        let children: Vec<Node> = tops
            .into_iter()
            .map(|id| build_node(doc, id, tokenizer))
            .collect();

        let mut subtree_text = String::new();
        let mut max_page_idx = 0;
        for child in &children {
            subtree_text.push_str(&child.subtree_text);
            subtree_text.push('\n');
            max_page_idx = max_page_idx.max(child.max_page_idx);
        }
        let subtree_token_count = tokenizer.map(|t| t.count(&subtree_text));

        let root = Node {
            tag: NodeTag::Root,
            page_idx: 0,
            max_page_idx,
            node_text: String::new(),
            subtree_text,
            subtree_token_count,
            children,
        };
        let total_nodes = root.count();
        debug!(total_nodes, file = ?file_name, "Node tree built");

        Self {
            doc,
            tokenizer,
            file_name,
            options,
            root,
            total_nodes,
        }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn document(&self) -> &Document {
        self.doc
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn options(&self) -> TreeOptions {
        self.options
    }

    /// Node count including the root.
    pub fn total_nodes(&self) -> usize {
        self.total_nodes
    }

    pub fn sections(&self) -> Vec<BlockId> {
        self.doc.sections()
    }

    pub fn top_sections(&self) -> &[BlockId] {
        self.doc.top_sections()
    }

    pub fn tables(&self) -> Vec<BlockId> {
        self.doc.tables()
    }

    /// Without duplicates this is the root's cached subtree text.
    pub fn to_text(&self, include_duplicates: bool) -> String {
        if include_duplicates {
            self.doc.to_text(true)
        } else {
            self.root.subtree_text.clone()
        }
    }

    pub fn to_html(&self, include_duplicates: bool) -> String {
        self.doc.to_html(include_duplicates)
    }

    /// One line per node: `tag (tokens) - [child (tokens), ...]`.
    pub fn outline(&self) -> String {
        let mut out = String::new();
        outline_into(&self.root, &mut out);
        out
    }

    /// Pack the tree into token-bounded chunks.
    pub fn get_chunks(&self, opts: &ChunkOptions) -> Result<ChunkOutput, DocflowError> {
        let tokenizer = self.tokenizer.ok_or_else(|| {
            DocflowError::Configuration(
                "chunking needs a tree built with a tokenizer".to_string(),
            )
        })?;
        let mut output = chunker::chunk_tree(&self.root, tokenizer, self.file_name.as_deref(), opts)?;
        output.stats.total_nodes = self.total_nodes;
        Ok(output)
    }
}

fn build_node<T: Tokenizer>(doc: &Document, id: BlockId, tokenizer: Option<&T>) -> Node {
    let tree = doc.tree();
    let block = tree.block(id);
    let children: Vec<Node> = block
        .children()
        .iter()
        .map(|&c| build_node(doc, c, tokenizer))
        .collect();

    let subtree_text = tree.to_text(id, true, true);
    let max_page_idx = children
        .iter()
        .map(|c| c.max_page_idx)
        .fold(block.page_idx, i32::max);

    Node {
        tag: block.kind.tag().map_or(NodeTag::Root, NodeTag::Block),
        page_idx: block.page_idx,
        max_page_idx,
        node_text: tree.to_text(id, false, false),
        subtree_token_count: tokenizer.map(|t| t.count(&subtree_text)),
        subtree_text,
        children,
    }
}

fn outline_into(node: &Node, out: &mut String) {
    let label = |n: &Node| match n.subtree_token_count {
        Some(count) => format!("{} ({count})", n.tag),
        None => n.tag.to_string(),
    };
    let children: Vec<String> = node.children.iter().map(label).collect();
    let _ = writeln!(out, "{} - [{}]", label(node), children.join(", "));
    for child in &node.children {
        outline_into(child, out);
    }
}
