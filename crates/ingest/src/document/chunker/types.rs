//! Chunk options and output types.

use docflow_core::config::ChunkingConfig;
use serde::{Deserialize, Serialize};

// ── Options ─────────────────────────────────────────────────────────────────

/// Options for one `get_chunks` run.
#[derive(Debug, Clone)]
pub struct ChunkOptions {
    /// Maximum tokens per chunk (default: 4096).
    pub chunk_size: usize,
    /// Token back-step between windows when a single block is too large (default: 50).
    pub overlap: usize,
    /// Coalesce adjacent chunks that fit together (default: true).
    pub postprocess: bool,
    /// Prefix every chunk with the file name, minus a `.pdf` extension (default: true).
    pub include_file_name: bool,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            chunk_size: 4096,
            overlap: 50,
            postprocess: true,
            include_file_name: true,
        }
    }
}

impl From<&ChunkingConfig> for ChunkOptions {
    fn from(config: &ChunkingConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            overlap: config.overlap,
            postprocess: config.postprocess,
            include_file_name: config.include_file_name,
        }
    }
}

// ── Chunk output ────────────────────────────────────────────────────────────

/// A token-bounded piece of a document with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    /// 1-based first page.
    pub start_page: u32,
    /// 1-based last page, never before `start_page`.
    pub end_page: u32,
    /// Breadcrumbs (`"file > Section > Subsection"`) of the sections the chunk draws from.
    pub section_info: Vec<String>,
}

/// Diagnostics for one chunking run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChunkStats {
    /// Blocks that had to be cut into fixed token windows.
    pub simple_chunking: usize,
    /// Nodes in the tree, root included.
    pub total_nodes: usize,
    /// Chunk count before coalescing.
    pub pre_merge_chunks: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ChunkOutput {
    pub chunks: Vec<Chunk>,
    pub stats: ChunkStats,
}
