//! Structure-aware chunking engine.
//!
//! Packs a token-aware node tree into chunks of at most `chunk_size` tokens,
//! keeping whole blocks together whenever they fit, prefixing each chunk with
//! its file name and section breadcrumb, and falling back to overlapping
//! token windows only for single blocks that are too large on their own.

mod engine;
mod helpers;
mod postprocess;
mod types;

pub use engine::chunk_tree;
pub use postprocess::coalesce;
pub use types::{Chunk, ChunkOptions, ChunkOutput, ChunkStats};
