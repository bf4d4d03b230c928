//! Layout-aware document ingestion: block streams from a layout parser are
//! rebuilt into a document tree and packed into token-bounded chunks that
//! keep their section context and page range. XML documents are chunked
//! structurally. Chunks can then be embedded in order.

pub mod document;
pub mod embedding;
pub mod parser;
pub mod pipeline;
pub mod tokenizer;
pub mod xml;

pub use document::chunker::{Chunk, ChunkOptions, ChunkOutput, ChunkStats};
pub use document::{parse_block_json, BlockRecord, DocTree, Document, TreeOptions};
pub use pipeline::{EmbeddedChunk, PipelineError};
pub use tokenizer::{DelimiterTokenizer, Tokenizer};
pub use xml::{chunk_xml, XmlChunk};
