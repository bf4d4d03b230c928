//! Entry points used by the document-management side: blocks or XML in,
//! chunks (and optionally embedded chunk records) out.
//!
//! Tree building and chunking are CPU-bound and run on the blocking pool;
//! only the parser call and the embedding dispatch are awaited directly.

use std::sync::Arc;

use docflow_core::config::ChunkingConfig;
use docflow_core::DocflowError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use crate::document::chunker::{Chunk, ChunkOptions, ChunkOutput};
use crate::document::record::BlockRecord;
use crate::document::{DocTree, Document, FileKind, TreeOptions, ValidationError};
use crate::embedding::{embed_in_order, Embedder, EmbeddingError};
use crate::parser::{BlockSource, DocumentSource, ParserError};
use crate::tokenizer::Tokenizer;
use crate::xml::{chunk_xml, XmlChunk};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Docflow(#[from] DocflowError),

    #[error(transparent)]
    Parser(#[from] ParserError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("No valid content found in {0}. Check the file format.")]
    EmptyDocument(String),

    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// One embedded chunk, ready for a vector store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddedChunk {
    pub chunk_id: Uuid,
    pub file_name: String,
    pub content_type: FileKind,
    pub raw_text: String,
    pub start_page: Option<u32>,
    pub end_page: Option<u32>,
    pub section_info: Vec<String>,
    pub embedding: Vec<f32>,
}

// ── Chunking ────────────────────────────────────────────────────────────────

/// Build the layout tree for `records` and chunk it.
pub fn chunk_blocks<T: Tokenizer>(
    records: &[BlockRecord],
    file_name: &str,
    tokenizer: &T,
    config: &ChunkingConfig,
) -> Result<ChunkOutput, DocflowError> {
    config.validate()?;
    let doc = Document::from_records(records)?;
    let tree = DocTree::new(
        &doc,
        Some(tokenizer),
        Some(file_name.to_string()),
        TreeOptions::from(config),
    );
    tree.get_chunks(&ChunkOptions::from(config))
}

/// Send `input` through the layout parser and chunk the result.
pub async fn parse_and_chunk<T>(
    source: &dyn BlockSource,
    input: &DocumentSource,
    tokenizer: Arc<T>,
    config: &ChunkingConfig,
) -> Result<ChunkOutput, PipelineError>
where
    T: Tokenizer + 'static,
{
    config.validate()?;
    let file_name = input.file_name();
    let bytes = input.load().await?;
    let records = source.fetch_blocks(&file_name, bytes).await?;

    let config = config.clone();
    let name = file_name.clone();
    let output = tokio::task::spawn_blocking(move || {
        chunk_blocks(&records, &name, tokenizer.as_ref(), &config)
    })
    .await??;

    ensure_pdf_content(&output.chunks, &file_name)?;
    info!(
        file = %file_name,
        chunks = output.chunks.len(),
        simple_chunking = output.stats.simple_chunking,
        total_nodes = output.stats.total_nodes,
        "Document chunked"
    );
    Ok(output)
}

/// Chunk an XML document on the blocking pool.
pub async fn chunk_xml_document<T>(
    xml: String,
    file_name: String,
    tokenizer: Arc<T>,
    max_chunk_size: usize,
) -> Result<Vec<XmlChunk>, PipelineError>
where
    T: Tokenizer + 'static,
{
    let name = file_name.clone();
    let chunks = tokio::task::spawn_blocking(move || {
        chunk_xml(&xml, &name, tokenizer.as_ref(), max_chunk_size)
    })
    .await?
    .inspect_err(|e| error!(file = %file_name, error = %e, "XML chunking failed"))?;

    if chunks.is_empty() {
        return Err(PipelineError::EmptyDocument(file_name));
    }
    info!(file = %file_name, chunks = chunks.len(), "XML chunked");
    Ok(chunks)
}

/// A PDF whose only chunk is blank or its own file name carried no text.
pub fn ensure_pdf_content(chunks: &[Chunk], file_name: &str) -> Result<(), PipelineError> {
    let stem = file_name.strip_suffix(".pdf").unwrap_or(file_name).trim();
    let empty = match chunks {
        [] => true,
        [only] => {
            let content = only.content.trim();
            content.is_empty() || content == stem
        }
        _ => false,
    };
    if empty {
        return Err(PipelineError::EmptyDocument(file_name.to_string()));
    }
    Ok(())
}

// ── Embedding ───────────────────────────────────────────────────────────────

pub async fn embed_pdf_chunks<E>(
    embedder: &E,
    chunks: &[Chunk],
    file_name: &str,
    concurrency: usize,
) -> Result<Vec<EmbeddedChunk>, PipelineError>
where
    E: Embedder + ?Sized,
{
    ensure_pdf_content(chunks, file_name)?;
    let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
    let vectors = embed_in_order(embedder, &texts, concurrency).await?;

    Ok(chunks
        .iter()
        .zip(vectors)
        .map(|(chunk, embedding)| EmbeddedChunk {
            chunk_id: Uuid::new_v4(),
            file_name: file_name.to_string(),
            content_type: FileKind::Pdf,
            raw_text: chunk.content.clone(),
            start_page: Some(chunk.start_page),
            end_page: Some(chunk.end_page),
            section_info: chunk.section_info.clone(),
            embedding,
        })
        .collect())
}

pub async fn embed_xml_chunks<E>(
    embedder: &E,
    chunks: &[XmlChunk],
    concurrency: usize,
) -> Result<Vec<EmbeddedChunk>, PipelineError>
where
    E: Embedder + ?Sized,
{
    let Some(first) = chunks.first() else {
        return Err(PipelineError::EmptyDocument("XML document".to_string()));
    };
    let file_name = first.file_name.clone();
    let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
    let vectors = embed_in_order(embedder, &texts, concurrency).await?;

    Ok(chunks
        .iter()
        .zip(vectors)
        .map(|(chunk, embedding)| EmbeddedChunk {
            chunk_id: Uuid::new_v4(),
            file_name: file_name.clone(),
            content_type: FileKind::Xml,
            raw_text: chunk.content.clone(),
            start_page: None,
            end_page: None,
            section_info: Vec::new(),
            embedding,
        })
        .collect())
}
