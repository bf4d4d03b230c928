mod cli;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cli::{ChunkArgs, CliArgs, Command, TokenizerKind};
use docflow_core::config::{load_dotenv, ChunkingConfig, Config};
use docflow_ingest::document::{validate_upload, BlockRecord, DocTree, Document, TreeOptions};
use docflow_ingest::embedding::OpenAiEmbedder;
use docflow_ingest::parser::{BlockSource, DocumentSource, LayoutParserClient, ParserError};
use docflow_ingest::pipeline;
use docflow_ingest::ChunkOutput;
use docflow_ingest::tokenizer::{DelimiterTokenizer, Tokenizer};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays valid JSON.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    load_dotenv();
    let args = CliArgs::parse();
    let config = Config::from_env();
    config.log_summary();

    match args.command {
        Command::Blocks { json, chunking } => match chunking.tokenizer {
            TokenizerKind::Delimiter => {
                run_blocks(&json, &chunking, &config, &DelimiterTokenizer::default()).await
            }
            TokenizerKind::Tiktoken => run_blocks(&json, &chunking, &config, &*tiktoken()?).await,
        },
        Command::Xml {
            file,
            max_tokens,
            tokenizer,
        } => {
            let max_tokens = max_tokens.unwrap_or(config.chunking.xml_max_chunk_tokens);
            match tokenizer {
                TokenizerKind::Delimiter => {
                    run_xml(&file, max_tokens, &config, Arc::new(DelimiterTokenizer::default()))
                        .await
                }
                TokenizerKind::Tiktoken => run_xml(&file, max_tokens, &config, tiktoken()?).await,
            }
        }
        Command::Render {
            json,
            html,
            duplicates,
        } => {
            let doc = Document::from_json(&read_text(&json).await?)?;
            if html {
                println!("{}", doc.to_html(duplicates));
            } else {
                println!("{}", doc.to_text(duplicates));
            }
            Ok(())
        }
        Command::Pdf {
            input,
            embed,
            chunking,
        } => match chunking.tokenizer {
            TokenizerKind::Delimiter => {
                let tokenizer = Arc::new(DelimiterTokenizer::default());
                run_pdf(&input, embed, &chunking, &config, tokenizer).await
            }
            TokenizerKind::Tiktoken => run_pdf(&input, embed, &chunking, &config, tiktoken()?).await,
        },
    }
}

#[cfg(feature = "tiktoken")]
fn tiktoken() -> Result<Arc<docflow_ingest::tokenizer::TiktokenTokenizer>> {
    Ok(Arc::new(docflow_ingest::tokenizer::TiktokenTokenizer::cl100k()?))
}

#[cfg(not(feature = "tiktoken"))]
fn tiktoken() -> Result<Arc<DelimiterTokenizer>> {
    anyhow::bail!("docflow was built without the `tiktoken` feature")
}

async fn read_text(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ── Block streams ───────────────────────────────────────────────────────────

async fn run_blocks<T: Tokenizer>(
    path: &Path,
    args: &ChunkArgs,
    config: &Config,
    tokenizer: &T,
) -> Result<()> {
    let records = docflow_ingest::parse_block_json(&read_text(path).await?)?;
    let file_name = DocumentSource::Path(path.to_path_buf()).file_name();
    let stem = file_name.strip_suffix(".json").unwrap_or(&file_name);
    let chunking = args.apply(&config.chunking);
    if args.outline {
        print_outline(&records, stem, tokenizer, &chunking)?;
    }
    let output = pipeline::chunk_blocks(&records, stem, tokenizer, &chunking)?;
    print_json(&chunks_json(stem, &output))
}

async fn run_pdf<T: Tokenizer + 'static>(
    input: &str,
    embed: bool,
    args: &ChunkArgs,
    config: &Config,
    tokenizer: Arc<T>,
) -> Result<()> {
    let client = LayoutParserClient::from_config(&config.parser)?;
    let source = DocumentSource::from_path_or_url(input);
    let file_name = source.file_name();
    let bytes = source
        .load()
        .await
        .with_context(|| format!("failed to load {input}"))?;
    validate_upload(&file_name, &bytes, &config.upload)?;

    let chunking = args.apply(&config.chunking);
    let source = DocumentSource::Bytes {
        file_name: file_name.clone(),
        bytes,
    };
    let output = if args.outline {
        let outlined = Outlined {
            inner: &client,
            tokenizer: tokenizer.as_ref(),
            chunking: &chunking,
        };
        pipeline::parse_and_chunk(&outlined, &source, tokenizer.clone(), &chunking).await?
    } else {
        pipeline::parse_and_chunk(&client, &source, tokenizer, &chunking).await?
    };
    if !embed {
        return print_json(&chunks_json(&file_name, &output));
    }

    let embedder = OpenAiEmbedder::from_config(&config.embedding)?;
    info!(model = embedder.model(), chunks = output.chunks.len(), "Embedding chunks");
    let embedded = pipeline::embed_pdf_chunks(
        &embedder,
        &output.chunks,
        &file_name,
        config.embedding.concurrency,
    )
    .await?;
    print_json(&json!({ "file_name": file_name, "chunks": embedded }))
}

/// Prints the outline of whatever the wrapped parser returns.
struct Outlined<'a, T> {
    inner: &'a dyn BlockSource,
    tokenizer: &'a T,
    chunking: &'a ChunkingConfig,
}

#[async_trait]
impl<'a, T: Tokenizer> BlockSource for Outlined<'a, T> {
    async fn fetch_blocks(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<Vec<BlockRecord>, ParserError> {
        let records = self.inner.fetch_blocks(file_name, bytes).await?;
        if let Err(e) = print_outline(&records, file_name, self.tokenizer, self.chunking) {
            warn!(error = %e, "Could not build outline");
        }
        Ok(records)
    }
}

/// Print the block and chunking tree outlines to stderr.
fn print_outline<T: Tokenizer>(
    records: &[BlockRecord],
    file_name: &str,
    tokenizer: &T,
    chunking: &ChunkingConfig,
) -> Result<()> {
    let doc = Document::from_records(records)?;
    let tree = DocTree::new(
        &doc,
        Some(tokenizer),
        Some(file_name.to_string()),
        TreeOptions::from(chunking),
    );
    eprintln!("{}", doc.debug_outline());
    eprintln!("{}", tree.outline());
    Ok(())
}

fn chunks_json(file_name: &str, output: &ChunkOutput) -> serde_json::Value {
    json!({
        "file_name": file_name,
        "stats": output.stats,
        "chunks": output.chunks,
    })
}

// ── XML ─────────────────────────────────────────────────────────────────────

async fn run_xml<T: Tokenizer + 'static>(
    path: &Path,
    max_tokens: usize,
    config: &Config,
    tokenizer: Arc<T>,
) -> Result<()> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let file_name = DocumentSource::Path(path.to_path_buf()).file_name();
    validate_upload(&file_name, &bytes, &config.upload)?;
    let xml = String::from_utf8(bytes).context("XML is not valid UTF-8")?;

    let chunks = pipeline::chunk_xml_document(xml, file_name, tokenizer, max_tokens).await?;
    print_json(&serde_json::to_value(chunks)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticParser(&'static str);

    #[async_trait]
    impl BlockSource for StaticParser {
        async fn fetch_blocks(
            &self,
            _file_name: &str,
            _bytes: Vec<u8>,
        ) -> Result<Vec<BlockRecord>, ParserError> {
            docflow_ingest::parse_block_json(self.0).map_err(|e| ParserError::Malformed(e.to_string()))
        }
    }

    const BLOCKS: &str = r#"[
        {"tag": "header", "level": 0, "page_idx": 0, "sentences": ["Intro"]},
        {"tag": "para", "level": 1, "page_idx": 0, "sentences": ["Some opening text."]}
    ]"#;

    #[tokio::test]
    async fn outlined_source_chunks_like_the_parser() {
        let parser = StaticParser(BLOCKS);
        let tokenizer = Arc::new(DelimiterTokenizer::default());
        let chunking = ChunkingConfig::default();
        let source = DocumentSource::Bytes {
            file_name: "intro.pdf".to_string(),
            bytes: b"%PDF".to_vec(),
        };

        let plain = pipeline::parse_and_chunk(&parser, &source, tokenizer.clone(), &chunking)
            .await
            .unwrap();
        let outlined = Outlined {
            inner: &parser,
            tokenizer: tokenizer.as_ref(),
            chunking: &chunking,
        };
        let traced = pipeline::parse_and_chunk(&outlined, &source, tokenizer.clone(), &chunking)
            .await
            .unwrap();

        assert_eq!(plain.chunks.len(), 1);
        assert_eq!(traced.chunks.len(), plain.chunks.len());
        assert_eq!(traced.chunks[0].content, plain.chunks[0].content);
        assert!(traced.chunks[0].content.contains("Some opening text."));
    }

    #[tokio::test]
    async fn blank_parser_output_is_rejected() {
        let parser = StaticParser("[]");
        let source = DocumentSource::Bytes {
            file_name: "blank.pdf".to_string(),
            bytes: b"%PDF".to_vec(),
        };
        let err = pipeline::parse_and_chunk(
            &parser,
            &source,
            Arc::new(DelimiterTokenizer::default()),
            &ChunkingConfig::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, pipeline::PipelineError::EmptyDocument(_)));
    }
}
