use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use docflow_core::config::ChunkingConfig;

/// Layout-aware chunking for retrieval pipelines.
///
/// Reads layout parser output (or XML), rebuilds the document tree and
/// prints token-bounded chunks as JSON.
#[derive(Parser, Debug)]
#[command(name = "docflow", about = "Layout-aware document chunking")]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Chunk a layout parser response or a bare block array
    Blocks {
        /// JSON file with `return_dict.result.blocks` or a block array
        json: PathBuf,

        #[command(flatten)]
        chunking: ChunkArgs,
    },

    /// Chunk an XML document structurally
    Xml {
        file: PathBuf,

        /// Token budget per chunk (defaults to XML_MAX_CHUNK_TOKENS)
        #[arg(long)]
        max_tokens: Option<usize>,

        #[arg(long, value_enum, default_value_t = TokenizerKind::Delimiter)]
        tokenizer: TokenizerKind,
    },

    /// Render a whole document as text or HTML
    Render {
        json: PathBuf,

        #[arg(long)]
        html: bool,

        /// Render every section, nested ones included
        #[arg(long)]
        duplicates: bool,
    },

    /// Send a PDF through the layout parser and chunk it
    Pdf {
        /// Local path or http(s) URL
        input: String,

        /// Embed the chunks with the configured provider
        #[arg(long)]
        embed: bool,

        #[command(flatten)]
        chunking: ChunkArgs,
    },
}

/// Flags that override the CHUNK_* environment settings.
#[derive(Args, Debug, Clone)]
pub struct ChunkArgs {
    #[arg(long)]
    pub chunk_size: Option<usize>,

    #[arg(long)]
    pub overlap: Option<usize>,

    /// Skip merging undersized chunks
    #[arg(long)]
    pub no_postprocess: bool,

    /// Leave the file name out of the first chunk
    #[arg(long)]
    pub no_file_name: bool,

    /// Print the chunking tree outline to stderr
    #[arg(long)]
    pub outline: bool,

    #[arg(long, value_enum, default_value_t = TokenizerKind::Delimiter)]
    pub tokenizer: TokenizerKind,
}

impl ChunkArgs {
    pub fn apply(&self, config: &ChunkingConfig) -> ChunkingConfig {
        let mut config = config.clone();
        if let Some(size) = self.chunk_size {
            config.chunk_size = size;
        }
        if let Some(overlap) = self.overlap {
            config.overlap = overlap;
        }
        if self.no_postprocess {
            config.postprocess = false;
        }
        if self.no_file_name {
            config.include_file_name = false;
        }
        config
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenizerKind {
    /// Whitespace-delimited words
    Delimiter,
    /// OpenAI cl100k_base BPE (needs the `tiktoken` feature)
    Tiktoken,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_the_environment() {
        let args = CliArgs::parse_from([
            "docflow",
            "blocks",
            "doc.json",
            "--chunk-size",
            "256",
            "--overlap",
            "8",
            "--no-postprocess",
        ]);
        let Command::Blocks { chunking, .. } = args.command else {
            panic!("expected blocks");
        };
        let config = chunking.apply(&ChunkingConfig::default());
        assert_eq!(config.chunk_size, 256);
        assert_eq!(config.overlap, 8);
        assert!(!config.postprocess);
        assert!(config.include_file_name);
    }

    #[test]
    fn pdf_accepts_urls() {
        let args = CliArgs::parse_from(["docflow", "pdf", "https://example.com/a.pdf", "--embed"]);
        assert!(matches!(args.command, Command::Pdf { embed: true, .. }));
    }
}
