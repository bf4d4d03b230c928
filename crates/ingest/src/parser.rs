//! Client for the external layout parser that turns PDFs into block streams.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use docflow_core::config::ParserConfig;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, info};

use crate::document::record::{parse_block_json, BlockRecord};

// Some servers only serve files to browsers.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/77.0.3865.90 Safari/537.36";

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Parser API error: {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Download of {url} failed with status {status}")]
    Download { url: String, status: u16 },

    #[error("Malformed parser response: {0}")]
    Malformed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Layout parser not configured: set PARSER_API_URL")]
    NotConfigured,
}

/// Where the document bytes come from.
#[derive(Debug, Clone)]
pub enum DocumentSource {
    Bytes { file_name: String, bytes: Vec<u8> },
    Path(PathBuf),
    Url(String),
}

impl DocumentSource {
    /// `http(s)://` strings are URLs, anything else is a local path.
    pub fn from_path_or_url(input: &str) -> Self {
        let lower = input.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            DocumentSource::Url(input.to_string())
        } else {
            DocumentSource::Path(PathBuf::from(input))
        }
    }

    /// Base name of the document, used as its file name.
    pub fn file_name(&self) -> String {
        match self {
            DocumentSource::Bytes { file_name, .. } => file_name.clone(),
            DocumentSource::Path(path) => base_name(path),
            DocumentSource::Url(url) => {
                let path = url.split(['?', '#']).next().unwrap_or(url.as_str());
                path.rsplit('/').next().unwrap_or_default().to_string()
            }
        }
    }

    /// Read or download the document.
    pub async fn load(&self) -> Result<Vec<u8>, ParserError> {
        match self {
            DocumentSource::Bytes { bytes, .. } => Ok(bytes.clone()),
            DocumentSource::Path(path) => Ok(tokio::fs::read(path).await?),
            DocumentSource::Url(url) => {
                let client = Client::builder().user_agent(BROWSER_USER_AGENT).build()?;
                let response = client.get(url).send().await?;
                if !response.status().is_success() {
                    return Err(ParserError::Download {
                        url: url.clone(),
                        status: response.status().as_u16(),
                    });
                }
                Ok(response.bytes().await?.to_vec())
            }
        }
    }
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Anything that can turn document bytes into a block stream.
#[async_trait]
pub trait BlockSource: Send + Sync {
    async fn fetch_blocks(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<Vec<BlockRecord>, ParserError>;
}

/// HTTP client for the layout parser API.
pub struct LayoutParserClient {
    client: Client,
    api_url: String,
}

impl LayoutParserClient {
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_url: api_url.into(),
        }
    }

    pub fn from_config(config: &ParserConfig) -> Result<Self, ParserError> {
        let url = config.api_url.as_deref().ok_or(ParserError::NotConfigured)?;
        Ok(Self::new(url, Duration::from_secs(config.timeout_secs)))
    }
}

#[async_trait]
impl BlockSource for LayoutParserClient {
    async fn fetch_blocks(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<Vec<BlockRecord>, ParserError> {
        let size = bytes.len();
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("application/pdf")?;
        let form = Form::new().part("file", part);

        debug!(file = file_name, bytes = size, url = %self.api_url, "Sending document to layout parser");
        let response = self.client.post(&self.api_url).multipart(form).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ParserError::Api { status, body });
        }

        let body = response.text().await?;
        let blocks = parse_block_json(&body).map_err(|e| ParserError::Malformed(e.to_string()))?;
        info!(file = file_name, blocks = blocks.len(), "Layout parsed");
        Ok(blocks)
    }
}
