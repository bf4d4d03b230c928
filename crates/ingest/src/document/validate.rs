//! Upload checks run before a file is sent anywhere: size, extension and a
//! cheap structural sniff of the content.

use docflow_core::config::UploadConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("File size {size} bytes exceeds the maximum allowed size of {max_mb}MB")]
    TooLarge { size: u64, max_mb: u64 },
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),
    #[error("Invalid PDF file: {0}")]
    InvalidPdf(String),
    #[error("Invalid XML file: {0}")]
    InvalidXml(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Pdf,
    Xml,
}

impl FileKind {
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        match extension(file_name).as_deref() {
            Some(".pdf") => Some(FileKind::Pdf),
            Some(".xml") => Some(FileKind::Xml),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Pdf => "pdf",
            FileKind::Xml => "xml",
        }
    }
}

/// Lowercased extension including the dot.
fn extension(file_name: &str) -> Option<String> {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    match base.rfind('.') {
        Some(idx) if idx > 0 => Some(base[idx..].to_lowercase()),
        _ => None,
    }
}

/// Validate an upload and tell which pipeline it belongs to.
pub fn validate_upload(
    file_name: &str,
    bytes: &[u8],
    config: &UploadConfig,
) -> Result<FileKind, ValidationError> {
    let size = bytes.len() as u64;
    if size > config.max_file_size_bytes() {
        return Err(ValidationError::TooLarge {
            size,
            max_mb: config.max_file_size_mb,
        });
    }

    let ext = extension(file_name).unwrap_or_default();
    if !config.supported_file_types.iter().any(|t| *t == ext) {
        return Err(ValidationError::UnsupportedType(if ext.is_empty() {
            file_name.to_string()
        } else {
            ext
        }));
    }
    let kind = FileKind::from_file_name(file_name)
        .ok_or_else(|| ValidationError::UnsupportedType(file_name.to_string()))?;

    let outcome = match kind {
        FileKind::Pdf => check_pdf(bytes),
        FileKind::Xml => check_xml(bytes),
    };
    if let Err(e) = &outcome {
        warn!(file = file_name, error = %e, "Upload rejected");
    }
    outcome.map(|()| kind)
}

fn check_pdf(bytes: &[u8]) -> Result<(), ValidationError> {
    if !bytes.starts_with(b"%PDF-") {
        return Err(ValidationError::InvalidPdf("missing %PDF- header".to_string()));
    }
    // The trailer may be followed by a few bytes of whitespace or garbage.
    let tail = &bytes[bytes.len().saturating_sub(1024)..];
    if !tail.windows(5).any(|w| w == b"%%EOF") {
        return Err(ValidationError::InvalidPdf("missing %%EOF trailer".to_string()));
    }
    if !bytes.windows(5).any(|w| w == b"/Page") {
        return Err(ValidationError::InvalidPdf(
            "PDF document contains no pages".to_string(),
        ));
    }
    Ok(())
}

fn check_xml(bytes: &[u8]) -> Result<(), ValidationError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| ValidationError::InvalidXml(format!("invalid character encoding: {e}")))?;
    crate::xml::validate_xml(text).map_err(|e| ValidationError::InvalidXml(e.to_string()))
}
