use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocflowError {
    /// Malformed block stream or XML. Fatal for the whole document.
    #[error("Structural parse error: {0}")]
    StructuralParse(String),

    /// Chunking was requested with an unusable configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for DocflowError {
    fn from(e: serde_json::Error) -> Self {
        DocflowError::StructuralParse(e.to_string())
    }
}
