use std::env;

use serde::{Deserialize, Serialize};

use crate::error::DocflowError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_usize(profile: &str, key: &str, default: usize) -> usize {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    match profiled_env_opt(profile, key).as_deref() {
        Some("1") | Some("true") | Some("yes") => true,
        Some("0") | Some("false") | Some("no") => false,
        _ => default,
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub parser: ParserConfig,
    pub chunking: ChunkingConfig,
    pub embedding: EmbeddingConfig,
    pub upload: UploadConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `DOCFLOW_PROFILE` env var. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("DOCFLOW_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            parser: ParserConfig::from_env_profiled(p),
            chunking: ChunkingConfig::from_env_profiled(p),
            embedding: EmbeddingConfig::from_env_profiled(p),
            upload: UploadConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  parser:      url={}, timeout={}s",
            self.parser.api_url.as_deref().unwrap_or("(none)"),
            self.parser.timeout_secs
        );
        tracing::info!(
            "  chunking:    size={}, overlap={}, postprocess={}, xml_max={}",
            self.chunking.chunk_size,
            self.chunking.overlap,
            self.chunking.postprocess,
            self.chunking.xml_max_chunk_tokens
        );
        tracing::info!(
            "  embedding:   provider={}, model={}, concurrency={}",
            self.embedding.provider,
            self.embedding.model,
            self.embedding.concurrency
        );
        tracing::info!(
            "  upload:      max={}MB, types={}",
            self.upload.max_file_size_mb,
            self.upload.supported_file_types.join(",")
        );
    }

    /// Return a redacted view safe for API responses (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "parser": {
                "configured": self.parser.is_configured(),
                "timeout_secs": self.parser.timeout_secs,
            },
            "chunking": {
                "chunk_size": self.chunking.chunk_size,
                "overlap": self.chunking.overlap,
                "postprocess": self.chunking.postprocess,
                "include_file_name": self.chunking.include_file_name,
                "section_only": self.chunking.section_only,
                "include_preamble": self.chunking.include_preamble,
                "xml_max_chunk_tokens": self.chunking.xml_max_chunk_tokens,
            },
            "embedding": {
                "provider": self.embedding.provider,
                "model": self.embedding.model,
                "dimensions": self.embedding.dimensions,
                "concurrency": self.embedding.concurrency,
                "configured": self.embedding.is_configured(),
            },
            "upload": {
                "max_file_size_mb": self.upload.max_file_size_mb,
                "supported_file_types": self.upload.supported_file_types,
            },
        })
    }
}

// ── Layout parser ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Endpoint of the external layout parser (blocks API).
    pub api_url: Option<String>,
    pub timeout_secs: u64,
}

impl ParserConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            api_url: profiled_env_opt(p, "PARSER_API_URL"),
            timeout_secs: profiled_env_u64(p, "PARSER_TIMEOUT_SECS", 120),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_url.is_some()
    }
}

// ── Chunking ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum tokens per chunk.
    pub chunk_size: usize,
    /// Token overlap between windows when a single block has to be split.
    pub overlap: usize,
    /// Merge consecutive chunks while they still fit.
    pub postprocess: bool,
    /// Prefix every chunk with the file name (".pdf" stripped).
    pub include_file_name: bool,
    pub section_only: bool,
    /// Keep blocks that precede the first header.
    pub include_preamble: bool,
    pub xml_max_chunk_tokens: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 4096,
            overlap: 50,
            postprocess: true,
            include_file_name: true,
            section_only: true,
            include_preamble: false,
            xml_max_chunk_tokens: 1024,
        }
    }
}

impl ChunkingConfig {
    fn from_env_profiled(p: &str) -> Self {
        let d = Self::default();
        Self {
            chunk_size: profiled_env_usize(p, "CHUNK_SIZE", d.chunk_size),
            overlap: profiled_env_usize(p, "CHUNK_OVERLAP", d.overlap),
            postprocess: profiled_env_bool(p, "CHUNK_POSTPROCESS", d.postprocess),
            include_file_name: profiled_env_bool(p, "CHUNK_INCLUDE_FILE_NAME", d.include_file_name),
            section_only: profiled_env_bool(p, "CHUNK_SECTION_ONLY", d.section_only),
            include_preamble: profiled_env_bool(p, "CHUNK_INCLUDE_PREAMBLE", d.include_preamble),
            xml_max_chunk_tokens: profiled_env_usize(p, "XML_MAX_CHUNK_TOKENS", d.xml_max_chunk_tokens),
        }
    }

    /// Reject sizes the windowed fallback cannot make progress with.
    pub fn validate(&self) -> Result<(), DocflowError> {
        validate_window(self.chunk_size, self.overlap)?;
        if self.xml_max_chunk_tokens == 0 {
            return Err(DocflowError::Configuration(
                "xml_max_chunk_tokens must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// `chunk_size` must be positive and strictly larger than `overlap`.
pub fn validate_window(chunk_size: usize, overlap: usize) -> Result<(), DocflowError> {
    if chunk_size == 0 {
        return Err(DocflowError::Configuration(
            "chunk_size must be greater than zero".to_string(),
        ));
    }
    if overlap >= chunk_size {
        return Err(DocflowError::Configuration(format!(
            "overlap ({overlap}) must be smaller than chunk_size ({chunk_size})"
        )));
    }
    Ok(())
}

// ── Embedding ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Only "openai" (or an OpenAI-compatible endpoint) is wired up.
    pub provider: String,
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub dimensions: usize,
    /// Maximum in-flight embedding calls.
    pub concurrency: usize,
}

impl EmbeddingConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            provider: profiled_env_or(p, "EMBEDDING_PROVIDER", "openai"),
            model: profiled_env_or(p, "EMBEDDING_MODEL", "text-embedding-3-small"),
            api_key: profiled_env_opt(p, "OPENAI_API_KEY"),
            base_url: profiled_env_opt(p, "OPENAI_BASE_URL"),
            dimensions: profiled_env_usize(p, "EMBEDDING_DIMENSIONS", 1536),
            concurrency: profiled_env_usize(p, "EMBEDDING_CONCURRENCY", 8).max(1),
        }
    }

    pub fn is_configured(&self) -> bool {
        match self.provider.as_str() {
            "openai" => self.api_key.is_some(),
            _ => false,
        }
    }
}

// ── Upload validation ─────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    pub max_file_size_mb: u64,
    /// Lowercase extensions including the dot, e.g. ".pdf".
    pub supported_file_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 10,
            supported_file_types: vec![".pdf".to_string(), ".xml".to_string()],
        }
    }
}

impl UploadConfig {
    fn from_env_profiled(p: &str) -> Self {
        let d = Self::default();
        let supported_file_types = profiled_env_opt(p, "SUPPORTED_FILE_TYPES")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_lowercase())
                    .filter(|s| !s.is_empty())
                    .map(|s| if s.starts_with('.') { s } else { format!(".{s}") })
                    .collect()
            })
            .unwrap_or(d.supported_file_types);
        Self {
            max_file_size_mb: profiled_env_u64(p, "MAX_FILE_SIZE_MB", d.max_file_size_mb),
            supported_file_types,
        }
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_prefixed_key_wins_over_plain_key() {
        env::set_var("DFTESTA_CHUNK_SIZE", "777");
        let cfg = Config::for_profile("dftesta");
        assert_eq!(cfg.profile, "DFTESTA");
        assert_eq!(cfg.chunking.chunk_size, 777);
        env::remove_var("DFTESTA_CHUNK_SIZE");
    }

    #[test]
    fn missing_profile_key_falls_back_to_plain_key() {
        env::set_var("PARSER_TIMEOUT_SECS", "33");
        let cfg = Config::for_profile("dfteste");
        assert_eq!(cfg.parser.timeout_secs, 33);
        assert_eq!(cfg.profile_label(), "DFTESTE");
        env::remove_var("PARSER_TIMEOUT_SECS");
        assert_eq!(Config::for_profile("").profile_label(), "default");
    }

    #[test]
    fn profiled_bool_parses_common_spellings() {
        env::set_var("DFTESTB_CHUNK_POSTPROCESS", "no");
        env::set_var("DFTESTB_CHUNK_INCLUDE_FILE_NAME", "yes");
        let cfg = ChunkingConfig::from_env_profiled("DFTESTB");
        assert!(!cfg.postprocess);
        assert!(cfg.include_file_name);
        env::remove_var("DFTESTB_CHUNK_POSTPROCESS");
        env::remove_var("DFTESTB_CHUNK_INCLUDE_FILE_NAME");
    }

    #[test]
    fn supported_types_are_normalised() {
        env::set_var("DFTESTC_SUPPORTED_FILE_TYPES", "PDF, .Xml ,");
        let cfg = UploadConfig::from_env_profiled("DFTESTC");
        assert_eq!(cfg.supported_file_types, vec![".pdf", ".xml"]);
        env::remove_var("DFTESTC_SUPPORTED_FILE_TYPES");
    }

    #[test]
    fn window_validation() {
        assert!(validate_window(100, 10).is_ok());
        assert!(matches!(validate_window(0, 0), Err(DocflowError::Configuration(_))));
        assert!(matches!(validate_window(10, 10), Err(DocflowError::Configuration(_))));
        assert!(ChunkingConfig::default().validate().is_ok());
    }

    #[test]
    fn preamble_chunking_is_opt_in() {
        assert!(!ChunkingConfig::default().include_preamble);
        env::set_var("DFTESTE_CHUNK_INCLUDE_PREAMBLE", "true");
        assert!(ChunkingConfig::from_env_profiled("DFTESTE").include_preamble);
        env::remove_var("DFTESTE_CHUNK_INCLUDE_PREAMBLE");
    }

    #[test]
    fn redacted_summary_hides_api_key() {
        let mut cfg = Config::for_profile("DFTESTD");
        cfg.embedding.api_key = Some("sk-secret".to_string());
        let summary = cfg.redacted_summary().to_string();
        assert!(!summary.contains("sk-secret"));
        assert!(summary.contains("\"configured\":true"));
    }
}
