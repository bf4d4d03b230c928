use async_trait::async_trait;
use docflow_core::config::EmbeddingConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::traits::{Embedder, EmbeddingError};

/// OpenAI-compatible embedding backend.
pub struct OpenAiEmbedder {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    dimensions: usize,
}

impl OpenAiEmbedder {
    pub fn new(api_key: String, model: String, base_url: Option<String>, dimensions: usize) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_key,
            model,
            base_url: base_url
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| "https://api.openai.com".to_string()),
            dimensions,
        }
    }

    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        if config.provider != "openai" {
            return Err(EmbeddingError::NotConfigured(format!(
                "unsupported provider '{}'",
                config.provider
            )));
        }
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| EmbeddingError::NotConfigured("OPENAI_API_KEY is not set".to_string()))?;
        Ok(Self::new(
            api_key,
            config.model.clone(),
            config.base_url.clone(),
            config.dimensions,
        ))
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    /// Only the text-embedding-3 family accepts a target dimension.
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedItem>,
}

#[derive(Deserialize)]
struct EmbedItem {
    embedding: Vec<f32>,
    index: usize,
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let request = EmbedRequest {
            model: &self.model,
            input: texts,
            dimensions: self
                .model
                .starts_with("text-embedding-3")
                .then_some(self.dimensions),
        };

        let response = self
            .client
            .post(format!("{}/v1/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Api(format!("{status}: {body}")));
        }

        let mut resp: EmbedResponse = response.json().await?;

        // Sort by index to maintain input order.
        resp.data.sort_by_key(|item| item.index);
        if resp.data.len() != texts.len() {
            return Err(EmbeddingError::MissingVector {
                index: resp.data.len(),
            });
        }

        let embeddings: Vec<Vec<f32>> = resp.data.into_iter().map(|item| item.embedding).collect();

        for vector in &embeddings {
            if vector.len() != self.dimensions {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: self.dimensions,
                    actual: vector.len(),
                });
            }
        }

        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: &str, api_key: Option<&str>) -> EmbeddingConfig {
        EmbeddingConfig {
            provider: provider.to_string(),
            model: "text-embedding-3-small".to_string(),
            api_key: api_key.map(String::from),
            base_url: Some("http://localhost:9999/".to_string()),
            dimensions: 8,
            concurrency: 2,
        }
    }

    #[test]
    fn builds_from_config() {
        let embedder = OpenAiEmbedder::from_config(&config("openai", Some("sk-test"))).unwrap();
        assert_eq!(embedder.dimensions(), 8);
        assert_eq!(embedder.model(), "text-embedding-3-small");
        assert_eq!(embedder.base_url, "http://localhost:9999");
    }

    #[test]
    fn missing_key_or_unknown_provider_is_rejected() {
        assert!(matches!(
            OpenAiEmbedder::from_config(&config("openai", None)),
            Err(EmbeddingError::NotConfigured(_))
        ));
        assert!(matches!(
            OpenAiEmbedder::from_config(&config("ollama", Some("k"))),
            Err(EmbeddingError::NotConfigured(_))
        ));
    }
}
