use crate::config::EmbeddingsConfig;
use crate::error::{EngramError, Result};

use super::api::{ApiConfig, EmbeddingApiClient, DEFAULT_BASE_URL};

#[derive(Clone)]
enum EmbeddingBackend {
    Api { client: EmbeddingApiClient },
    Disabled { reason: String },
}

/// Embedding access for ingestion and retrieval. Semantic search is an
/// enhancement: when the provider is disabled every embed call returns
/// `EmbeddingUnavailable` and callers fall back to lexical search or store
/// documents without a vector.
#[derive(Clone)]
pub struct EmbeddingProvider {
    backend: EmbeddingBackend,
    dimensions: usize,
}

impl EmbeddingProvider {
    /// Never fails: a missing API key yields a disabled provider rather
    /// than a startup error. A custom base URL without a key is allowed
    /// (local OpenAI-compatible servers).
    pub fn from_config(config: &EmbeddingsConfig) -> Self {
        if config.api_key.is_none() && config.base_url.is_none() {
            return Self::disabled("EMBEDDING_API_KEY not set", config.dimensions);
        }

        let api_config = ApiConfig {
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
        };

        match EmbeddingApiClient::new(api_config) {
            Ok(client) => Self {
                backend: EmbeddingBackend::Api { client },
                dimensions: config.dimensions,
            },
            Err(e) => Self::disabled(e.to_string(), config.dimensions),
        }
    }

    pub fn disabled(reason: impl Into<String>, dimensions: usize) -> Self {
        Self {
            backend: EmbeddingBackend::Disabled {
                reason: reason.into(),
            },
            dimensions,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self.backend, EmbeddingBackend::Api { .. })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        self.embed_single(query).await
    }

    pub async fn embed_passage(&self, passage: &str) -> Result<Vec<f32>> {
        self.embed_single(passage).await
    }

    pub async fn embed_passages(&self, passages: &[String]) -> Result<Vec<Vec<f32>>> {
        if passages.is_empty() {
            return Ok(Vec::new());
        }

        match &self.backend {
            EmbeddingBackend::Api { client } => {
                let texts: Vec<&str> = passages.iter().map(String::as_str).collect();
                let embeddings = client.embed(&texts).await?;
                if embeddings.len() != passages.len() {
                    return Err(EngramError::Embedding(format!(
                        "Expected {} embeddings, got {}",
                        passages.len(),
                        embeddings.len()
                    )));
                }
                Ok(embeddings)
            }
            EmbeddingBackend::Disabled { reason } => {
                Err(EngramError::EmbeddingUnavailable(reason.clone()))
            }
        }
    }

    async fn embed_single(&self, text: &str) -> Result<Vec<f32>> {
        match &self.backend {
            EmbeddingBackend::Api { client } => {
                let embeddings = client.embed(&[text]).await?;
                embeddings
                    .into_iter()
                    .next()
                    .ok_or_else(|| EngramError::Embedding("No embedding generated".to_string()))
            }
            EmbeddingBackend::Disabled { reason } => {
                Err(EngramError::EmbeddingUnavailable(reason.clone()))
            }
        }
    }
}
