use tracing::info;

use crate::config::ExtractionConfig;
use crate::error::{EngramError, Result};
use crate::extraction::gateway::{EpisodeInput, ExtractionOutcome, GatewayClient};
use crate::models::Fact;

/// Maps a user id to the extraction engine's group id namespace, which
/// rejects hyphens in identifiers.
pub fn sanitize_group_id(user_id: &str) -> String {
    user_id.replace('-', "")
}

#[derive(Clone)]
enum ExtractionBackend {
    Http { client: GatewayClient },
    Disabled { reason: String },
}

/// Entity and relationship extraction behind an HTTP gateway. When no
/// gateway is configured the provider still constructs, and every call
/// reports [`EngramError::ExtractionUnavailable`] so ingestion can
/// degrade to document-only storage.
#[derive(Clone)]
pub struct ExtractionProvider {
    backend: ExtractionBackend,
}

impl ExtractionProvider {
    pub fn from_config(config: Option<&ExtractionConfig>) -> Self {
        match config {
            Some(config) => match GatewayClient::new(config) {
                Ok(client) => {
                    info!(base_url = %config.base_url, "Extraction gateway configured");
                    Self {
                        backend: ExtractionBackend::Http { client },
                    }
                }
                Err(e) => Self::disabled(format!("Failed to initialize gateway client: {e}")),
            },
            None => Self::disabled("EXTRACTION_BASE_URL not set".to_string()),
        }
    }

    pub fn disabled(reason: String) -> Self {
        Self {
            backend: ExtractionBackend::Disabled { reason },
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self.backend, ExtractionBackend::Http { .. })
    }

    pub async fn process(&self, input: &EpisodeInput) -> Result<ExtractionOutcome> {
        match &self.backend {
            ExtractionBackend::Http { client } => client.process(input).await,
            ExtractionBackend::Disabled { reason } => {
                Err(EngramError::ExtractionUnavailable(reason.clone()))
            }
        }
    }

    pub async fn facts_for(
        &self,
        entity_names: &[String],
        group_id: &str,
        limit: u32,
    ) -> Result<Vec<Fact>> {
        match &self.backend {
            ExtractionBackend::Http { client } => {
                client.facts_for(entity_names, group_id, limit).await
            }
            ExtractionBackend::Disabled { reason } => {
                Err(EngramError::ExtractionUnavailable(reason.clone()))
            }
        }
    }
}
