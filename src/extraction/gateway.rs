use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, StatusCode,
};
use serde::{Deserialize, Serialize};

use crate::config::ExtractionConfig;
use crate::error::{EngramError, Result};
use crate::models::{EntityRef, Fact};

/// One document's worth of text prepared for the extraction engine.
#[derive(Debug, Clone, Serialize)]
pub struct EpisodeInput {
    pub name: String,
    pub episode_body: String,
    pub source_description: String,
    pub reference_time: DateTime<Utc>,
    pub group_id: String,
}

/// What the engine minted for one episode: its opaque id plus the
/// entities and relationship facts it extracted.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionOutcome {
    pub episode_id: String,
    #[serde(default)]
    pub entities: Vec<EntityRef>,
    #[serde(default)]
    pub relations: Vec<Fact>,
}

#[derive(Debug, Serialize)]
struct FactsRequest<'a> {
    entity_names: &'a [String],
    group_id: &'a str,
    limit: u32,
}

#[derive(Debug, Deserialize)]
struct FactsResponse {
    #[serde(default)]
    facts: Vec<Fact>,
}

/// HTTP client for the graph-extraction service. The service is slow
/// (seconds per episode) and not idempotent on its own; callers guard it
/// with the idempotency ledger and their own timeouts.
#[derive(Clone)]
pub struct GatewayClient {
    client: Client,
    config: ExtractionConfig,
}

impl GatewayClient {
    pub fn new(config: &ExtractionConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EngramError::Extraction(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Submits one episode for entity/relationship extraction.
    pub async fn process(&self, input: &EpisodeInput) -> Result<ExtractionOutcome> {
        let url = format!("{}/episodes", self.config.base_url);
        let body = serde_json::to_value(input)?;
        self.post_with_retries(&url, &body).await
    }

    /// Fetches relationship facts among the named entities.
    pub async fn facts_for(
        &self,
        entity_names: &[String],
        group_id: &str,
        limit: u32,
    ) -> Result<Vec<Fact>> {
        if entity_names.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/facts", self.config.base_url);
        let body = serde_json::to_value(FactsRequest {
            entity_names,
            group_id,
            limit,
        })?;

        let response: FactsResponse = self.post_with_retries(&url, &body).await?;
        Ok(response.facts)
    }

    async fn post_with_retries<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<T> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(ref api_key) = self.config.api_key {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {api_key}"))
                    .map_err(|e| EngramError::Extraction(format!("Invalid API key header: {e}")))?,
            );
        }

        let mut last_error = None;
        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay = Duration::from_millis(100 * 2_u64.pow(attempt - 1));
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(url)
                .headers(headers.clone())
                .json(body)
                .send()
                .await;

            match response {
                Ok(resp) => {
                    let status = resp.status();

                    if status.is_success() {
                        return resp.json::<T>().await.map_err(|e| {
                            EngramError::Extraction(format!("Failed to parse response: {e}"))
                        });
                    }

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        let retry_after = resp
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|s| s.parse().ok());
                        last_error = Some(EngramError::RateLimited { retry_after });
                        continue;
                    }

                    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                        let body = resp.text().await.unwrap_or_default();
                        return Err(EngramError::Extraction(format!(
                            "Authentication failed: {body}"
                        )));
                    }

                    if status.is_server_error() {
                        let body = resp.text().await.unwrap_or_default();
                        last_error = Some(EngramError::Extraction(format!(
                            "Server error {status}: {body}"
                        )));
                        continue;
                    }

                    let body = resp.text().await.unwrap_or_default();
                    return Err(EngramError::Extraction(format!(
                        "API error {status}: {body}"
                    )));
                }
                Err(e) => {
                    last_error = Some(EngramError::Extraction(format!("Request failed: {e}")));
                    continue;
                }
            }
        }

        Err(last_error.unwrap_or_else(|| EngramError::Extraction("Unknown error".to_string())))
    }
}
