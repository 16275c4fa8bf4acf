use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{EngramError, Result};

use super::{EventSource, Metadata};

/// One raw event as delivered by a source provider (webhook push or
/// backfill sync). Nothing here is trusted: identity fields are checked
/// by [`EventIdentity::resolve`] before any processing happens.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, utoipa::ToSchema)]
pub struct RawEvent {
    #[validate(length(min = 1, max = 128))]
    pub user_id: String,
    /// Provider name, e.g. "gmail" or "slack". Open-ended.
    #[validate(length(min = 1, max = 64))]
    pub source: String,
    /// Provider-native message id. Absence makes the event malformed.
    pub message_id: Option<String>,
    pub subject: Option<String>,
    pub sender: Option<String>,
    pub body: Option<String>,
    /// When the provider says the message happened (not when we saw it).
    pub occurred_at: Option<DateTime<Utc>>,
    #[schema(value_type = Object)]
    pub metadata: Option<Metadata>,
}

impl RawEvent {
    /// Full text used for storage and embedding: subject and body joined,
    /// whichever of the two are present.
    pub fn searchable_content(&self) -> String {
        let subject = self.subject.as_deref().unwrap_or("").trim();
        let body = self.body.as_deref().unwrap_or("").trim();

        match (subject.is_empty(), body.is_empty()) {
            (false, false) => format!("{subject}\n\n{body}"),
            (false, true) => subject.to_string(),
            (true, false) => body.to_string(),
            (true, true) => String::new(),
        }
    }
}

/// The stable dedup triple for one event. Resolution is a pure function
/// of the raw event and never touches storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventIdentity {
    pub user_id: String,
    pub source: EventSource,
    pub source_id: String,
}

impl EventIdentity {
    pub fn resolve(event: &RawEvent) -> Result<Self> {
        let user_id = event.user_id.trim();
        if user_id.is_empty() {
            return Err(EngramError::MalformedEvent(
                "missing user_id".to_string(),
            ));
        }

        let source = event.source.trim();
        if source.is_empty() {
            return Err(EngramError::MalformedEvent(
                "missing source".to_string(),
            ));
        }

        let source_id = event
            .message_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                EngramError::MalformedEvent(format!(
                    "missing provider message id for source '{source}'"
                ))
            })?;

        Ok(Self {
            user_id: user_id.to_string(),
            source: EventSource::from(source.to_string()),
            source_id: source_id.to_string(),
        })
    }
}

/// Ledger row proving an event was handled exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedEvent {
    pub user_id: String,
    pub source: EventSource,
    pub source_id: String,
    pub episode_id: Option<String>,
    pub processed_at: DateTime<Utc>,
}

impl ProcessedEvent {
    pub fn new(identity: &EventIdentity, episode_id: Option<String>) -> Self {
        Self {
            user_id: identity.user_id.clone(),
            source: identity.source.clone(),
            source_id: identity.source_id.clone(),
            episode_id,
            processed_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum IngestStatus {
    Processed,
    Duplicate,
    Failed,
}

impl std::fmt::Display for IngestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Processed => write!(f, "processed"),
            Self::Duplicate => write!(f, "duplicate"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Outcome of ingesting one event.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct IngestReceipt {
    pub status: IngestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode_id: Option<String>,
    pub entities_linked: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IngestReceipt {
    /// Duplicate receipt, pointing at the already-stored document when
    /// it could be resolved.
    pub fn duplicate(document_id: Option<String>) -> Self {
        Self {
            status: IngestStatus::Duplicate,
            document_id,
            episode_id: None,
            entities_linked: 0,
            error: None,
        }
    }

    pub fn failed(error: String) -> Self {
        Self {
            status: IngestStatus::Failed,
            document_id: None,
            episode_id: None,
            entities_linked: 0,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, utoipa::ToSchema)]
pub struct SyncRequest {
    #[validate(length(min = 1, max = 500))]
    pub events: Vec<RawEvent>,
}

/// Per-batch rollup. One bad event never blocks its siblings, so the
/// summary carries every receipt alongside the counters.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SyncSummary {
    pub processed: usize,
    pub duplicates: usize,
    pub failed: usize,
    pub results: Vec<IngestReceipt>,
}

impl SyncSummary {
    pub fn from_receipts(results: Vec<IngestReceipt>) -> Self {
        let processed = results
            .iter()
            .filter(|r| r.status == IngestStatus::Processed)
            .count();
        let duplicates = results
            .iter()
            .filter(|r| r.status == IngestStatus::Duplicate)
            .count();
        let failed = results
            .iter()
            .filter(|r| r.status == IngestStatus::Failed)
            .count();

        Self {
            processed,
            duplicates,
            failed,
            results,
        }
    }
}
