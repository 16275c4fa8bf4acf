use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DocType, EventSource, Metadata};

/// Preview length in code points, matching what the dashboard renders.
pub const PREVIEW_MAX_CHARS: usize = 200;

/// Canonical stored content for one source event. `(source, source_id,
/// user_id)` is unique in storage; the embedding stays `None` until the
/// embedding provider has produced a vector for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub user_id: String,
    pub source: EventSource,
    pub source_id: String,
    #[serde(rename = "type")]
    pub doc_type: DocType,
    pub title: Option<String>,
    pub content: String,
    pub content_preview: String,
    pub metadata: Metadata,
    pub source_created_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,
}

impl Document {
    pub fn new(
        id: String,
        user_id: String,
        source: EventSource,
        source_id: String,
        content: String,
    ) -> Self {
        let now = Utc::now();
        let doc_type = DocType::for_source(&source);
        Self {
            id,
            user_id,
            source,
            source_id,
            doc_type,
            title: None,
            content_preview: derive_preview(&content),
            content,
            metadata: Metadata::new(),
            source_created_at: None,
            created_at: now,
            updated_at: now,
            embedding: None,
        }
    }
}

/// First [`PREVIEW_MAX_CHARS`] code points of the content, with an
/// ellipsis when anything was cut off.
pub fn derive_preview(content: &str) -> String {
    let mut preview: String = content.chars().take(PREVIEW_MAX_CHARS).collect();
    if content.chars().count() > PREVIEW_MAX_CHARS {
        preview.push_str("...");
    }
    preview
}

/// A document paired with its cosine similarity to some query vector.
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub document: Document,
    pub similarity: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct DocumentSummary {
    pub id: String,
    #[schema(value_type = String)]
    pub source: EventSource,
    pub source_id: String,
    #[serde(rename = "type")]
    pub doc_type: DocType,
    pub title: Option<String>,
    pub content_preview: String,
    pub source_created_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub has_embedding: bool,
}

impl From<Document> for DocumentSummary {
    fn from(doc: Document) -> Self {
        Self {
            id: doc.id,
            source: doc.source,
            source_id: doc.source_id,
            doc_type: doc.doc_type,
            title: doc.title,
            content_preview: doc.content_preview,
            source_created_at: doc.source_created_at,
            created_at: doc.created_at,
            has_embedding: doc.embedding.is_some(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, utoipa::ToSchema, utoipa::IntoParams)]
pub struct ListDocumentsQuery {
    pub user_id: String,
    pub source: Option<String>,
    pub limit: Option<u32>,
    pub page: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ListDocumentsResponse {
    pub documents: Vec<DocumentSummary>,
    pub pagination: super::Pagination,
}
