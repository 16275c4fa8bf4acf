//! Read-side document endpoints: listing for dashboards and connector
//! audits, and single-document detail with linked entities.

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::AppState;
use crate::error::{EngramError, Result};
use crate::models::{
    DocType, Document, EventSource, LinkedEntity, ListDocumentsQuery, ListDocumentsResponse,
    Metadata,
};

/// A stored document plus the entities extraction linked to it.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct DocumentDetail {
    pub id: String,
    pub user_id: String,
    #[schema(value_type = String)]
    pub source: EventSource,
    pub source_id: String,
    #[serde(rename = "type")]
    pub doc_type: DocType,
    pub title: Option<String>,
    pub content: String,
    pub content_preview: String,
    #[schema(value_type = Object)]
    pub metadata: Metadata,
    pub source_created_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub has_embedding: bool,
    pub entities: Vec<LinkedEntity>,
}

impl DocumentDetail {
    fn from_parts(document: Document, entities: Vec<LinkedEntity>) -> Self {
        Self {
            id: document.id,
            user_id: document.user_id,
            source: document.source,
            source_id: document.source_id,
            doc_type: document.doc_type,
            title: document.title,
            content: document.content,
            content_preview: document.content_preview,
            metadata: document.metadata,
            source_created_at: document.source_created_at,
            created_at: document.created_at,
            updated_at: document.updated_at,
            has_embedding: document.embedding.is_some(),
            entities,
        }
    }
}

/// `GET /api/v1/documents`
#[utoipa::path(
    get,
    path = "/api/v1/documents",
    tag = "documents",
    operation_id = "documents.list",
    params(ListDocumentsQuery),
    responses(
        (status = 200, description = "Paginated document summaries", body = ListDocumentsResponse),
        (status = 400, description = "Missing or invalid query parameters"),
    )
)]
pub async fn list_documents(
    State(state): State<AppState>,
    Query(query): Query<ListDocumentsQuery>,
) -> Result<Json<ListDocumentsResponse>> {
    if query.user_id.trim().is_empty() {
        return Err(EngramError::Validation("user_id is required".to_string()));
    }

    let (documents, pagination) = state.db.list_documents(&query).await?;
    Ok(Json(ListDocumentsResponse {
        documents,
        pagination,
    }))
}

/// `GET /api/v1/documents/{document_id}`
#[utoipa::path(
    get,
    path = "/api/v1/documents/{document_id}",
    tag = "documents",
    operation_id = "documents.get",
    params(
        ("document_id" = String, Path, description = "Document id"),
    ),
    responses(
        (status = 200, description = "Document with linked entities", body = DocumentDetail),
        (status = 404, description = "No such document"),
    )
)]
pub async fn get_document(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
) -> Result<Json<DocumentDetail>> {
    let document = state
        .db
        .get_document_by_id(&document_id)
        .await?
        .ok_or_else(|| EngramError::NotFound(format!("Document {document_id} not found")))?;

    let entities = state
        .db
        .get_entities_for_document(&document.id)
        .await?
        .into_iter()
        .map(LinkedEntity::from)
        .collect();

    Ok(Json(DocumentDetail::from_parts(document, entities)))
}
