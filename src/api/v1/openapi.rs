use axum::Json;
use utoipa::OpenApi;
use utoipa_redoc::{Redoc, Servable};

use super::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Engram API",
        version = "1.0.0",
        description = "Episodic memory service. Ingests email and message events exactly once, \
                       links them to a knowledge graph, and serves hybrid document + fact retrieval.",
    ),
    paths(
        handlers::health::health_check,
        handlers::ingest::ingest_event,
        handlers::sync::sync_batch,
        handlers::query::query_context,
        handlers::documents::list_documents,
        handlers::documents::get_document,
    ),
    components(schemas(
        // Ingestion
        models::RawEvent,
        models::IngestStatus,
        models::IngestReceipt,
        models::SyncRequest,
        models::SyncSummary,
        // Retrieval
        models::QueryRequest,
        models::AnswerContext,
        models::ContextDocument,
        models::Fact,
        // Documents
        models::DocumentSummary,
        models::ListDocumentsResponse,
        models::LinkedEntity,
        models::DocType,
        models::Pagination,
        handlers::documents::DocumentDetail,
        // Health (handler-local types)
        handlers::health::HealthData,
        handlers::health::DatabaseStatus,
        handlers::health::EmbeddingsStatus,
        handlers::health::ExtractionStatus,
    )),
    tags(
        (name = "health", description = "Health check"),
        (name = "ingest", description = "Event ingestion, single and batch"),
        (name = "query", description = "Hybrid context retrieval"),
        (name = "documents", description = "Stored document listing and detail"),
    )
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn redoc_router<S: Clone + Send + Sync + 'static>() -> axum::Router<S> {
    Redoc::with_url("/docs", ApiDoc::openapi()).into()
}
