use axum::{
    routing::{get, post},
    Router,
};

use crate::api::state::AppState;

use super::handlers;

pub fn v1_router() -> Router<AppState> {
    let documents = Router::new()
        .route("/", get(handlers::documents::list_documents))
        .route("/{document_id}", get(handlers::documents::get_document));

    Router::new()
        .route("/ingest", post(handlers::ingest::ingest_event))
        .route("/sync", post(handlers::sync::sync_batch))
        .route("/query", post(handlers::query::query_context))
        .nest("/documents", documents)
        .route("/openapi.json", get(super::openapi::openapi_json))
        .merge(super::openapi::redoc_router())
}
