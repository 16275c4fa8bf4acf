use axum::extract::State;
use axum::Json;
use validator::Validate;

use crate::api::extractors::AppJson;
use crate::api::AppState;
use crate::error::{EngramError, Result};
use crate::models::{SyncRequest, SyncSummary};

/// `POST /api/v1/sync`
///
/// Batch ingestion for connector back-syncs. Events are processed in
/// order; one bad event fails its own receipt without aborting the rest.
#[utoipa::path(
    post,
    path = "/api/v1/sync",
    tag = "ingest",
    operation_id = "ingest.sync",
    request_body = SyncRequest,
    responses(
        (status = 200, description = "Per-event receipts and batch counts", body = SyncSummary),
        (status = 400, description = "Invalid batch"),
    )
)]
pub async fn sync_batch(
    State(state): State<AppState>,
    AppJson(request): AppJson<SyncRequest>,
) -> Result<Json<SyncSummary>> {
    request
        .validate()
        .map_err(|e| EngramError::Validation(e.to_string()))?;

    let summary = state.ingest.sync_batch(&request.events).await;
    Ok(Json(summary))
}
