use axum::extract::State;
use axum::Json;
use validator::Validate;

use crate::api::extractors::AppJson;
use crate::api::AppState;
use crate::error::{EngramError, Result};
use crate::models::{IngestReceipt, RawEvent};

/// `POST /api/v1/ingest`
///
/// Runs one event through the full pipeline: dedup against the ledger,
/// store, embed, extract entities. A redelivery of an already-processed
/// event returns a `duplicate` receipt pointing at the stored document.
#[utoipa::path(
    post,
    path = "/api/v1/ingest",
    tag = "ingest",
    operation_id = "ingest.event",
    request_body = RawEvent,
    responses(
        (status = 200, description = "Ingest receipt", body = IngestReceipt),
        (status = 400, description = "Malformed or invalid event"),
    )
)]
pub async fn ingest_event(
    State(state): State<AppState>,
    AppJson(event): AppJson<RawEvent>,
) -> Result<Json<IngestReceipt>> {
    event
        .validate()
        .map_err(|e| EngramError::Validation(e.to_string()))?;

    let receipt = state.ingest.ingest_event(&event).await?;
    Ok(Json(receipt))
}
