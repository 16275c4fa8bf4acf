use axum::extract::State;
use axum::Json;
use validator::Validate;

use crate::api::extractors::AppJson;
use crate::api::AppState;
use crate::error::{EngramError, Result};
use crate::models::{AnswerContext, QueryRequest};

/// `POST /api/v1/query`
///
/// Hybrid retrieval: vector search over the user's documents plus graph
/// facts for the entities those documents mention. Degrades to lexical
/// search and document-only context when providers are down.
#[utoipa::path(
    post,
    path = "/api/v1/query",
    tag = "query",
    operation_id = "query.context",
    request_body = QueryRequest,
    responses(
        (status = 200, description = "Assembled answer context", body = AnswerContext),
        (status = 400, description = "Invalid query"),
    )
)]
pub async fn query_context(
    State(state): State<AppState>,
    AppJson(request): AppJson<QueryRequest>,
) -> Result<Json<AnswerContext>> {
    request
        .validate()
        .map_err(|e| EngramError::Validation(e.to_string()))?;

    let context = state.retrieval.answer_context(&request).await?;
    Ok(Json(context))
}
