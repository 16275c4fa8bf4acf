use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngramError {
    #[error("Database error: {0}")]
    Database(#[from] libsql::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    #[error("Duplicate document: {0}")]
    DuplicateDocument(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Extraction gateway error: {0}")]
    Extraction(String),

    #[error("Extraction gateway unavailable: {0}")]
    ExtractionUnavailable(String),

    #[error("Rate limit exceeded, retry after {retry_after:?} seconds")]
    RateLimited { retry_after: Option<u64> },

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for EngramError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            EngramError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            EngramError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            EngramError::MalformedEvent(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            EngramError::DuplicateDocument(msg) => (StatusCode::CONFLICT, msg.clone()),
            EngramError::Database(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            EngramError::Embedding(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            EngramError::EmbeddingUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, msg.clone())
            }
            EngramError::Extraction(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            EngramError::ExtractionUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, msg.clone())
            }
            EngramError::RateLimited { .. } => (StatusCode::TOO_MANY_REQUESTS, self.to_string()),
            EngramError::Http(e) => (StatusCode::BAD_GATEWAY, e.to_string()),
            EngramError::Json(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            EngramError::Io(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            EngramError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({
            "error": message,
            "code": status.as_u16()
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, EngramError>;
