use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::v1;
use super::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(v1::handlers::health_check))
        .nest("/api/v1", v1::router::v1_router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
