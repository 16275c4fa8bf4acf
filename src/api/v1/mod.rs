pub mod handlers;
pub mod openapi;
pub mod router;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::api::routes::create_router;
    use crate::api::state::AppState;
    use crate::config::{
        Config, DatabaseConfig, EmbeddingsConfig, IngestionConfig, RetrievalConfig, ServerConfig,
    };
    use crate::db::{Database, DatabaseBackend, LibSqlBackend};
    use crate::embeddings::EmbeddingProvider;
    use crate::extraction::ExtractionProvider;

    fn test_config() -> Config {
        use std::time::{SystemTime, UNIX_EPOCH};

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let thread_id = std::thread::current().id();

        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: format!(
                    "file:/tmp/engram_api_test_{thread_id:?}_{timestamp}?mode=memory&cache=shared"
                ),
                auth_token: None,
                local_path: None,
            },
            embeddings: EmbeddingsConfig {
                model: "text-embedding-3-small".to_string(),
                api_key: None,
                base_url: None,
                dimensions: 4,
                batch_size: 32,
                timeout_secs: 5,
                max_retries: 0,
            },
            extraction: None,
            retrieval: RetrievalConfig {
                similarity_floor: 0.3,
                max_documents: 10,
                max_facts: 10,
                max_entity_fanout: 20,
                facts_timeout_secs: 2,
            },
            ingestion: IngestionConfig {
                link_relevance: 0.8,
                backfill_interval_secs: 300,
                backfill_batch_size: 32,
            },
        }
    }

    /// State with no embedding or extraction provider configured. Ingestion
    /// degrades to store-only and queries fall back to lexical search,
    /// which is exactly what router tests need.
    async fn test_state() -> AppState {
        let config = test_config();

        let raw_db = Database::new(&config.database, config.embeddings.dimensions)
            .await
            .unwrap();
        let db: Arc<dyn DatabaseBackend> = Arc::new(LibSqlBackend::new(raw_db));

        let embeddings = EmbeddingProvider::from_config(&config.embeddings);
        let extraction = ExtractionProvider::from_config(config.extraction.as_ref());

        AppState::new(config, db, embeddings, extraction)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    const EVENT_JSON: &str = r#"{
        "user_id": "user-7",
        "source": "gmail",
        "message_id": "msg-1",
        "subject": "Quarterly sync",
        "sender": "ana@example.com",
        "body": "Notes from the quarterly sync with Acme.",
        "occurred_at": "2025-06-01T09:30:00Z"
    }"#;

    #[tokio::test]
    async fn health_reports_component_status() {
        let app = create_router(test_state().await);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["database"]["status"], "ok");
        assert_eq!(json["embeddings"]["status"], "unavailable");
        assert_eq!(json["extraction"]["status"], "unavailable");
    }

    #[tokio::test]
    async fn openapi_json_is_valid() {
        let app = create_router(test_state().await);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let version = json["openapi"]
            .as_str()
            .expect("openapi field should be a string");
        assert!(
            version.starts_with("3"),
            "OpenAPI version should start with 3, got: {version}"
        );
    }

    #[tokio::test]
    async fn ingest_then_redeliver_through_router() {
        let app = create_router(test_state().await);

        let response = app
            .clone()
            .oneshot(post_json("/api/v1/ingest", EVENT_JSON))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let first = body_json(response).await;
        assert_eq!(first["status"], "processed");
        let document_id = first["document_id"]
            .as_str()
            .expect("receipt should carry a document id")
            .to_string();

        let response = app
            .oneshot(post_json("/api/v1/ingest", EVENT_JSON))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let second = body_json(response).await;
        assert_eq!(second["status"], "duplicate");
        assert_eq!(second["document_id"], document_id.as_str());
    }

    #[tokio::test]
    async fn ingest_rejects_body_missing_required_field() {
        let app = create_router(test_state().await);

        let response = app
            .oneshot(post_json("/api/v1/ingest", "{}"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        let message = json["error"].as_str().unwrap();
        assert!(
            message.contains("Missing required field"),
            "unexpected error message: {message}"
        );
        assert_eq!(json["code"], 400);
    }

    #[tokio::test]
    async fn ingest_rejects_event_without_message_id() {
        let app = create_router(test_state().await);

        let body = r#"{"user_id": "user-7", "source": "gmail", "message_id": null}"#;
        let response = app
            .oneshot(post_json("/api/v1/ingest", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["code"], 400);
    }

    #[tokio::test]
    async fn sync_rejects_empty_batch() {
        let app = create_router(test_state().await);

        let response = app
            .oneshot(post_json("/api/v1/sync", r#"{"events": []}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn query_rejects_blank_query() {
        let app = create_router(test_state().await);

        let response = app
            .oneshot(post_json(
                "/api/v1/query",
                r#"{"query": "", "user_id": "user-7"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn query_on_fresh_store_returns_explicit_no_context() {
        let app = create_router(test_state().await);

        let response = app
            .oneshot(post_json(
                "/api/v1/query",
                r#"{"query": "anything at all", "user_id": "user-7"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["context_found"], false);
        assert_eq!(json["total_documents"], 0);
        assert_eq!(json["facts_available"], false);
    }

    #[tokio::test]
    async fn documents_listed_after_ingest() {
        let app = create_router(test_state().await);

        let response = app
            .clone()
            .oneshot(post_json("/api/v1/ingest", EVENT_JSON))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/documents?user_id=user-7")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["documents"].as_array().unwrap().len(), 1);
        assert_eq!(json["documents"][0]["title"], "Quarterly sync");
        assert_eq!(json["pagination"]["total_items"], 1);
    }

    #[tokio::test]
    async fn document_detail_returns_404_for_unknown_id() {
        let app = create_router(test_state().await);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/documents/not-a-real-id")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["code"], 404);
    }

    #[tokio::test]
    async fn list_documents_requires_user_id() {
        let app = create_router(test_state().await);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/documents")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
