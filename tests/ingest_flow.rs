//! End-to-end ingestion tests: events in over HTTP, documents and entity
//! links out, with the ledger keeping redeliveries idempotent.

use std::net::SocketAddr;
use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use engram::api::{create_router, AppState};
use engram::config::{
    Config, DatabaseConfig, EmbeddingsConfig, ExtractionConfig, IngestionConfig, RetrievalConfig,
    ServerConfig,
};
use engram::db::{Database, DatabaseBackend, LibSqlBackend};
use engram::embeddings::EmbeddingProvider;
use engram::extraction::ExtractionProvider;

fn base_config(db_url: String) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        database: DatabaseConfig {
            url: db_url,
            auth_token: None,
            local_path: None,
        },
        embeddings: EmbeddingsConfig {
            model: "text-embedding-3-small".to_string(),
            api_key: None,
            base_url: None,
            dimensions: 4,
            batch_size: 8,
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

async fn serve(config: Config) -> SocketAddr {
    let db = Database::new(&config.database, config.embeddings.dimensions)
        .await
        .expect("Failed to create database");
    let db: Arc<dyn DatabaseBackend> = Arc::new(LibSqlBackend::new(db));

    let embeddings = EmbeddingProvider::from_config(&config.embeddings);
    let extraction = ExtractionProvider::from_config(config.extraction.as_ref());

    let state = AppState::new(config, db, embeddings, extraction);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get address");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    addr
}

/// Full stack: one wiremock server plays both providers, embeddings under
/// `/embeddings` and the extraction gateway under `/episodes`.
async fn setup_test_app() -> (SocketAddr, TempDir, MockServer) {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(|req: &Request| {
            let body: serde_json::Value = serde_json::from_slice(&req.body).unwrap();
            let count = body["input"].as_array().map(Vec::len).unwrap_or(1);
            let data: Vec<_> = (0..count)
                .map(|_| json!({ "embedding": [0.1, 0.2, 0.3, 0.4] }))
                .collect();
            ResponseTemplate::new(200).set_body_json(json!({ "data": data }))
        })
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/episodes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "episode_id": "ep-1",
            "entities": [
                { "id": "ent-acme", "name": "Acme Corp", "type": "Organization" },
                { "id": "ent-ana", "name": "Ana Flores", "type": "Person" }
            ],
            "relations": [
                {
                    "fact": "Ana Flores works at Acme Corp",
                    "source_entity": "ent-ana",
                    "target_entity": "ent-acme"
                }
            ]
        })))
        .mount(&mock_server)
        .await;

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("engram_test.db");
    let db_url = format!("file:{}", db_path.to_str().unwrap());

    let mut config = base_config(db_url);
    config.embeddings.api_key = Some("test-key".to_string());
    config.embeddings.base_url = Some(mock_server.uri());
    config.extraction = Some(ExtractionConfig {
        base_url: mock_server.uri(),
        api_key: None,
        timeout_secs: 5,
        max_retries: 0,
    });

    let addr = serve(config).await;
    (addr, temp_dir, mock_server)
}

/// No embedding key, no extraction gateway. Ingestion must still accept
/// events and store documents.
async fn setup_degraded_app() -> (SocketAddr, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("engram_test.db");
    let db_url = format!("file:{}", db_path.to_str().unwrap());

    let addr = serve(base_config(db_url)).await;
    (addr, temp_dir)
}

fn email_event(message_id: &str, subject: &str, body: &str) -> serde_json::Value {
    json!({
        "user_id": "user-1",
        "source": "gmail",
        "message_id": message_id,
        "subject": subject,
        "sender": "ana@acme.example",
        "body": body,
        "occurred_at": "2025-06-01T09:30:00Z"
    })
}

#[tokio::test]
async fn test_sync_batch_creates_documents_and_links() {
    let (addr, _temp_dir, _mock_server) = setup_test_app().await;
    let client = reqwest::Client::new();
    let base_url = format!("http://{addr}");

    let events = json!({
        "events": [
            email_event("msg-1", "Pricing update", "Acme raised pricing by 8 percent."),
            email_event("msg-2", "Team offsite", "The offsite is in Lisbon in September."),
            email_event("msg-3", "Renewal call notes", "Renewal call moved to Thursday."),
        ]
    });

    let res = client
        .post(format!("{base_url}/api/v1/sync"))
        .json(&events)
        .send()
        .await
        .expect("Failed to sync");
    assert!(res.status().is_success());

    let summary: serde_json::Value = res.json().await.expect("Failed to parse summary");
    assert_eq!(summary["processed"], 3);
    assert_eq!(summary["duplicates"], 0);
    assert_eq!(summary["failed"], 0);

    let results = summary["results"].as_array().expect("results missing");
    assert_eq!(results.len(), 3);
    for receipt in results {
        assert_eq!(receipt["status"], "processed");
        assert!(receipt["document_id"].is_string());
        assert_eq!(receipt["episode_id"], "ep-1");
        assert_eq!(receipt["entities_linked"], 2);
    }

    let res = client
        .get(format!("{base_url}/api/v1/documents?user_id=user-1"))
        .send()
        .await
        .expect("Failed to list documents");
    assert!(res.status().is_success());

    let listing: serde_json::Value = res.json().await.expect("Failed to parse listing");
    assert_eq!(listing["documents"].as_array().unwrap().len(), 3);
    assert_eq!(listing["pagination"]["total_items"], 3);
}

#[tokio::test]
async fn test_resync_is_idempotent() {
    let (addr, _temp_dir, _mock_server) = setup_test_app().await;
    let client = reqwest::Client::new();
    let base_url = format!("http://{addr}");

    let events = json!({
        "events": [
            email_event("msg-1", "Pricing update", "Acme raised pricing by 8 percent."),
            email_event("msg-2", "Team offsite", "The offsite is in Lisbon in September."),
        ]
    });

    let res = client
        .post(format!("{base_url}/api/v1/sync"))
        .json(&events)
        .send()
        .await
        .expect("Failed to sync");
    let first: serde_json::Value = res.json().await.expect("Failed to parse summary");
    assert_eq!(first["processed"], 2);

    // The connector re-delivers the same page on its next run.
    let res = client
        .post(format!("{base_url}/api/v1/sync"))
        .json(&events)
        .send()
        .await
        .expect("Failed to re-sync");
    let second: serde_json::Value = res.json().await.expect("Failed to parse summary");
    assert_eq!(second["processed"], 0);
    assert_eq!(second["duplicates"], 2);
    assert_eq!(second["failed"], 0);

    // Duplicate receipts still point at the stored documents.
    for receipt in second["results"].as_array().unwrap() {
        assert_eq!(receipt["status"], "duplicate");
        assert!(receipt["document_id"].is_string());
    }

    let res = client
        .get(format!("{base_url}/api/v1/documents?user_id=user-1"))
        .send()
        .await
        .expect("Failed to list documents");
    let listing: serde_json::Value = res.json().await.expect("Failed to parse listing");
    assert_eq!(listing["pagination"]["total_items"], 2);
}

#[tokio::test]
async fn test_document_detail_shows_linked_entities() {
    let (addr, _temp_dir, _mock_server) = setup_test_app().await;
    let client = reqwest::Client::new();
    let base_url = format!("http://{addr}");

    let res = client
        .post(format!("{base_url}/api/v1/ingest"))
        .json(&email_event(
            "msg-1",
            "Pricing update",
            "Acme raised pricing by 8 percent.",
        ))
        .send()
        .await
        .expect("Failed to ingest");
    assert!(res.status().is_success());
    let receipt: serde_json::Value = res.json().await.expect("Failed to parse receipt");
    let doc_id = receipt["document_id"].as_str().expect("document_id missing");

    let res = client
        .get(format!("{base_url}/api/v1/documents/{doc_id}"))
        .send()
        .await
        .expect("Failed to fetch document");
    assert!(res.status().is_success());

    let detail: serde_json::Value = res.json().await.expect("Failed to parse detail");
    assert_eq!(detail["title"], "Pricing update");
    assert_eq!(detail["type"], "email");
    assert_eq!(detail["has_embedding"], true);
    assert_eq!(detail["metadata"]["sender"], "ana@acme.example");

    let entities = detail["entities"].as_array().expect("entities missing");
    assert_eq!(entities.len(), 2);
    let names: Vec<&str> = entities
        .iter()
        .map(|e| e["entity_name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"Acme Corp"));
    assert!(names.contains(&"Ana Flores"));
}

#[tokio::test]
async fn test_bad_event_does_not_abort_batch() {
    let (addr, _temp_dir, _mock_server) = setup_test_app().await;
    let client = reqwest::Client::new();
    let base_url = format!("http://{addr}");

    let events = json!({
        "events": [
            email_event("msg-1", "Pricing update", "Acme raised pricing by 8 percent."),
            // No message_id: identity cannot be resolved.
            { "user_id": "user-1", "source": "gmail", "subject": "Mystery" },
            email_event("msg-1", "Pricing update", "Acme raised pricing by 8 percent."),
        ]
    });

    let res = client
        .post(format!("{base_url}/api/v1/sync"))
        .json(&events)
        .send()
        .await
        .expect("Failed to sync");
    assert!(res.status().is_success());

    let summary: serde_json::Value = res.json().await.expect("Failed to parse summary");
    assert_eq!(summary["processed"], 1);
    assert_eq!(summary["failed"], 1);
    assert_eq!(summary["duplicates"], 1);

    let results = summary["results"].as_array().unwrap();
    assert_eq!(results[0]["status"], "processed");
    assert_eq!(results[1]["status"], "failed");
    assert!(results[1]["error"].is_string());
    assert_eq!(results[2]["status"], "duplicate");
}

#[tokio::test]
async fn test_ingest_degrades_without_providers() {
    let (addr, _temp_dir) = setup_degraded_app().await;
    let client = reqwest::Client::new();
    let base_url = format!("http://{addr}");

    let res = client
        .post(format!("{base_url}/api/v1/ingest"))
        .json(&email_event(
            "msg-1",
            "Pricing update",
            "Acme raised pricing by 8 percent.",
        ))
        .send()
        .await
        .expect("Failed to ingest");
    assert!(res.status().is_success());

    let receipt: serde_json::Value = res.json().await.expect("Failed to parse receipt");
    assert_eq!(receipt["status"], "processed");
    assert_eq!(receipt["entities_linked"], 0);
    assert!(receipt.get("episode_id").is_none());

    let doc_id = receipt["document_id"].as_str().expect("document_id missing");
    let res = client
        .get(format!("{base_url}/api/v1/documents/{doc_id}"))
        .send()
        .await
        .expect("Failed to fetch document");
    let detail: serde_json::Value = res.json().await.expect("Failed to parse detail");
    assert_eq!(detail["has_embedding"], false);
    assert_eq!(detail["entities"].as_array().unwrap().len(), 0);
}
