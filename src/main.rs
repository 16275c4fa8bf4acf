use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use engram::api::{create_router, AppState};
use engram::config::Config;
use engram::db::{Database, DatabaseBackend, LibSqlBackend};
use engram::embeddings::EmbeddingProvider;
use engram::extraction::ExtractionProvider;
use engram::services::BackfillManager;

#[derive(Parser)]
#[command(name = "engram")]
#[command(about = "Self-hostable episodic memory service")]
struct Args {
    /// Run a single embedding backfill pass and exit
    #[arg(long)]
    backfill_once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "engram=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    tracing::info!("Initializing database...");
    let raw_db = Database::new(&config.database, config.embeddings.dimensions).await?;
    let db_backend = LibSqlBackend::new(raw_db);
    // Wrap in Arc<dyn DatabaseBackend> immediately so we can clone it
    let db: Arc<dyn DatabaseBackend> = Arc::new(db_backend);

    let embeddings = EmbeddingProvider::from_config(&config.embeddings);
    if !embeddings.is_available() {
        tracing::warn!(
            "Embeddings unavailable - documents will be stored without vectors and retrieval falls back to lexical search"
        );
    }

    let extraction = ExtractionProvider::from_config(config.extraction.as_ref());
    if !extraction.is_available() {
        tracing::warn!(
            "Extraction gateway unavailable - events will not produce episodes or entity links"
        );
    }

    let backfill = BackfillManager::new(
        db.clone(),
        embeddings.clone(),
        config.ingestion.backfill_batch_size,
        config.ingestion.backfill_interval_secs,
    );

    if args.backfill_once {
        let count = backfill.run_once().await?;
        tracing::info!("Backfill pass complete: {} documents embedded", count);
        return Ok(());
    }

    let state = AppState::new(config.clone(), db, embeddings, extraction);

    let cancel_token = CancellationToken::new();

    tracing::info!(
        "Starting embedding backfill manager... (interval={}s, batch={})",
        config.ingestion.backfill_interval_secs,
        config.ingestion.backfill_batch_size
    );
    let token = cancel_token.child_token();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::info!("Backfill manager shutting down...");
                    break;
                }
                _ = tokio::time::sleep(tokio::time::Duration::from_secs(backfill.interval_secs())) => {
                    if let Err(e) = backfill.run_once().await {
                        tracing::error!("Backfill manager error: {}", e);
                    }
                }
            }
        }
    });

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Engram starting on http://{}", addr);
    tracing::info!("  Health check: http://{}/health", addr);
    tracing::info!("  API docs:     http://{}/api/v1/docs", addr);
    tracing::info!("  OpenAPI spec: http://{}/api/v1/openapi.json", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel_token))
        .await?;

    Ok(())
}

async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, cancelling background tasks...");
    cancel_token.cancel();
}
