use std::sync::Arc;

use crate::config::Config;
use crate::db::DatabaseBackend;
use crate::embeddings::EmbeddingProvider;
use crate::extraction::ExtractionProvider;
use crate::services::{IngestService, RetrievalService};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Arc<dyn DatabaseBackend>,
    pub embeddings: EmbeddingProvider,
    pub extraction: ExtractionProvider,
    pub ingest: IngestService,
    pub retrieval: RetrievalService,
}

impl AppState {
    pub fn new(
        config: Config,
        db: Arc<dyn DatabaseBackend>,
        embeddings: EmbeddingProvider,
        extraction: ExtractionProvider,
    ) -> Self {
        let config = Arc::new(config);
        let ingest = IngestService::new(
            db.clone(),
            embeddings.clone(),
            extraction.clone(),
            config.ingestion.link_relevance,
        );
        let retrieval = RetrievalService::new(
            db.clone(),
            embeddings.clone(),
            extraction.clone(),
            config.retrieval.clone(),
        );

        Self {
            config,
            db,
            embeddings,
            extraction,
            ingest,
            retrieval,
        }
    }
}
