use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::db::DatabaseBackend;
use crate::embeddings::EmbeddingProvider;
use crate::error::Result;

/// Background worker that embeds documents stored while the embedding
/// provider was down or failing. Each pass picks up the oldest documents
/// with a null embedding, embeds them in one batch, and writes the
/// vectors back.
#[derive(Clone)]
pub struct BackfillManager {
    db: Arc<dyn DatabaseBackend>,
    embeddings: EmbeddingProvider,
    batch_size: usize,
    interval_secs: u64,
}

impl BackfillManager {
    pub fn new(
        db: Arc<dyn DatabaseBackend>,
        embeddings: EmbeddingProvider,
        batch_size: usize,
        interval_secs: u64,
    ) -> Self {
        Self {
            db,
            embeddings,
            batch_size,
            interval_secs,
        }
    }

    /// Runs a single backfill pass. Returns how many documents received
    /// an embedding.
    pub async fn run_once(&self) -> Result<u64> {
        if !self.embeddings.is_available() {
            debug!("Embedding provider unavailable, skipping backfill pass");
            return Ok(0);
        }

        let mut pending = self
            .db
            .get_documents_missing_embedding(self.batch_size as u32)
            .await?;
        // Empty documents have nothing to embed and stay as-is.
        pending.retain(|doc| !doc.content.is_empty());
        if pending.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = pending.iter().map(|doc| doc.content.clone()).collect();
        let vectors = self.embeddings.embed_passages(&texts).await?;

        let mut backfilled = 0u64;
        for (document, vector) in pending.iter().zip(vectors.iter()) {
            match self.db.backfill_embedding(&document.id, vector).await {
                Ok(true) => backfilled += 1,
                Ok(false) => {
                    debug!(document_id = %document.id, "Document vanished before backfill");
                }
                Err(e) => {
                    warn!(
                        document_id = %document.id,
                        "Failed to store backfilled embedding: {}",
                        e
                    );
                }
            }
        }

        info!(
            backfilled,
            pending = pending.len(),
            "Embedding backfill pass complete"
        );
        Ok(backfilled)
    }

    pub fn interval_secs(&self) -> u64 {
        self.interval_secs
    }
}
