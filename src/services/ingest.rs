use std::sync::Arc;

use nanoid::nanoid;
use tracing::{debug, info, warn};

use crate::db::DatabaseBackend;
use crate::embeddings::EmbeddingProvider;
use crate::error::{EngramError, Result};
use crate::extraction::{sanitize_group_id, EpisodeInput, ExtractionProvider};
use crate::models::{
    Document, DocumentEntityLink, EventIdentity, IngestReceipt, IngestStatus, ProcessedEvent,
    RawEvent, SyncSummary,
};

/// Longest episode name sent to the extraction engine, in code points.
const EPISODE_NAME_MAX_CHARS: usize = 100;

/// Plaintext block the extraction engine sees for one event: provider
/// headers first, then the body. Deterministic for a given event.
pub fn episode_body(event: &RawEvent) -> String {
    let mut headers = Vec::new();
    if let Some(sender) = event.sender.as_deref().filter(|s| !s.trim().is_empty()) {
        headers.push(format!("From: {}", sender.trim()));
    }
    if let Some(subject) = event.subject.as_deref().filter(|s| !s.trim().is_empty()) {
        headers.push(format!("Subject: {}", subject.trim()));
    }
    if let Some(occurred_at) = event.occurred_at {
        headers.push(format!("Date: {}", occurred_at.to_rfc3339()));
    }
    if let Some(message_id) = event.message_id.as_deref().filter(|s| !s.trim().is_empty()) {
        headers.push(format!("Message ID: {}", message_id.trim()));
    }

    let body = event.body.as_deref().unwrap_or("").trim();
    format!("{}\n\nBody:\n{}", headers.join("\n"), body)
}

/// Episode name: the subject truncated to [`EPISODE_NAME_MAX_CHARS`].
pub fn episode_name(event: &RawEvent) -> String {
    let subject = event
        .subject
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("No subject");
    subject.chars().take(EPISODE_NAME_MAX_CHARS).collect()
}

/// The ingestion pipeline: resolve identity, store the document, extract
/// entities, link them, and claim the idempotency ledger. Embedding and
/// extraction are enhancements; their failure degrades the stored record
/// but never fails the ingest.
#[derive(Clone)]
pub struct IngestService {
    db: Arc<dyn DatabaseBackend>,
    embeddings: EmbeddingProvider,
    extraction: ExtractionProvider,
    link_relevance: f32,
}

impl IngestService {
    pub fn new(
        db: Arc<dyn DatabaseBackend>,
        embeddings: EmbeddingProvider,
        extraction: ExtractionProvider,
        link_relevance: f32,
    ) -> Self {
        Self {
            db,
            embeddings,
            extraction,
            link_relevance,
        }
    }

    /// Ingests one event. Returns `Err` only for malformed events and
    /// infrastructure failures; a duplicate delivery is a normal
    /// [`IngestStatus::Duplicate`] receipt.
    ///
    /// The pipeline is store -> extract -> link -> mark-processed, ledger
    /// claim last, so a crash mid-pipeline leaves the durable document in
    /// place and the ledger unclaimed. Concurrent deliveries of the same
    /// event race on the document's unique identity index: exactly one
    /// writer inserts and runs extraction, the rest observe the conflict
    /// and report a duplicate.
    pub async fn ingest_event(&self, event: &RawEvent) -> Result<IngestReceipt> {
        let identity = EventIdentity::resolve(event)?;
        let source = identity.source.to_string();

        if self
            .db
            .has_been_processed(&identity.user_id, &source, &identity.source_id)
            .await?
        {
            debug!(
                user_id = %identity.user_id,
                source_id = %identity.source_id,
                "Event already processed, skipping"
            );
            return Ok(IngestReceipt::duplicate(
                self.existing_document_id(&identity, &source).await?,
            ));
        }

        let document = self.build_document(&identity, event).await;

        match self.db.create_document(&document).await {
            Ok(_) => {}
            Err(EngramError::DuplicateDocument(_)) => {
                // Another writer, or an earlier run that died before
                // claiming the ledger, already stored this event. Bring the
                // ledger back in agreement and report the duplicate.
                let record = ProcessedEvent::new(&identity, None);
                self.db.mark_processed(&record).await?;
                debug!(
                    user_id = %identity.user_id,
                    source_id = %identity.source_id,
                    "Document already stored for this event"
                );
                return Ok(IngestReceipt::duplicate(
                    self.existing_document_id(&identity, &source).await?,
                ));
            }
            Err(e) => return Err(e),
        }

        let mut episode_id = None;
        let mut entities_linked = 0;
        if self.extraction.is_available() && !document.content.is_empty() {
            match self.extract_and_link(&document, event).await {
                Ok((episode, linked)) => {
                    episode_id = Some(episode);
                    entities_linked = linked;
                }
                Err(e) => {
                    warn!(
                        document_id = %document.id,
                        "Entity extraction failed, document stored without episode: {}",
                        e
                    );
                }
            }
        }

        let record = ProcessedEvent::new(&identity, episode_id.clone());
        let claimed = self.db.mark_processed(&record).await?;
        if !claimed {
            // A concurrent duplicate delivery claimed the ledger row while
            // extraction was running. The work here still stands; record
            // the episode on the existing row.
            if let Some(ref episode) = episode_id {
                self.db
                    .attach_episode(&identity.user_id, &source, &identity.source_id, episode)
                    .await?;
            }
        }

        info!(
            user_id = %identity.user_id,
            document_id = %document.id,
            entities_linked,
            has_embedding = document.embedding.is_some(),
            "Event ingested"
        );

        Ok(IngestReceipt {
            status: IngestStatus::Processed,
            document_id: Some(document.id),
            episode_id,
            entities_linked,
            error: None,
        })
    }

    /// Ingests a batch of events with per-event isolation: one bad event
    /// becomes a failed receipt, never an aborted batch.
    pub async fn sync_batch(&self, events: &[RawEvent]) -> SyncSummary {
        let mut results = Vec::with_capacity(events.len());
        for event in events {
            let receipt = match self.ingest_event(event).await {
                Ok(receipt) => receipt,
                Err(e) => {
                    warn!("Event failed during sync: {}", e);
                    IngestReceipt::failed(e.to_string())
                }
            };
            results.push(receipt);
        }

        let summary = SyncSummary::from_receipts(results);
        info!(
            processed = summary.processed,
            duplicates = summary.duplicates,
            failed = summary.failed,
            "Sync batch complete"
        );
        summary
    }

    async fn build_document(&self, identity: &EventIdentity, event: &RawEvent) -> Document {
        let content = event.searchable_content();
        let mut document = Document::new(
            nanoid!(),
            identity.user_id.clone(),
            identity.source.clone(),
            identity.source_id.clone(),
            content,
        );
        document.title = event
            .subject
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from);
        document.source_created_at = event.occurred_at;

        let mut metadata = event.metadata.clone().unwrap_or_default();
        if let Some(sender) = event.sender.as_deref().filter(|s| !s.trim().is_empty()) {
            metadata
                .entry("sender".to_string())
                .or_insert_with(|| serde_json::json!(sender.trim()));
        }
        document.metadata = metadata;

        if self.embeddings.is_available() && !document.content.is_empty() {
            match self.embeddings.embed_passage(&document.content).await {
                Ok(vector) => document.embedding = Some(vector),
                Err(e) => {
                    warn!(
                        document_id = %document.id,
                        "Embedding failed, document will be backfilled later: {}",
                        e
                    );
                }
            }
        }

        document
    }

    async fn extract_and_link(
        &self,
        document: &Document,
        event: &RawEvent,
    ) -> Result<(String, usize)> {
        let input = EpisodeInput {
            name: episode_name(event),
            episode_body: episode_body(event),
            source_description: format!("{} message", document.source),
            reference_time: event.occurred_at.unwrap_or(document.created_at),
            group_id: sanitize_group_id(&document.user_id),
        };

        let outcome = self.extraction.process(&input).await?;

        let mut linked = 0;
        for entity in &outcome.entities {
            let link = DocumentEntityLink::new(
                nanoid!(),
                document.id.clone(),
                entity,
                1,
                self.link_relevance,
            )?;
            self.db.upsert_link(&link).await?;
            linked += 1;
        }

        debug!(
            document_id = %document.id,
            episode_id = %outcome.episode_id,
            entities = outcome.entities.len(),
            relations = outcome.relations.len(),
            "Extraction complete"
        );

        Ok((outcome.episode_id, linked))
    }

    async fn existing_document_id(
        &self,
        identity: &EventIdentity,
        source: &str,
    ) -> Result<Option<String>> {
        Ok(self
            .db
            .get_document_by_identity(&identity.user_id, source, &identity.source_id)
            .await?
            .map(|doc| doc.id))
    }
}
