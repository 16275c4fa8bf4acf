use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    Document, DocumentEntityLink, DocumentSummary, ListDocumentsQuery, Pagination, ProcessedEvent,
    ScoredDocument,
};

// ---------------------------------------------------------------------------
// Individual store traits
// ---------------------------------------------------------------------------

/// Idempotency ledger over `(user_id, source, source_id)` triples.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Point lookup; cheap advisory pre-check before the expensive pipeline.
    async fn has_been_processed(&self, user_id: &str, source: &str, source_id: &str)
        -> Result<bool>;

    /// Atomic claim. Returns `true` when this call inserted the record and
    /// the caller owns the event; `false` when the triple was already
    /// claimed, which is a normal duplicate, not an error.
    async fn mark_processed(&self, record: &ProcessedEvent) -> Result<bool>;

    /// Attaches the extraction episode id to an existing ledger record.
    async fn attach_episode(
        &self,
        user_id: &str,
        source: &str,
        source_id: &str,
        episode_id: &str,
    ) -> Result<()>;
}

/// CRUD, vector search, and lexical fallback for documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Inserts a document. A `(source, source_id, user_id)` collision maps to
    /// `EngramError::DuplicateDocument`.
    async fn create_document(&self, doc: &Document) -> Result<()>;
    async fn get_document_by_id(&self, id: &str) -> Result<Option<Document>>;
    async fn get_document_by_identity(
        &self,
        user_id: &str,
        source: &str,
        source_id: &str,
    ) -> Result<Option<Document>>;

    /// Sets the embedding on a stored document. Returns `false` when the
    /// document no longer exists (a no-op, not an error).
    async fn backfill_embedding(&self, document_id: &str, embedding: &[f32]) -> Result<bool>;

    /// Oldest-first scan of documents still awaiting an embedding.
    async fn get_documents_missing_embedding(&self, limit: u32) -> Result<Vec<Document>>;

    /// Cosine similarity search over embedded documents, descending score,
    /// ties broken by more recent `source_created_at`. Rows with a null
    /// embedding or a score below `threshold` are excluded.
    async fn search_similar(
        &self,
        embedding: &[f32],
        user_id: &str,
        source: Option<&str>,
        limit: u32,
        threshold: f32,
    ) -> Result<Vec<ScoredDocument>>;

    /// Substring match over content and title, newest first. Fallback path
    /// when no query embedding is available.
    async fn search_lexical(
        &self,
        query: &str,
        user_id: &str,
        source: Option<&str>,
        limit: u32,
    ) -> Result<Vec<Document>>;

    async fn list_documents(
        &self,
        query: &ListDocumentsQuery,
    ) -> Result<(Vec<DocumentSummary>, Pagination)>;
}

/// Bridge between documents and extraction-engine entities.
#[async_trait]
pub trait EntityLinkStore: Send + Sync {
    /// Upserts a link; an existing `(document_id, entity_id)` pair merges by
    /// keeping the maximum of `mention_count` and `relevance_score`.
    async fn upsert_link(&self, link: &DocumentEntityLink) -> Result<()>;

    async fn get_entities_for_document(&self, document_id: &str)
        -> Result<Vec<DocumentEntityLink>>;

    /// Inverse lookup: documents linked to any of the given entities,
    /// deduplicated, ordered by best relevance then recency.
    async fn get_documents_for_entities(
        &self,
        entity_ids: &[String],
        limit: u32,
    ) -> Result<Vec<Document>>;
}

// ---------------------------------------------------------------------------
// Unified backend supertrait
// ---------------------------------------------------------------------------

/// A complete database backend combining all store traits plus lifecycle
/// operations (sync with a remote replica).
#[async_trait]
pub trait DatabaseBackend: LedgerStore + DocumentStore + EntityLinkStore {
    /// Sync with remote (e.g. Turso replication). No-op for local-only backends.
    async fn sync(&self) -> Result<()>;
}
