use async_trait::async_trait;

use crate::db::connection::Database;
use crate::db::repository::{DocumentRepository, EntityLinkRepository, ProcessedEventRepository};
use crate::db::traits::{DatabaseBackend, DocumentStore, EntityLinkStore, LedgerStore};
use crate::error::Result;
use crate::models::{
    Document, DocumentEntityLink, DocumentSummary, ListDocumentsQuery, Pagination, ProcessedEvent,
    ScoredDocument,
};

pub struct LibSqlBackend {
    db: Database,
}

impl LibSqlBackend {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LedgerStore for LibSqlBackend {
    async fn has_been_processed(
        &self,
        user_id: &str,
        source: &str,
        source_id: &str,
    ) -> Result<bool> {
        let conn = self.db.connect()?;
        ProcessedEventRepository::exists(&conn, user_id, source, source_id).await
    }

    async fn mark_processed(&self, record: &ProcessedEvent) -> Result<bool> {
        let conn = self.db.connect()?;
        ProcessedEventRepository::claim(&conn, record).await
    }

    async fn attach_episode(
        &self,
        user_id: &str,
        source: &str,
        source_id: &str,
        episode_id: &str,
    ) -> Result<()> {
        let conn = self.db.connect()?;
        ProcessedEventRepository::attach_episode(&conn, user_id, source, source_id, episode_id)
            .await
    }
}

#[async_trait]
impl DocumentStore for LibSqlBackend {
    async fn create_document(&self, doc: &Document) -> Result<()> {
        let conn = self.db.connect()?;
        DocumentRepository::create(&conn, doc).await
    }

    async fn get_document_by_id(&self, id: &str) -> Result<Option<Document>> {
        let conn = self.db.connect()?;
        DocumentRepository::get_by_id(&conn, id).await
    }

    async fn get_document_by_identity(
        &self,
        user_id: &str,
        source: &str,
        source_id: &str,
    ) -> Result<Option<Document>> {
        let conn = self.db.connect()?;
        DocumentRepository::get_by_identity(&conn, user_id, source, source_id).await
    }

    async fn backfill_embedding(&self, document_id: &str, embedding: &[f32]) -> Result<bool> {
        let conn = self.db.connect()?;
        DocumentRepository::update_embedding(&conn, document_id, embedding).await
    }

    async fn get_documents_missing_embedding(&self, limit: u32) -> Result<Vec<Document>> {
        let conn = self.db.connect()?;
        DocumentRepository::get_missing_embeddings(&conn, limit).await
    }

    async fn search_similar(
        &self,
        embedding: &[f32],
        user_id: &str,
        source: Option<&str>,
        limit: u32,
        threshold: f32,
    ) -> Result<Vec<ScoredDocument>> {
        let conn = self.db.connect()?;
        DocumentRepository::search_similar(&conn, embedding, user_id, source, limit, threshold)
            .await
    }

    async fn search_lexical(
        &self,
        query: &str,
        user_id: &str,
        source: Option<&str>,
        limit: u32,
    ) -> Result<Vec<Document>> {
        let conn = self.db.connect()?;
        DocumentRepository::search_lexical(&conn, query, user_id, source, limit).await
    }

    async fn list_documents(
        &self,
        query: &ListDocumentsQuery,
    ) -> Result<(Vec<DocumentSummary>, Pagination)> {
        let conn = self.db.connect()?;
        DocumentRepository::list(&conn, query).await
    }
}

#[async_trait]
impl EntityLinkStore for LibSqlBackend {
    async fn upsert_link(&self, link: &DocumentEntityLink) -> Result<()> {
        let conn = self.db.connect()?;
        EntityLinkRepository::upsert(&conn, link).await
    }

    async fn get_entities_for_document(
        &self,
        document_id: &str,
    ) -> Result<Vec<DocumentEntityLink>> {
        let conn = self.db.connect()?;
        EntityLinkRepository::get_by_document(&conn, document_id).await
    }

    async fn get_documents_for_entities(
        &self,
        entity_ids: &[String],
        limit: u32,
    ) -> Result<Vec<Document>> {
        let conn = self.db.connect()?;
        EntityLinkRepository::documents_for_entities(&conn, entity_ids, limit).await
    }
}

#[async_trait]
impl DatabaseBackend for LibSqlBackend {
    async fn sync(&self) -> Result<()> {
        self.db.sync().await
    }
}
