use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::RetrievalConfig;
use crate::db::DatabaseBackend;
use crate::embeddings::EmbeddingProvider;
use crate::error::Result;
use crate::extraction::{sanitize_group_id, ExtractionProvider};
use crate::models::{AnswerContext, ContextDocument, Fact, QueryRequest};

/// Hybrid retrieval: vector search over stored documents fused with
/// relationship facts from the extraction engine's graph. Either half can
/// degrade independently; the service always produces a context, possibly
/// an explicitly empty one.
#[derive(Clone)]
pub struct RetrievalService {
    db: Arc<dyn DatabaseBackend>,
    embeddings: EmbeddingProvider,
    extraction: ExtractionProvider,
    config: RetrievalConfig,
}

impl RetrievalService {
    pub fn new(
        db: Arc<dyn DatabaseBackend>,
        embeddings: EmbeddingProvider,
        extraction: ExtractionProvider,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            db,
            embeddings,
            extraction,
            config,
        }
    }

    pub async fn answer_context(&self, request: &QueryRequest) -> Result<AnswerContext> {
        let max_documents = request
            .max_documents
            .map(|n| n as usize)
            .unwrap_or(self.config.max_documents);
        let max_facts = request
            .max_facts
            .map(|n| n as usize)
            .unwrap_or(self.config.max_facts);
        let floor = request
            .min_similarity
            .unwrap_or(self.config.similarity_floor);

        let mut documents = self.find_documents(request, max_documents, floor).await?;

        let (entity_ids, entity_names) = self.candidate_entities(&documents).await?;

        // Documents sharing an entity with the top hits fill remaining
        // slots; they carry no similarity score.
        if documents.len() < max_documents && !entity_ids.is_empty() {
            self.expand_by_entities(&mut documents, &entity_ids, request, max_documents)
                .await;
        }

        let (mut facts, facts_available) = self
            .gather_facts(&entity_names, &request.user_id, max_facts)
            .await;

        let mut seen_documents = HashSet::new();
        documents.retain(|doc| seen_documents.insert(doc.document_id.clone()));

        let mut seen_facts = HashSet::new();
        facts.retain(|fact| seen_facts.insert(fact.fact.clone()));
        facts.truncate(max_facts);

        let context = AnswerContext::new(documents, facts, facts_available);
        debug!(
            user_id = %request.user_id,
            documents = context.total_documents,
            facts = context.total_facts,
            facts_available = context.facts_available,
            "Answer context assembled"
        );
        Ok(context)
    }

    /// Semantic search when a query vector can be produced, lexical
    /// substring search otherwise.
    async fn find_documents(
        &self,
        request: &QueryRequest,
        limit: usize,
        floor: f32,
    ) -> Result<Vec<ContextDocument>> {
        if self.embeddings.is_available() {
            match self.embeddings.embed_query(&request.query).await {
                Ok(vector) => {
                    let scored = self
                        .db
                        .search_similar(&vector, &request.user_id, None, limit as u32, floor)
                        .await?;
                    return Ok(scored.into_iter().map(ContextDocument::from).collect());
                }
                Err(e) => {
                    warn!("Query embedding failed, falling back to lexical search: {}", e);
                }
            }
        }

        let documents = self
            .db
            .search_lexical(&request.query, &request.user_id, None, limit as u32)
            .await?;
        Ok(documents.into_iter().map(ContextDocument::unscored).collect())
    }

    /// Union of entities linked to the retrieved documents, in document
    /// rank order, capped to the configured fan-out.
    async fn candidate_entities(
        &self,
        documents: &[ContextDocument],
    ) -> Result<(Vec<String>, Vec<String>)> {
        let mut seen_ids = HashSet::new();
        let mut seen_names = HashSet::new();
        let mut ids = Vec::new();
        let mut names = Vec::new();

        'documents: for doc in documents {
            for link in self.db.get_entities_for_document(&doc.document_id).await? {
                if ids.len() >= self.config.max_entity_fanout {
                    break 'documents;
                }
                if seen_ids.insert(link.entity_id.clone()) {
                    if seen_names.insert(link.entity_name.clone()) {
                        names.push(link.entity_name);
                    }
                    ids.push(link.entity_id);
                }
            }
        }

        Ok((ids, names))
    }

    async fn expand_by_entities(
        &self,
        documents: &mut Vec<ContextDocument>,
        entity_ids: &[String],
        request: &QueryRequest,
        max_documents: usize,
    ) {
        let related = match self
            .db
            .get_documents_for_entities(entity_ids, max_documents as u32)
            .await
        {
            Ok(related) => related,
            Err(e) => {
                warn!("Entity document expansion failed: {}", e);
                return;
            }
        };

        let seen: HashSet<String> = documents
            .iter()
            .map(|doc| doc.document_id.clone())
            .collect();

        for doc in related {
            if documents.len() >= max_documents {
                break;
            }
            // Entity links are per-user in practice; the check keeps one
            // user's documents out of another's context regardless.
            if doc.user_id == request.user_id && !seen.contains(&doc.id) {
                documents.push(ContextDocument::unscored(doc));
            }
        }
    }

    /// Fact lookup under the configured deadline. Timeouts and gateway
    /// failures degrade to a documents-only context rather than erroring.
    async fn gather_facts(
        &self,
        entity_names: &[String],
        user_id: &str,
        max_facts: usize,
    ) -> (Vec<Fact>, bool) {
        if !self.extraction.is_available() {
            return (Vec::new(), false);
        }
        if entity_names.is_empty() {
            return (Vec::new(), true);
        }

        let group_id = sanitize_group_id(user_id);
        let deadline = Duration::from_secs(self.config.facts_timeout_secs);
        let lookup = self
            .extraction
            .facts_for(entity_names, &group_id, max_facts as u32);

        match tokio::time::timeout(deadline, lookup).await {
            Ok(Ok(facts)) => (facts, true),
            Ok(Err(e)) => {
                warn!("Fact lookup failed, returning documents-only context: {}", e);
                (Vec::new(), false)
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.config.facts_timeout_secs,
                    "Fact lookup timed out, returning documents-only context"
                );
                (Vec::new(), false)
            }
        }
    }
}
