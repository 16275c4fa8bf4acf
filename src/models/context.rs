use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{DocType, EventSource, ScoredDocument};

/// A natural-language relationship statement from the extraction
/// engine's graph, e.g. "Acme Corp requested enterprise pricing".
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Fact {
    pub fact: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_entity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_entity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_at: Option<DateTime<Utc>>,
}

/// One document in an answer context, carrying everything a downstream
/// prompt builder needs for a citation.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ContextDocument {
    pub document_id: String,
    #[schema(value_type = String)]
    pub source: EventSource,
    #[serde(rename = "type")]
    pub doc_type: DocType,
    pub title: Option<String>,
    pub content: String,
    /// Cosine similarity to the query; absent for lexical-fallback hits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,
    pub source_created_at: Option<DateTime<Utc>>,
}

impl ContextDocument {
    /// A context document with no similarity attached, for lexical and
    /// entity-derived hits.
    pub fn unscored(doc: super::Document) -> Self {
        Self {
            document_id: doc.id,
            source: doc.source,
            doc_type: doc.doc_type,
            title: doc.title,
            content: doc.content,
            similarity: None,
            source_created_at: doc.source_created_at,
        }
    }
}

impl From<ScoredDocument> for ContextDocument {
    fn from(scored: ScoredDocument) -> Self {
        let doc = scored.document;
        Self {
            document_id: doc.id,
            source: doc.source,
            doc_type: doc.doc_type,
            title: doc.title,
            content: doc.content,
            similarity: Some(scored.similarity),
            source_created_at: doc.source_created_at,
        }
    }
}

/// The fused retrieval result: documents and facts stay separate lists
/// with no interleaved scoring; consumers get both plus their counts.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AnswerContext {
    pub documents: Vec<ContextDocument>,
    pub facts: Vec<Fact>,
    /// False when the gateway fact lookup timed out or failed and the
    /// context degraded to documents-only.
    pub facts_available: bool,
    /// False only when both halves came back empty.
    pub context_found: bool,
    pub total_documents: usize,
    pub total_facts: usize,
}

impl AnswerContext {
    pub fn new(documents: Vec<ContextDocument>, facts: Vec<Fact>, facts_available: bool) -> Self {
        let context_found = !documents.is_empty() || !facts.is_empty();
        Self {
            total_documents: documents.len(),
            total_facts: facts.len(),
            documents,
            facts,
            facts_available,
            context_found,
        }
    }

    /// The explicit "no context found" result.
    pub fn empty(facts_available: bool) -> Self {
        Self::new(Vec::new(), Vec::new(), facts_available)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, utoipa::ToSchema)]
pub struct QueryRequest {
    #[validate(length(min = 1, max = 2000))]
    pub query: String,
    #[validate(length(min = 1, max = 128))]
    pub user_id: String,
    #[validate(range(min = 1, max = 50))]
    pub max_documents: Option<u32>,
    #[validate(range(min = 1, max = 50))]
    pub max_facts: Option<u32>,
    /// Overrides the configured similarity floor for this query.
    #[validate(range(min = 0.0, max = 1.0))]
    pub min_similarity: Option<f32>,
}
