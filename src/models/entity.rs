use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngramError, Result};

/// An entity as minted by the extraction engine. The id belongs to the
/// engine's graph store; we only cache name and type for display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntityRef {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub entity_type: String,
}

/// Bridge row between a stored document and a graph entity.
/// `(document_id, entity_id)` is unique in storage; re-linking merges by
/// taking the maximum of `mention_count` and `relevance_score`
/// independently, so a later low-confidence pass never erases an earlier
/// high-confidence one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentEntityLink {
    pub id: String,
    pub document_id: String,
    pub entity_id: String,
    pub entity_type: String,
    pub entity_name: String,
    pub mention_count: u32,
    pub relevance_score: f32,
    pub created_at: DateTime<Utc>,
}

impl DocumentEntityLink {
    /// Builds a link, rejecting out-of-range values at the boundary.
    pub fn new(
        id: String,
        document_id: String,
        entity: &EntityRef,
        mention_count: u32,
        relevance_score: f32,
    ) -> Result<Self> {
        if mention_count < 1 {
            return Err(EngramError::Validation(
                "mention_count must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&relevance_score) {
            return Err(EngramError::Validation(format!(
                "relevance_score must be within [0, 1], got {relevance_score}"
            )));
        }

        Ok(Self {
            id,
            document_id,
            entity_id: entity.id.clone(),
            entity_type: entity.entity_type.clone(),
            entity_name: entity.name.clone(),
            mention_count,
            relevance_score,
            created_at: Utc::now(),
        })
    }
}

/// Wire shape for an entity attached to a document response.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct LinkedEntity {
    pub entity_id: String,
    pub entity_name: String,
    pub entity_type: String,
    pub mention_count: u32,
    pub relevance_score: f32,
}

impl From<DocumentEntityLink> for LinkedEntity {
    fn from(link: DocumentEntityLink) -> Self {
        Self {
            entity_id: link.entity_id,
            entity_name: link.entity_name,
            entity_type: link.entity_type,
            mention_count: link.mention_count,
            relevance_score: link.relevance_score,
        }
    }
}
