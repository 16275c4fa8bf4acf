use chrono::{DateTime, Utc};
use libsql::{params, Connection};

use crate::error::Result;
use crate::models::{Document, DocumentEntityLink};

use super::documents::DocumentRepository;

pub struct EntityLinkRepository;

impl EntityLinkRepository {
    /// Upserts a document-entity link. Re-linking an existing
    /// `(document_id, entity_id)` pair keeps the maximum of `mention_count`
    /// and `relevance_score` independently, so a later low-confidence
    /// extraction can never erase an earlier high-confidence one.
    pub async fn upsert(conn: &Connection, link: &DocumentEntityLink) -> Result<()> {
        conn.execute(
            r#"
            INSERT INTO document_entities (
                id, document_id, entity_id, entity_type, entity_name,
                mention_count, relevance_score, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(document_id, entity_id) DO UPDATE SET
                mention_count = MAX(mention_count, excluded.mention_count),
                relevance_score = MAX(relevance_score, excluded.relevance_score)
            "#,
            params![
                link.id.clone(),
                link.document_id.clone(),
                link.entity_id.clone(),
                link.entity_type.clone(),
                link.entity_name.clone(),
                link.mention_count as i64,
                link.relevance_score as f64,
                link.created_at.to_rfc3339(),
            ],
        )
        .await?;

        Ok(())
    }

    pub async fn get_by_document(
        conn: &Connection,
        document_id: &str,
    ) -> Result<Vec<DocumentEntityLink>> {
        let mut rows = conn
            .query(
                r#"
                SELECT * FROM document_entities
                WHERE document_id = ?1
                ORDER BY relevance_score DESC, entity_name ASC
                "#,
                params![document_id],
            )
            .await?;

        let mut links = Vec::new();
        while let Some(row) = rows.next().await? {
            links.push(Self::row_to_link(&row)?);
        }

        Ok(links)
    }

    /// Inverse lookup used by the hybrid retriever: documents linked to any
    /// of the given entities, one row per document, best link relevance
    /// first, more recent documents breaking ties.
    pub async fn documents_for_entities(
        conn: &Connection,
        entity_ids: &[String],
        limit: u32,
    ) -> Result<Vec<Document>> {
        if entity_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut placeholders = String::new();
        for i in 0..entity_ids.len() {
            if i > 0 {
                placeholders.push_str(", ");
            }
            placeholders.push('?');
            placeholders.push_str(&(i + 1).to_string());
        }

        let limit_idx = entity_ids.len() + 1;
        let sql = format!(
            r#"
            SELECT d.*, MAX(de.relevance_score) AS best_relevance
            FROM documents d
            JOIN document_entities de ON de.document_id = d.id
            WHERE de.entity_id IN ({placeholders})
            GROUP BY d.id
            ORDER BY best_relevance DESC, d.source_created_at DESC
            LIMIT ?{limit_idx}
            "#
        );

        let mut param_values: Vec<libsql::Value> = entity_ids
            .iter()
            .map(|id| libsql::Value::from(id.clone()))
            .collect();
        param_values.push(libsql::Value::from(limit));

        let mut rows = conn
            .query(&sql, libsql::params_from_iter(param_values))
            .await?;

        let mut documents = Vec::new();
        while let Some(row) = rows.next().await? {
            documents.push(DocumentRepository::row_to_document(&row)?);
        }

        Ok(documents)
    }

    fn row_to_link(row: &libsql::Row) -> Result<DocumentEntityLink> {
        Ok(DocumentEntityLink {
            id: row.get(0)?,
            document_id: row.get(1)?,
            entity_id: row.get(2)?,
            entity_type: row.get(3)?,
            entity_name: row.get(4)?,
            mention_count: row.get::<i64>(5)? as u32,
            relevance_score: row.get::<f64>(6)? as f32,
            created_at: DateTime::parse_from_rfc3339(&row.get::<String>(7)?)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}
