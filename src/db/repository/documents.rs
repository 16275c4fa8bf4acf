use chrono::{DateTime, Utc};
use libsql::{params, Connection};

use crate::error::{EngramError, Result};
use crate::models::{
    DocType, Document, DocumentSummary, EventSource, ListDocumentsQuery, Pagination,
    ScoredDocument,
};

/// Escape `%`, `_`, and the escape character itself so a user-supplied
/// search term is matched literally inside a LIKE pattern.
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

pub struct DocumentRepository;

impl DocumentRepository {
    /// Inserts a document. The `(source, source_id, user_id)` unique index is
    /// the second line of defense behind the ledger claim; a collision here
    /// surfaces as `DuplicateDocument` so callers can treat it as an
    /// idempotent no-op.
    pub async fn create(conn: &Connection, doc: &Document) -> Result<()> {
        let result = match &doc.embedding {
            Some(embedding) => {
                let embedding_json = serde_json::to_string(embedding)?;
                conn.execute(
                    r#"
                    INSERT INTO documents (
                        id, user_id, source, source_id, doc_type, title, content,
                        content_preview, metadata, source_created_at, created_at,
                        updated_at, embedding
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, vector32(?13))
                    "#,
                    params![
                        doc.id.clone(),
                        doc.user_id.clone(),
                        doc.source.to_string(),
                        doc.source_id.clone(),
                        doc.doc_type.to_string(),
                        doc.title.clone(),
                        doc.content.clone(),
                        doc.content_preview.clone(),
                        serde_json::to_string(&doc.metadata)?,
                        doc.source_created_at.map(|dt| dt.to_rfc3339()),
                        doc.created_at.to_rfc3339(),
                        doc.updated_at.to_rfc3339(),
                        embedding_json,
                    ],
                )
                .await
            }
            None => {
                conn.execute(
                    r#"
                    INSERT INTO documents (
                        id, user_id, source, source_id, doc_type, title, content,
                        content_preview, metadata, source_created_at, created_at,
                        updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                    "#,
                    params![
                        doc.id.clone(),
                        doc.user_id.clone(),
                        doc.source.to_string(),
                        doc.source_id.clone(),
                        doc.doc_type.to_string(),
                        doc.title.clone(),
                        doc.content.clone(),
                        doc.content_preview.clone(),
                        serde_json::to_string(&doc.metadata)?,
                        doc.source_created_at.map(|dt| dt.to_rfc3339()),
                        doc.created_at.to_rfc3339(),
                        doc.updated_at.to_rfc3339(),
                    ],
                )
                .await
            }
        };

        match result {
            Ok(_) => Ok(()),
            Err(e) if e.to_string().contains("UNIQUE constraint failed") => {
                Err(EngramError::DuplicateDocument(format!(
                    "{}/{} already stored for user {}",
                    doc.source, doc.source_id, doc.user_id
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_by_id(conn: &Connection, id: &str) -> Result<Option<Document>> {
        let mut rows = conn
            .query("SELECT * FROM documents WHERE id = ?1", params![id])
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_document(&row)?))
        } else {
            Ok(None)
        }
    }

    pub async fn get_by_identity(
        conn: &Connection,
        user_id: &str,
        source: &str,
        source_id: &str,
    ) -> Result<Option<Document>> {
        let mut rows = conn
            .query(
                "SELECT * FROM documents WHERE user_id = ?1 AND source = ?2 AND source_id = ?3",
                params![user_id, source, source_id],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_document(&row)?))
        } else {
            Ok(None)
        }
    }

    /// Backfills the embedding on an existing row. Returns `false` when the
    /// document has been deleted in the meantime.
    pub async fn update_embedding(
        conn: &Connection,
        document_id: &str,
        embedding: &[f32],
    ) -> Result<bool> {
        let embedding_json = serde_json::to_string(embedding)?;

        let affected = conn
            .execute(
                "UPDATE documents SET embedding = vector32(?2), updated_at = ?3 WHERE id = ?1",
                params![document_id, embedding_json, Utc::now().to_rfc3339()],
            )
            .await?;

        Ok(affected == 1)
    }

    pub async fn get_missing_embeddings(conn: &Connection, limit: u32) -> Result<Vec<Document>> {
        let mut rows = conn
            .query(
                "SELECT * FROM documents WHERE embedding IS NULL ORDER BY created_at ASC LIMIT ?1",
                params![limit],
            )
            .await?;

        let mut documents = Vec::new();
        while let Some(row) = rows.next().await? {
            documents.push(Self::row_to_document(&row)?);
        }

        Ok(documents)
    }

    /// Cosine similarity search scoped to one user. Rows without an embedding
    /// never match; ties on score fall back to the more recent
    /// `source_created_at` (nulls last).
    pub async fn search_similar(
        conn: &Connection,
        embedding: &[f32],
        user_id: &str,
        source: Option<&str>,
        limit: u32,
        threshold: f32,
    ) -> Result<Vec<ScoredDocument>> {
        let embedding_json = serde_json::to_string(embedding)?;

        // Fixed params: ?1=embedding, ?2=user_id, ?3=threshold, ?4=limit
        let source_clause = if source.is_some() {
            "AND source = ?5"
        } else {
            ""
        };
        let query = format!(
            r#"
            SELECT *,
                1 - vector_distance_cos(embedding, vector32(?1)) AS score
            FROM documents
            WHERE user_id = ?2
              AND embedding IS NOT NULL
              AND (1 - vector_distance_cos(embedding, vector32(?1))) >= ?3
              {source_clause}
            ORDER BY score DESC, source_created_at DESC
            LIMIT ?4
            "#
        );

        let mut param_values: Vec<libsql::Value> = vec![
            libsql::Value::from(embedding_json),
            libsql::Value::from(user_id.to_string()),
            libsql::Value::from(threshold as f64),
            libsql::Value::from(limit),
        ];
        if let Some(source) = source {
            param_values.push(libsql::Value::from(source.to_string()));
        }

        let mut rows = conn
            .query(&query, libsql::params_from_iter(param_values))
            .await?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            let similarity = row.get::<f64>(13)? as f32;
            results.push(ScoredDocument {
                document: Self::row_to_document(&row)?,
                similarity,
            });
        }

        Ok(results)
    }

    /// Substring fallback over content and title when no query embedding is
    /// available. The term is escaped so LIKE wildcards in user input match
    /// literally.
    pub async fn search_lexical(
        conn: &Connection,
        term: &str,
        user_id: &str,
        source: Option<&str>,
        limit: u32,
    ) -> Result<Vec<Document>> {
        let pattern = format!("%{}%", escape_like(term));

        // Fixed params: ?1=user_id, ?2=pattern, ?3=limit
        let source_clause = if source.is_some() {
            "AND source = ?4"
        } else {
            ""
        };
        let query = format!(
            r#"
            SELECT * FROM documents
            WHERE user_id = ?1
              AND (content LIKE ?2 ESCAPE '\' OR title LIKE ?2 ESCAPE '\')
              {source_clause}
            ORDER BY COALESCE(source_created_at, created_at) DESC
            LIMIT ?3
            "#
        );

        let mut param_values: Vec<libsql::Value> = vec![
            libsql::Value::from(user_id.to_string()),
            libsql::Value::from(pattern),
            libsql::Value::from(limit),
        ];
        if let Some(source) = source {
            param_values.push(libsql::Value::from(source.to_string()));
        }

        let mut rows = conn
            .query(&query, libsql::params_from_iter(param_values))
            .await?;

        let mut documents = Vec::new();
        while let Some(row) = rows.next().await? {
            documents.push(Self::row_to_document(&row)?);
        }

        Ok(documents)
    }

    pub async fn list(
        conn: &Connection,
        req: &ListDocumentsQuery,
    ) -> Result<(Vec<DocumentSummary>, Pagination)> {
        let limit = req.limit.unwrap_or(20).clamp(1, 100);
        let page = req.page.unwrap_or(1).max(1);
        let offset = (page - 1) * limit;

        let mut where_clauses = vec!["user_id = ?1".to_string()];
        let mut filter_params: Vec<libsql::Value> =
            vec![libsql::Value::from(req.user_id.clone())];

        if let Some(ref source) = req.source {
            where_clauses.push(format!("source = ?{}", filter_params.len() + 1));
            filter_params.push(libsql::Value::from(source.clone()));
        }

        let where_clause = format!("WHERE {}", where_clauses.join(" AND "));

        let count_query = format!("SELECT COUNT(*) FROM documents {where_clause}");
        let mut count_rows = conn
            .query(&count_query, libsql::params_from_iter(filter_params.clone()))
            .await?;
        let total: i64 = if let Some(row) = count_rows.next().await? {
            row.get(0)?
        } else {
            0
        };

        // LIMIT and OFFSET params come after the filter params
        let limit_idx = filter_params.len() + 1;
        let offset_idx = filter_params.len() + 2;
        let query = format!(
            "SELECT * FROM documents {where_clause} ORDER BY created_at DESC LIMIT ?{limit_idx} OFFSET ?{offset_idx}"
        );

        let mut list_params = filter_params;
        list_params.push(libsql::Value::from(limit as i64));
        list_params.push(libsql::Value::from(offset as i64));

        let mut rows = conn
            .query(&query, libsql::params_from_iter(list_params))
            .await?;

        let mut documents = Vec::new();
        while let Some(row) = rows.next().await? {
            let doc = Self::row_to_document(&row)?;
            documents.push(DocumentSummary::from(doc));
        }

        let pagination = Pagination::new(page, limit, total as u32);

        Ok((documents, pagination))
    }

    pub(crate) fn row_to_document(row: &libsql::Row) -> Result<Document> {
        let embedding = row.get::<Option<Vec<u8>>>(12)?.map(|blob| {
            blob.chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect()
        });

        Ok(Document {
            id: row.get(0)?,
            user_id: row.get(1)?,
            source: EventSource::from(row.get::<String>(2)?),
            source_id: row.get(3)?,
            doc_type: row.get::<String>(4)?.parse().unwrap_or(DocType::Unknown),
            title: row.get(5)?,
            content: row.get(6)?,
            content_preview: row.get(7)?,
            metadata: serde_json::from_str(&row.get::<String>(8)?).unwrap_or_default(),
            source_created_at: row
                .get::<Option<String>>(9)?
                .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                .map(|dt| dt.with_timezone(&Utc)),
            created_at: DateTime::parse_from_rfc3339(&row.get::<String>(10)?)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
            updated_at: DateTime::parse_from_rfc3339(&row.get::<String>(11)?)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
            embedding,
        })
    }
}
