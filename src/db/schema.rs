use libsql::Connection;

use crate::error::Result;

/// Creates all tables and indexes. Idempotent; safe to run on every
/// startup. `embedding_dimensions` fixes the width of the document
/// embedding column, so changing `EMBEDDING_DIMENSIONS` against an
/// existing database requires a manual rebuild.
pub async fn init_schema(conn: &Connection, embedding_dimensions: usize) -> Result<()> {
    let ddl = format!(
        r#"
        -- Idempotency ledger: one row per handled (user_id, source, source_id).
        -- The composite primary key is the atomic claim primitive; concurrent
        -- deliveries of the same event race on this insert and exactly one wins.
        CREATE TABLE IF NOT EXISTS processed_events (
            user_id TEXT NOT NULL,
            source TEXT NOT NULL,
            source_id TEXT NOT NULL,
            episode_id TEXT,
            processed_at TEXT NOT NULL,
            PRIMARY KEY (user_id, source, source_id)
        );

        CREATE INDEX IF NOT EXISTS idx_processed_events_user ON processed_events(user_id);

        -- Documents table with vector embedding
        CREATE TABLE IF NOT EXISTS documents (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            source TEXT NOT NULL,
            source_id TEXT NOT NULL,
            doc_type TEXT NOT NULL DEFAULT 'email',
            title TEXT,
            content TEXT NOT NULL,
            content_preview TEXT NOT NULL,
            metadata TEXT DEFAULT '{{}}',
            source_created_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            embedding F32_BLOB({embedding_dimensions})
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_documents_identity
            ON documents(source, source_id, user_id);
        CREATE INDEX IF NOT EXISTS idx_documents_user_id ON documents(user_id);
        CREATE INDEX IF NOT EXISTS idx_documents_created_at ON documents(created_at);
        -- Backfill scan: partial index keeps it cheap once most rows are embedded
        CREATE INDEX IF NOT EXISTS idx_documents_missing_embedding
            ON documents(created_at) WHERE embedding IS NULL;

        -- Bridge table between documents and externally-owned graph entities
        CREATE TABLE IF NOT EXISTS document_entities (
            id TEXT PRIMARY KEY,
            document_id TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            entity_type TEXT NOT NULL DEFAULT '',
            entity_name TEXT NOT NULL,
            mention_count INTEGER NOT NULL DEFAULT 1,
            relevance_score REAL NOT NULL DEFAULT 1.0,
            created_at TEXT NOT NULL,
            FOREIGN KEY (document_id) REFERENCES documents(id) ON DELETE CASCADE
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_document_entities_pair
            ON document_entities(document_id, entity_id);
        CREATE INDEX IF NOT EXISTS idx_document_entities_entity_id
            ON document_entities(entity_id);
        "#
    );

    conn.execute_batch(&ddl).await?;

    create_vector_index(conn).await?;

    Ok(())
}

/// ANN index over document embeddings. Purely an accelerator: search
/// correctness never depends on it, so creation failures (e.g. a libsql
/// build without vector index support) are logged and ignored.
async fn create_vector_index(conn: &Connection) -> Result<()> {
    let index_exists: bool = conn
        .query(
            "SELECT 1 FROM sqlite_master WHERE type='index' AND name='documents_embedding_idx'",
            (),
        )
        .await?
        .next()
        .await?
        .is_some();

    if !index_exists {
        if let Err(e) = conn
            .execute(
                "CREATE INDEX IF NOT EXISTS documents_embedding_idx ON documents(libsql_vector_idx(embedding))",
                (),
            )
            .await
        {
            tracing::warn!("Vector index creation failed for documents (may already exist): {e}");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use libsql::Builder;

    #[tokio::test]
    async fn test_init_schema_is_idempotent() {
        let db = Builder::new_local(":memory:").build().await.unwrap();
        let conn = db.connect().unwrap();

        init_schema(&conn, 4).await.unwrap();
        init_schema(&conn, 4).await.unwrap();

        let mut rows = conn
            .query(
                "SELECT name FROM sqlite_master WHERE type='table' ORDER BY name",
                (),
            )
            .await
            .unwrap();

        let mut tables = Vec::new();
        while let Some(row) = rows.next().await.unwrap() {
            tables.push(row.get::<String>(0).unwrap());
        }

        assert!(tables.contains(&"processed_events".to_string()));
        assert!(tables.contains(&"documents".to_string()));
        assert!(tables.contains(&"document_entities".to_string()));
    }

    #[tokio::test]
    async fn test_document_identity_unique_index_enforced() {
        let db = Builder::new_local(":memory:").build().await.unwrap();
        let conn = db.connect().unwrap();
        init_schema(&conn, 4).await.unwrap();

        conn.execute(
            "INSERT INTO documents (id, user_id, source, source_id, content, content_preview, created_at, updated_at)
             VALUES ('d1', 'u1', 'gmail', 'm1', 'x', 'x', '2025-01-01T00:00:00Z', '2025-01-01T00:00:00Z')",
            (),
        )
        .await
        .unwrap();

        let dup = conn
            .execute(
                "INSERT INTO documents (id, user_id, source, source_id, content, content_preview, created_at, updated_at)
                 VALUES ('d2', 'u1', 'gmail', 'm1', 'y', 'y', '2025-01-01T00:00:00Z', '2025-01-01T00:00:00Z')",
                (),
            )
            .await;

        assert!(dup.is_err());
    }

    #[tokio::test]
    async fn test_ledger_triple_is_primary_key() {
        let db = Builder::new_local(":memory:").build().await.unwrap();
        let conn = db.connect().unwrap();
        init_schema(&conn, 4).await.unwrap();

        conn.execute(
            "INSERT INTO processed_events (user_id, source, source_id, processed_at)
             VALUES ('u1', 'gmail', 'm1', '2025-01-01T00:00:00Z')",
            (),
        )
        .await
        .unwrap();

        // Same triple conflicts; OR IGNORE turns that into zero rows written.
        let affected = conn
            .execute(
                "INSERT OR IGNORE INTO processed_events (user_id, source, source_id, processed_at)
                 VALUES ('u1', 'gmail', 'm1', '2025-01-02T00:00:00Z')",
                (),
            )
            .await
            .unwrap();

        assert_eq!(affected, 0);
    }
}
