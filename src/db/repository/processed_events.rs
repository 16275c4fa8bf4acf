use libsql::{params, Connection};

use crate::error::Result;
use crate::models::ProcessedEvent;

pub struct ProcessedEventRepository;

impl ProcessedEventRepository {
    pub async fn exists(
        conn: &Connection,
        user_id: &str,
        source: &str,
        source_id: &str,
    ) -> Result<bool> {
        let mut rows = conn
            .query(
                "SELECT 1 FROM processed_events WHERE user_id = ?1 AND source = ?2 AND source_id = ?3",
                params![user_id, source, source_id],
            )
            .await?;

        Ok(rows.next().await?.is_some())
    }

    /// Atomic claim of the `(user_id, source, source_id)` triple. The insert
    /// itself is the race arbiter: under concurrent deliveries of the same
    /// event exactly one caller sees `rows_affected == 1`, every other caller
    /// gets a conflict swallowed by OR IGNORE and must treat the event as
    /// already handled.
    pub async fn claim(conn: &Connection, record: &ProcessedEvent) -> Result<bool> {
        let affected = conn
            .execute(
                r#"
                INSERT OR IGNORE INTO processed_events (
                    user_id, source, source_id, episode_id, processed_at
                ) VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    record.user_id.clone(),
                    record.source.to_string(),
                    record.source_id.clone(),
                    record.episode_id.clone(),
                    record.processed_at.to_rfc3339(),
                ],
            )
            .await?;

        Ok(affected == 1)
    }

    pub async fn attach_episode(
        conn: &Connection,
        user_id: &str,
        source: &str,
        source_id: &str,
        episode_id: &str,
    ) -> Result<()> {
        conn.execute(
            r#"
            UPDATE processed_events SET episode_id = ?4
            WHERE user_id = ?1 AND source = ?2 AND source_id = ?3
            "#,
            params![user_id, source, source_id, episode_id],
        )
        .await?;

        Ok(())
    }
}
