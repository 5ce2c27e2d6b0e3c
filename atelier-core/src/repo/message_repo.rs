use crate::db::DatabaseError;
use crate::models::{LatestMessage, Message};
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

pub struct MessageRepository {
    pool: PgPool,
}

impl MessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_by_thread(&self, thread_id: Uuid) -> Result<Vec<Message>, DatabaseError> {
        let records = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, seq, thread_id, sender_id, body, created_at, is_read, read_at
            FROM messages
            WHERE thread_id = $1
            ORDER BY created_at ASC, seq ASC
            "#,
        )
        .bind(thread_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    pub async fn latest_per_thread(
        &self,
        thread_ids: &[Uuid],
    ) -> Result<Vec<LatestMessage>, DatabaseError> {
        if thread_ids.is_empty() {
            return Ok(Vec::new());
        }

        let records = sqlx::query_as::<_, LatestMessage>(
            r#"
            SELECT DISTINCT ON (thread_id) thread_id, body, sender_id, created_at
            FROM messages
            WHERE thread_id = ANY($1)
            ORDER BY thread_id, created_at DESC, seq DESC
            "#,
        )
        .bind(thread_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    pub async fn unread_counts(
        &self,
        viewer_id: Uuid,
        thread_ids: &[Uuid],
    ) -> Result<Vec<(Uuid, i64)>, DatabaseError> {
        if thread_ids.is_empty() {
            return Ok(Vec::new());
        }

        let records: Vec<(Uuid, i64)> = sqlx::query_as(
            r#"
            SELECT thread_id, COUNT(*)
            FROM messages
            WHERE thread_id = ANY($1) AND is_read = FALSE AND sender_id <> $2
            GROUP BY thread_id
            "#,
        )
        .bind(thread_ids)
        .bind(viewer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    pub async fn insert(conn: &mut PgConnection, message: &Message) -> Result<Message, sqlx::Error> {
        sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (id, thread_id, sender_id, body, created_at, is_read, read_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, seq, thread_id, sender_id, body, created_at, is_read, read_at
            "#,
        )
        .bind(message.id)
        .bind(message.thread_id)
        .bind(message.sender_id)
        .bind(&message.body)
        .bind(message.created_at)
        .bind(message.is_read)
        .bind(message.read_at)
        .fetch_one(conn)
        .await
    }

    pub async fn mark_thread_read(
        conn: &mut PgConnection,
        thread_id: Uuid,
        viewer_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET is_read = TRUE, read_at = $3
            WHERE thread_id = $1 AND sender_id <> $2 AND is_read = FALSE
            "#,
        )
        .bind(thread_id)
        .bind(viewer_id)
        .bind(at)
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }
}
