use crate::db::DatabaseError;
use crate::models::{Thread, ThreadFlags, ThreadStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::Repository;

pub struct ThreadRepository {
    pool: PgPool,
}

impl ThreadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_visible_to(&self, identity_id: Uuid) -> Result<Vec<Thread>, DatabaseError> {
        let records = sqlx::query_as::<_, Thread>(
            r#"
            SELECT t.id, t.subject, t.thread_type, t.status, t.is_starred, t.is_archived,
                   t.is_closed, t.is_group, t.owner_client_id, t.booking_id,
                   t.last_message_at, t.created_at
            FROM message_threads t
            WHERE t.owner_client_id = $1
               OR EXISTS (
                   SELECT 1 FROM thread_participants p
                   WHERE p.thread_id = t.id AND p.identity_id = $1
               )
            ORDER BY t.last_message_at DESC, t.created_at DESC, t.id
            "#,
        )
        .bind(identity_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    pub async fn insert(conn: &mut PgConnection, thread: &Thread) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO message_threads (id, subject, thread_type, status, is_starred, is_archived,
                                         is_closed, is_group, owner_client_id, booking_id,
                                         last_message_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(thread.id)
        .bind(&thread.subject)
        .bind(thread.thread_type)
        .bind(thread.status)
        .bind(thread.is_starred)
        .bind(thread.is_archived)
        .bind(thread.is_closed)
        .bind(thread.is_group)
        .bind(thread.owner_client_id)
        .bind(thread.booking_id)
        .bind(thread.last_message_at)
        .bind(thread.created_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    pub async fn lock(conn: &mut PgConnection, id: Uuid) -> Result<Option<Thread>, sqlx::Error> {
        sqlx::query_as::<_, Thread>(
            r#"
            SELECT id, subject, thread_type, status, is_starred, is_archived, is_closed,
                   is_group, owner_client_id, booking_id, last_message_at, created_at
            FROM message_threads
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await
    }

    pub async fn update_last_message_at(
        conn: &mut PgConnection,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE message_threads SET last_message_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(conn)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn update_status(
        conn: &mut PgConnection,
        id: Uuid,
        status: ThreadStatus,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE message_threads SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(conn)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn update_flags(
        conn: &mut PgConnection,
        id: Uuid,
        flags: ThreadFlags,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE message_threads
            SET is_starred = COALESCE($2, is_starred),
                is_archived = COALESCE($3, is_archived),
                is_closed = COALESCE($4, is_closed)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(flags.is_starred)
        .bind(flags.is_archived)
        .bind(flags.is_closed)
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl Repository for ThreadRepository {
    type Entity = Thread;
    type Id = Uuid;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Thread>, DatabaseError> {
        let record = sqlx::query_as::<_, Thread>(
            r#"
            SELECT id, subject, thread_type, status, is_starred, is_archived, is_closed,
                   is_group, owner_client_id, booking_id, last_message_at, created_at
            FROM message_threads
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn get_all(&self) -> Result<Vec<Thread>, DatabaseError> {
        let records = sqlx::query_as::<_, Thread>(
            r#"
            SELECT id, subject, thread_type, status, is_starred, is_archived, is_closed,
                   is_group, owner_client_id, booking_id, last_message_at, created_at
            FROM message_threads
            ORDER BY last_message_at DESC, created_at DESC, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}
