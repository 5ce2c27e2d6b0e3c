use crate::db::DatabaseError;
use crate::models::Participant;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

pub struct ParticipantRepository {
    pool: PgPool,
}

impl ParticipantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_for_thread(&self, thread_id: Uuid) -> Result<Vec<Participant>, DatabaseError> {
        let records = sqlx::query_as::<_, Participant>(
            r#"
            SELECT thread_id, identity_id, role, added_at
            FROM thread_participants
            WHERE thread_id = $1
            ORDER BY added_at ASC, identity_id
            "#,
        )
        .bind(thread_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    pub async fn exists(&self, thread_id: Uuid, identity_id: Uuid) -> Result<bool, DatabaseError> {
        let found: (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM thread_participants
                WHERE thread_id = $1 AND identity_id = $2
            )
            "#,
        )
        .bind(thread_id)
        .bind(identity_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(found.0)
    }

    pub async fn insert(
        conn: &mut PgConnection,
        participant: &Participant,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO thread_participants (thread_id, identity_id, role, added_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (thread_id, identity_id) DO NOTHING
            "#,
        )
        .bind(participant.thread_id)
        .bind(participant.identity_id)
        .bind(participant.role)
        .bind(participant.added_at)
        .execute(conn)
        .await?;

        Ok(())
    }
}
