use crate::db::DatabaseError;
use crate::models::StudioService;
use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::Repository;

/// Read access to the studio's service catalog.
pub struct ServiceRepository {
    pool: PgPool,
}

impl ServiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_active(&self) -> Result<Vec<StudioService>, DatabaseError> {
        let records = sqlx::query_as::<_, StudioService>(
            r#"
            SELECT id, name, duration_minutes, price_in_cents, is_active
            FROM services
            WHERE is_active = TRUE
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    pub async fn fetch(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<StudioService>, sqlx::Error> {
        sqlx::query_as::<_, StudioService>(
            r#"
            SELECT id, name, duration_minutes, price_in_cents, is_active
            FROM services
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await
    }
}

#[async_trait]
impl Repository for ServiceRepository {
    type Entity = StudioService;
    type Id = Uuid;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<StudioService>, DatabaseError> {
        let record = sqlx::query_as::<_, StudioService>(
            r#"
            SELECT id, name, duration_minutes, price_in_cents, is_active
            FROM services
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn get_all(&self) -> Result<Vec<StudioService>, DatabaseError> {
        let records = sqlx::query_as::<_, StudioService>(
            r#"
            SELECT id, name, duration_minutes, price_in_cents, is_active
            FROM services
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}
