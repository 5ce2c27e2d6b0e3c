use crate::db::DatabaseError;
use crate::models::Booking;
use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::Repository;

pub struct BookingRepository {
    pool: PgPool,
}

impl BookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_client(&self, client_id: Uuid) -> Result<Vec<Booking>, DatabaseError> {
        let records = sqlx::query_as::<_, Booking>(
            r#"
            SELECT id, client_id, service_id, status, starts_at, duration_minutes,
                   total_in_cents, notes, created_at
            FROM bookings
            WHERE client_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    pub async fn insert(conn: &mut PgConnection, booking: &Booking) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO bookings (id, client_id, service_id, status, starts_at, duration_minutes,
                                  total_in_cents, notes, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(booking.id)
        .bind(booking.client_id)
        .bind(booking.service_id)
        .bind(booking.status)
        .bind(booking.starts_at)
        .bind(booking.duration_minutes)
        .bind(booking.total_in_cents)
        .bind(&booking.notes)
        .bind(booking.created_at)
        .execute(conn)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl Repository for BookingRepository {
    type Entity = Booking;
    type Id = Uuid;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Booking>, DatabaseError> {
        let record = sqlx::query_as::<_, Booking>(
            r#"
            SELECT id, client_id, service_id, status, starts_at, duration_minutes,
                   total_in_cents, notes, created_at
            FROM bookings
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn get_all(&self) -> Result<Vec<Booking>, DatabaseError> {
        let records = sqlx::query_as::<_, Booking>(
            r#"
            SELECT id, client_id, service_id, status, starts_at, duration_minutes,
                   total_in_cents, notes, created_at
            FROM bookings
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}
