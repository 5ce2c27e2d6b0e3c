use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::db::Database;
use crate::error::{AtelierError, AtelierResult};
use crate::models::{
    Booking, LatestMessage, Message, Participant, StudioService, Thread, ThreadFlags, ThreadStatus,
};

use super::{
    BookingRepository, InboxStore, MessageRepository, ParticipantRepository, Repository,
    ServiceRepository, StoreTx, ThreadRepository,
};

/// PostgreSQL-backed conversation store.
pub struct PgInboxStore {
    pool: PgPool,
    threads: ThreadRepository,
    messages: MessageRepository,
    participants: ParticipantRepository,
    services: ServiceRepository,
}

impl PgInboxStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            threads: ThreadRepository::new(pool.clone()),
            messages: MessageRepository::new(pool.clone()),
            participants: ParticipantRepository::new(pool.clone()),
            services: ServiceRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn from_database(db: &Database) -> Self {
        Self::new(db.pool().clone())
    }

    pub fn bookings(&self) -> BookingRepository {
        BookingRepository::new(self.pool.clone())
    }

    pub fn services(&self) -> &ServiceRepository {
        &self.services
    }
}

#[async_trait]
impl InboxStore for PgInboxStore {
    async fn begin(&self) -> AtelierResult<Box<dyn StoreTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgStoreTx { tx: Some(tx) }))
    }

    async fn get_thread(&self, id: Uuid) -> AtelierResult<Option<Thread>> {
        Ok(self.threads.get_by_id(id).await?)
    }

    async fn list_threads(&self) -> AtelierResult<Vec<Thread>> {
        Ok(self.threads.get_all().await?)
    }

    async fn list_threads_visible_to(&self, identity_id: Uuid) -> AtelierResult<Vec<Thread>> {
        Ok(self.threads.list_visible_to(identity_id).await?)
    }

    async fn list_participants(&self, thread_id: Uuid) -> AtelierResult<Vec<Participant>> {
        Ok(self.participants.list_for_thread(thread_id).await?)
    }

    async fn is_participant(&self, thread_id: Uuid, identity_id: Uuid) -> AtelierResult<bool> {
        Ok(self.participants.exists(thread_id, identity_id).await?)
    }

    async fn list_messages(&self, thread_id: Uuid) -> AtelierResult<Vec<Message>> {
        Ok(self.messages.list_by_thread(thread_id).await?)
    }

    async fn latest_messages(&self, thread_ids: &[Uuid]) -> AtelierResult<Vec<LatestMessage>> {
        Ok(self.messages.latest_per_thread(thread_ids).await?)
    }

    async fn unread_counts(
        &self,
        viewer_id: Uuid,
        thread_ids: &[Uuid],
    ) -> AtelierResult<Vec<(Uuid, i64)>> {
        Ok(self.messages.unread_counts(viewer_id, thread_ids).await?)
    }

    async fn get_service(&self, id: Uuid) -> AtelierResult<Option<StudioService>> {
        Ok(self.services.get_by_id(id).await?)
    }
}

/// Wraps a `sqlx` transaction, which rolls back when dropped uncommitted.
pub struct PgStoreTx {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgStoreTx {
    fn conn(&mut self) -> AtelierResult<&mut PgConnection> {
        match self.tx.as_mut() {
            Some(tx) => Ok(&mut **tx),
            None => Err(AtelierError::DatabaseTransactionFailed(
                "transaction already committed".to_string(),
            )),
        }
    }
}

fn expect_one(rows: u64, thread_id: Uuid) -> AtelierResult<()> {
    if rows == 0 {
        return Err(AtelierError::ThreadNotFound(thread_id));
    }
    Ok(())
}

#[async_trait]
impl StoreTx for PgStoreTx {
    async fn lock_thread(&mut self, id: Uuid) -> AtelierResult<Option<Thread>> {
        Ok(ThreadRepository::lock(self.conn()?, id).await?)
    }

    async fn get_service(&mut self, id: Uuid) -> AtelierResult<Option<StudioService>> {
        Ok(ServiceRepository::fetch(self.conn()?, id).await?)
    }

    async fn insert_booking(&mut self, booking: &Booking) -> AtelierResult<()> {
        Ok(BookingRepository::insert(self.conn()?, booking).await?)
    }

    async fn insert_thread(&mut self, thread: &Thread) -> AtelierResult<()> {
        Ok(ThreadRepository::insert(self.conn()?, thread).await?)
    }

    async fn insert_participant(&mut self, participant: &Participant) -> AtelierResult<()> {
        Ok(ParticipantRepository::insert(self.conn()?, participant).await?)
    }

    async fn insert_message(&mut self, message: &Message) -> AtelierResult<Message> {
        Ok(MessageRepository::insert(self.conn()?, message).await?)
    }

    async fn set_last_message_at(
        &mut self,
        thread_id: Uuid,
        at: DateTime<Utc>,
    ) -> AtelierResult<()> {
        let rows = ThreadRepository::update_last_message_at(self.conn()?, thread_id, at).await?;
        expect_one(rows, thread_id)
    }

    async fn set_status(&mut self, thread_id: Uuid, status: ThreadStatus) -> AtelierResult<()> {
        let rows = ThreadRepository::update_status(self.conn()?, thread_id, status).await?;
        expect_one(rows, thread_id)
    }

    async fn set_flags(&mut self, thread_id: Uuid, flags: ThreadFlags) -> AtelierResult<()> {
        let rows = ThreadRepository::update_flags(self.conn()?, thread_id, flags).await?;
        expect_one(rows, thread_id)
    }

    async fn mark_read(
        &mut self,
        thread_id: Uuid,
        viewer_id: Uuid,
        at: DateTime<Utc>,
    ) -> AtelierResult<u64> {
        Ok(MessageRepository::mark_thread_read(self.conn()?, thread_id, viewer_id, at).await?)
    }

    async fn commit(&mut self) -> AtelierResult<()> {
        let tx = self.tx.take().ok_or_else(|| {
            AtelierError::DatabaseTransactionFailed("transaction already committed".to_string())
        })?;
        tx.commit()
            .await
            .map_err(|e| AtelierError::DatabaseTransactionFailed(e.to_string()))?;
        debug!("Transaction committed");
        Ok(())
    }
}
