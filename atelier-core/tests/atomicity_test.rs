use std::sync::Arc;

use async_trait::async_trait;
use atelier_core::clock::ManualClock;
use atelier_core::error::{AtelierError, AtelierResult};
use atelier_core::models::{
    Booking, BookingRequest, Identity, LatestMessage, Message, Participant, StudioService, Thread,
    ThreadFlags, ThreadStatus,
};
use atelier_core::repo::{InboxStore, MemoryInboxStore, StoreTx};
use atelier_core::services::{MessagingService, StatusWorkflow};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Delegates to the in-memory store but refuses every message insert.
struct FailingStore {
    inner: MemoryInboxStore,
}

struct FailingTx {
    inner: Box<dyn StoreTx>,
}

#[async_trait]
impl InboxStore for FailingStore {
    async fn begin(&self) -> AtelierResult<Box<dyn StoreTx>> {
        Ok(Box::new(FailingTx {
            inner: self.inner.begin().await?,
        }))
    }

    async fn get_thread(&self, id: Uuid) -> AtelierResult<Option<Thread>> {
        self.inner.get_thread(id).await
    }

    async fn list_threads(&self) -> AtelierResult<Vec<Thread>> {
        self.inner.list_threads().await
    }

    async fn list_threads_visible_to(&self, identity_id: Uuid) -> AtelierResult<Vec<Thread>> {
        self.inner.list_threads_visible_to(identity_id).await
    }

    async fn list_participants(&self, thread_id: Uuid) -> AtelierResult<Vec<Participant>> {
        self.inner.list_participants(thread_id).await
    }

    async fn is_participant(&self, thread_id: Uuid, identity_id: Uuid) -> AtelierResult<bool> {
        self.inner.is_participant(thread_id, identity_id).await
    }

    async fn list_messages(&self, thread_id: Uuid) -> AtelierResult<Vec<Message>> {
        self.inner.list_messages(thread_id).await
    }

    async fn latest_messages(&self, thread_ids: &[Uuid]) -> AtelierResult<Vec<LatestMessage>> {
        self.inner.latest_messages(thread_ids).await
    }

    async fn unread_counts(
        &self,
        viewer_id: Uuid,
        thread_ids: &[Uuid],
    ) -> AtelierResult<Vec<(Uuid, i64)>> {
        self.inner.unread_counts(viewer_id, thread_ids).await
    }

    async fn get_service(&self, id: Uuid) -> AtelierResult<Option<StudioService>> {
        self.inner.get_service(id).await
    }
}

#[async_trait]
impl StoreTx for FailingTx {
    async fn lock_thread(&mut self, id: Uuid) -> AtelierResult<Option<Thread>> {
        self.inner.lock_thread(id).await
    }

    async fn get_service(&mut self, id: Uuid) -> AtelierResult<Option<StudioService>> {
        self.inner.get_service(id).await
    }

    async fn insert_booking(&mut self, booking: &Booking) -> AtelierResult<()> {
        self.inner.insert_booking(booking).await
    }

    async fn insert_thread(&mut self, thread: &Thread) -> AtelierResult<()> {
        self.inner.insert_thread(thread).await
    }

    async fn insert_participant(&mut self, participant: &Participant) -> AtelierResult<()> {
        self.inner.insert_participant(participant).await
    }

    async fn insert_message(&mut self, _message: &Message) -> AtelierResult<Message> {
        Err(AtelierError::DatabaseQueryFailed(
            "simulated insert failure".to_string(),
        ))
    }

    async fn set_last_message_at(
        &mut self,
        thread_id: Uuid,
        at: DateTime<Utc>,
    ) -> AtelierResult<()> {
        self.inner.set_last_message_at(thread_id, at).await
    }

    async fn set_status(&mut self, thread_id: Uuid, status: ThreadStatus) -> AtelierResult<()> {
        self.inner.set_status(thread_id, status).await
    }

    async fn set_flags(&mut self, thread_id: Uuid, flags: ThreadFlags) -> AtelierResult<()> {
        self.inner.set_flags(thread_id, flags).await
    }

    async fn mark_read(
        &mut self,
        thread_id: Uuid,
        viewer_id: Uuid,
        at: DateTime<Utc>,
    ) -> AtelierResult<u64> {
        self.inner.mark_read(thread_id, viewer_id, at).await
    }

    async fn commit(&mut self) -> AtelierResult<()> {
        self.inner.commit().await
    }
}

fn failing_service(inner: &MemoryInboxStore) -> MessagingService {
    MessagingService::new(
        Arc::new(FailingStore {
            inner: inner.clone(),
        }),
        Arc::new(ManualClock::new(Utc::now())),
        StatusWorkflow::default(),
    )
}

mod rollback_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_thread_rolls_back_when_message_insert_fails() {
        let store = MemoryInboxStore::new();
        let service = failing_service(&store);

        let err = service
            .create_thread(
                Some(&Identity::owner()),
                "Doomed",
                vec![Identity::client(), Identity::assistant()],
                "never stored",
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AtelierError::DatabaseQueryFailed(_)));
        assert_eq!(store.thread_count().await, 0);
        assert_eq!(store.participant_count().await, 0);
        assert_eq!(store.message_count().await, 0);
    }

    #[tokio::test]
    async fn test_booking_request_rolls_back_booking_too() {
        let store = MemoryInboxStore::new();
        let catalog_entry = StudioService::new("Brow Lamination", 45, 6_500);
        store.add_service(catalog_entry.clone()).await;
        let service = failing_service(&store);

        let result = service
            .create_from_booking_request(
                Some(&Identity::client()),
                &BookingRequest::new(catalog_entry.id, "hello", "March 10"),
            )
            .await;

        assert!(result.is_err());
        assert_eq!(store.thread_count().await, 0);
        assert!(store.bookings().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_append_leaves_thread_untouched() {
        let store = MemoryInboxStore::new();
        let owner = Identity::owner();
        let client = Identity::client();

        let healthy = MessagingService::new(
            Arc::new(store.clone()),
            Arc::new(ManualClock::new(Utc::now())),
            StatusWorkflow::default(),
        );
        let thread = healthy
            .create_thread(Some(&owner), "Still here", vec![client], "first")
            .await
            .unwrap();

        let failing = failing_service(&store);
        assert!(failing
            .append(Some(&owner), thread.id, "lost reply")
            .await
            .is_err());

        let detail = healthy
            .get_thread(Some(&owner), thread.id)
            .await
            .unwrap();
        assert_eq!(detail.messages.len(), 1);
        assert_eq!(detail.thread.status, ThreadStatus::New);
        assert_eq!(detail.thread.last_message_at, thread.last_message_at);
    }
}
