pub mod booking_repo;
pub mod memory;
pub mod message_repo;
pub mod participant_repo;
pub mod postgres;
pub mod service_repo;
pub mod thread_repo;

pub use booking_repo::BookingRepository;
pub use memory::MemoryInboxStore;
pub use message_repo::MessageRepository;
pub use participant_repo::ParticipantRepository;
pub use postgres::PgInboxStore;
pub use service_repo::ServiceRepository;
pub use thread_repo::ThreadRepository;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::error::AtelierResult;
use crate::models::{
    Booking, LatestMessage, Message, Participant, StudioService, Thread, ThreadFlags, ThreadStatus,
};

#[async_trait]
pub trait Repository {
    type Entity;
    type Id;

    async fn get_by_id(&self, id: Self::Id) -> Result<Option<Self::Entity>, DatabaseError>;
    async fn get_all(&self) -> Result<Vec<Self::Entity>, DatabaseError>;
}

/// Read side of the conversation store, plus the entry point for writes.
///
/// Every mutation goes through a [`StoreTx`] obtained from [`InboxStore::begin`].
#[async_trait]
pub trait InboxStore: Send + Sync {
    async fn begin(&self) -> AtelierResult<Box<dyn StoreTx>>;

    async fn get_thread(&self, id: Uuid) -> AtelierResult<Option<Thread>>;

    /// Every thread, newest activity first.
    async fn list_threads(&self) -> AtelierResult<Vec<Thread>>;

    /// Threads owned by `identity_id` or listing it as a participant, newest activity first.
    async fn list_threads_visible_to(&self, identity_id: Uuid) -> AtelierResult<Vec<Thread>>;

    async fn list_participants(&self, thread_id: Uuid) -> AtelierResult<Vec<Participant>>;

    async fn is_participant(&self, thread_id: Uuid, identity_id: Uuid) -> AtelierResult<bool>;

    /// Oldest first, by `(created_at, seq)`.
    async fn list_messages(&self, thread_id: Uuid) -> AtelierResult<Vec<Message>>;

    /// Newest message of each listed thread by `(created_at, seq)`. Threads without messages are absent.
    async fn latest_messages(&self, thread_ids: &[Uuid]) -> AtelierResult<Vec<LatestMessage>>;

    /// Unread messages not sent by `viewer_id`, per thread. Threads with none may be absent.
    async fn unread_counts(
        &self,
        viewer_id: Uuid,
        thread_ids: &[Uuid],
    ) -> AtelierResult<Vec<(Uuid, i64)>>;

    async fn get_service(&self, id: Uuid) -> AtelierResult<Option<StudioService>>;
}

/// A unit of work against the store.
///
/// Nothing written through a transaction is visible until [`StoreTx::commit`]
/// succeeds; dropping it uncommitted discards every write.
#[async_trait]
pub trait StoreTx: Send {
    /// Reads a thread and holds it for the rest of the transaction.
    async fn lock_thread(&mut self, id: Uuid) -> AtelierResult<Option<Thread>>;

    async fn get_service(&mut self, id: Uuid) -> AtelierResult<Option<StudioService>>;

    async fn insert_booking(&mut self, booking: &Booking) -> AtelierResult<()>;

    async fn insert_thread(&mut self, thread: &Thread) -> AtelierResult<()>;

    /// Adding an existing participant again is a no-op.
    async fn insert_participant(&mut self, participant: &Participant) -> AtelierResult<()>;

    /// Returns the stored message with its assigned `seq`.
    async fn insert_message(&mut self, message: &Message) -> AtelierResult<Message>;

    async fn set_last_message_at(&mut self, thread_id: Uuid, at: DateTime<Utc>)
        -> AtelierResult<()>;

    async fn set_status(&mut self, thread_id: Uuid, status: ThreadStatus) -> AtelierResult<()>;

    async fn set_flags(&mut self, thread_id: Uuid, flags: ThreadFlags) -> AtelierResult<()>;

    /// Flags unread messages in the thread not sent by `viewer_id`; returns how many flipped.
    async fn mark_read(
        &mut self,
        thread_id: Uuid,
        viewer_id: Uuid,
        at: DateTime<Utc>,
    ) -> AtelierResult<u64>;

    async fn commit(&mut self) -> AtelierResult<()>;
}
