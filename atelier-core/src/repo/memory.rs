//! In-process store with the same transactional contract as PostgreSQL.
//!
//! A transaction takes the write lock, works on a staged copy of the state
//! and swaps it in on commit. Dropping the transaction throws the copy away,
//! so a failed multi-row write leaves nothing behind.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};
use uuid::Uuid;

use crate::error::{AtelierError, AtelierResult};
use crate::models::{
    Booking, LatestMessage, Message, Participant, StudioService, Thread, ThreadFlags, ThreadStatus,
};

use super::{InboxStore, StoreTx};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    threads: HashMap<Uuid, Thread>,
    participants: Vec<Participant>,
    messages: Vec<Message>,
    services: HashMap<Uuid, StudioService>,
    bookings: HashMap<Uuid, Booking>,
    next_seq: i64,
}

impl MemoryState {
    fn is_visible(&self, thread: &Thread, identity_id: Uuid) -> bool {
        thread.is_owned_by(identity_id)
            || self
                .participants
                .iter()
                .any(|p| p.thread_id == thread.id && p.identity_id == identity_id)
    }

    fn thread_mut(&mut self, id: Uuid) -> AtelierResult<&mut Thread> {
        self.threads
            .get_mut(&id)
            .ok_or(AtelierError::ThreadNotFound(id))
    }
}

fn sort_by_activity(threads: &mut [Thread]) {
    threads.sort_by(|a, b| {
        b.last_message_at
            .cmp(&a.last_message_at)
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| a.id.cmp(&b.id))
    });
}

#[derive(Clone, Default)]
pub struct MemoryInboxStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryInboxStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_service(&self, service: StudioService) {
        let mut state = self.state.write().await;
        state.services.insert(service.id, service);
    }

    pub async fn bookings(&self) -> Vec<Booking> {
        let state = self.state.read().await;
        state.bookings.values().cloned().collect()
    }

    pub async fn thread_count(&self) -> usize {
        self.state.read().await.threads.len()
    }

    pub async fn participant_count(&self) -> usize {
        self.state.read().await.participants.len()
    }

    pub async fn message_count(&self) -> usize {
        self.state.read().await.messages.len()
    }
}

#[async_trait]
impl InboxStore for MemoryInboxStore {
    async fn begin(&self) -> AtelierResult<Box<dyn StoreTx>> {
        let guard = self.state.clone().write_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryStoreTx {
            guard: Some(guard),
            staged: Some(staged),
        }))
    }

    async fn get_thread(&self, id: Uuid) -> AtelierResult<Option<Thread>> {
        Ok(self.state.read().await.threads.get(&id).cloned())
    }

    async fn list_threads(&self) -> AtelierResult<Vec<Thread>> {
        let state = self.state.read().await;
        let mut threads: Vec<Thread> = state.threads.values().cloned().collect();
        sort_by_activity(&mut threads);
        Ok(threads)
    }

    async fn list_threads_visible_to(&self, identity_id: Uuid) -> AtelierResult<Vec<Thread>> {
        let state = self.state.read().await;
        let mut threads: Vec<Thread> = state
            .threads
            .values()
            .filter(|t| state.is_visible(t, identity_id))
            .cloned()
            .collect();
        sort_by_activity(&mut threads);
        Ok(threads)
    }

    async fn list_participants(&self, thread_id: Uuid) -> AtelierResult<Vec<Participant>> {
        let state = self.state.read().await;
        Ok(state
            .participants
            .iter()
            .filter(|p| p.thread_id == thread_id)
            .cloned()
            .collect())
    }

    async fn is_participant(&self, thread_id: Uuid, identity_id: Uuid) -> AtelierResult<bool> {
        let state = self.state.read().await;
        Ok(state
            .participants
            .iter()
            .any(|p| p.thread_id == thread_id && p.identity_id == identity_id))
    }

    async fn list_messages(&self, thread_id: Uuid) -> AtelierResult<Vec<Message>> {
        let state = self.state.read().await;
        let mut messages: Vec<Message> = state
            .messages
            .iter()
            .filter(|m| m.thread_id == thread_id)
            .cloned()
            .collect();
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.seq.cmp(&b.seq)));
        Ok(messages)
    }

    async fn latest_messages(&self, thread_ids: &[Uuid]) -> AtelierResult<Vec<LatestMessage>> {
        let state = self.state.read().await;
        let mut latest: HashMap<Uuid, &Message> = HashMap::new();

        for message in state
            .messages
            .iter()
            .filter(|m| thread_ids.contains(&m.thread_id))
        {
            let newer = latest
                .get(&message.thread_id)
                .map_or(true, |cur| {
                    (message.created_at, message.seq) > (cur.created_at, cur.seq)
                });
            if newer {
                latest.insert(message.thread_id, message);
            }
        }

        Ok(latest.into_values().map(LatestMessage::from).collect())
    }

    async fn unread_counts(
        &self,
        viewer_id: Uuid,
        thread_ids: &[Uuid],
    ) -> AtelierResult<Vec<(Uuid, i64)>> {
        let state = self.state.read().await;
        let mut counts: HashMap<Uuid, i64> = HashMap::new();

        for message in state
            .messages
            .iter()
            .filter(|m| thread_ids.contains(&m.thread_id) && m.is_unread_for(viewer_id))
        {
            *counts.entry(message.thread_id).or_insert(0) += 1;
        }

        Ok(counts.into_iter().collect())
    }

    async fn get_service(&self, id: Uuid) -> AtelierResult<Option<StudioService>> {
        Ok(self.state.read().await.services.get(&id).cloned())
    }
}

pub struct MemoryStoreTx {
    guard: Option<OwnedRwLockWriteGuard<MemoryState>>,
    staged: Option<MemoryState>,
}

impl MemoryStoreTx {
    fn staged(&mut self) -> AtelierResult<&mut MemoryState> {
        self.staged.as_mut().ok_or_else(|| {
            AtelierError::DatabaseTransactionFailed("transaction already committed".to_string())
        })
    }
}

#[async_trait]
impl StoreTx for MemoryStoreTx {
    async fn lock_thread(&mut self, id: Uuid) -> AtelierResult<Option<Thread>> {
        Ok(self.staged()?.threads.get(&id).cloned())
    }

    async fn get_service(&mut self, id: Uuid) -> AtelierResult<Option<StudioService>> {
        Ok(self.staged()?.services.get(&id).cloned())
    }

    async fn insert_booking(&mut self, booking: &Booking) -> AtelierResult<()> {
        let state = self.staged()?;
        if !state.services.contains_key(&booking.service_id) {
            return Err(AtelierError::constraint(format!(
                "booking references unknown service {}",
                booking.service_id
            )));
        }
        state.bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn insert_thread(&mut self, thread: &Thread) -> AtelierResult<()> {
        let state = self.staged()?;
        if !thread.is_consistent() {
            return Err(AtelierError::constraint(
                "group threads cannot have an owner client",
            ));
        }
        if let Some(booking_id) = thread.booking_id {
            if !state.bookings.contains_key(&booking_id) {
                return Err(AtelierError::constraint(format!(
                    "thread references unknown booking {}",
                    booking_id
                )));
            }
        }
        if state.threads.contains_key(&thread.id) {
            return Err(AtelierError::constraint(format!(
                "thread {} already exists",
                thread.id
            )));
        }
        state.threads.insert(thread.id, thread.clone());
        Ok(())
    }

    async fn insert_participant(&mut self, participant: &Participant) -> AtelierResult<()> {
        let state = self.staged()?;
        if !state.threads.contains_key(&participant.thread_id) {
            return Err(AtelierError::ThreadNotFound(participant.thread_id));
        }
        let exists = state.participants.iter().any(|p| {
            p.thread_id == participant.thread_id && p.identity_id == participant.identity_id
        });
        if !exists {
            state.participants.push(participant.clone());
        }
        Ok(())
    }

    async fn insert_message(&mut self, message: &Message) -> AtelierResult<Message> {
        let state = self.staged()?;
        if !state.threads.contains_key(&message.thread_id) {
            return Err(AtelierError::ThreadNotFound(message.thread_id));
        }
        if message.body.is_empty() {
            return Err(AtelierError::constraint("message body must not be empty"));
        }
        state.next_seq += 1;
        let mut stored = message.clone();
        stored.seq = state.next_seq;
        state.messages.push(stored.clone());
        Ok(stored)
    }

    async fn set_last_message_at(
        &mut self,
        thread_id: Uuid,
        at: DateTime<Utc>,
    ) -> AtelierResult<()> {
        self.staged()?.thread_mut(thread_id)?.last_message_at = at;
        Ok(())
    }

    async fn set_status(&mut self, thread_id: Uuid, status: ThreadStatus) -> AtelierResult<()> {
        self.staged()?.thread_mut(thread_id)?.status = status;
        Ok(())
    }

    async fn set_flags(&mut self, thread_id: Uuid, flags: ThreadFlags) -> AtelierResult<()> {
        flags.apply(self.staged()?.thread_mut(thread_id)?);
        Ok(())
    }

    async fn mark_read(
        &mut self,
        thread_id: Uuid,
        viewer_id: Uuid,
        at: DateTime<Utc>,
    ) -> AtelierResult<u64> {
        let state = self.staged()?;
        let mut changed = 0;
        for message in state
            .messages
            .iter_mut()
            .filter(|m| m.thread_id == thread_id && m.is_unread_for(viewer_id))
        {
            if message.mark_read(at) {
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn commit(&mut self) -> AtelierResult<()> {
        let (Some(mut guard), Some(staged)) = (self.guard.take(), self.staged.take()) else {
            return Err(AtelierError::DatabaseTransactionFailed(
                "transaction already committed".to_string(),
            ));
        };
        // The write lock is released here, not when the handle drops.
        *guard = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, ThreadType};

    #[tokio::test]
    async fn test_uncommitted_transaction_is_discarded() {
        let store = MemoryInboxStore::new();
        let thread = Thread::new("Draft", ThreadType::General, Utc::now());

        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_thread(&thread).await.unwrap();
        }

        assert_eq!(store.thread_count().await, 0);
        assert!(store.get_thread(thread.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_commit_publishes_writes() {
        let store = MemoryInboxStore::new();
        let now = Utc::now();
        let thread = Thread::new("Hello", ThreadType::General, now);
        let member = Uuid::new_v4();

        let mut tx = store.begin().await.unwrap();
        tx.insert_thread(&thread).await.unwrap();
        tx.insert_participant(&Participant::new(thread.id, member, Role::Client, now))
            .await
            .unwrap();
        tx.insert_participant(&Participant::new(thread.id, member, Role::Client, now))
            .await
            .unwrap();
        let first = tx
            .insert_message(&Message::new(thread.id, member, "one", now))
            .await
            .unwrap();
        let second = tx
            .insert_message(&Message::new(thread.id, member, "two", now))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert!(second.seq > first.seq);
        assert_eq!(store.participant_count().await, 1);
        assert!(store.is_participant(thread.id, member).await.unwrap());

        let latest = store.latest_messages(&[thread.id]).await.unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].body, "two");
    }

    #[tokio::test]
    async fn test_commit_twice_fails() {
        let store = MemoryInboxStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.commit().await.unwrap();
        assert!(matches!(
            tx.commit().await,
            Err(AtelierError::DatabaseTransactionFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_group_thread_with_owner_rejected() {
        let store = MemoryInboxStore::new();
        let thread = Thread::new("Team", ThreadType::General, Utc::now())
            .as_group()
            .with_owner_client(Uuid::new_v4());

        let mut tx = store.begin().await.unwrap();
        assert!(matches!(
            tx.insert_thread(&thread).await,
            Err(AtelierError::ConstraintViolation(_))
        ));
    }
}
