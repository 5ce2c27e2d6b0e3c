use std::sync::Arc;

use uuid::Uuid;

use crate::error::{AtelierError, AtelierResult};
use crate::models::{Identity, Role, Thread};
use crate::repo::InboxStore;

/// Answers who belongs to a thread and who may see it.
#[derive(Clone)]
pub struct ParticipantDirectory {
    store: Arc<dyn InboxStore>,
}

impl ParticipantDirectory {
    pub fn new(store: Arc<dyn InboxStore>) -> Self {
        Self { store }
    }

    /// Explicit participants plus the owner client, each identity once.
    pub async fn participants_of(&self, thread_id: Uuid) -> AtelierResult<Vec<Identity>> {
        let thread = self
            .store
            .get_thread(thread_id)
            .await?
            .ok_or(AtelierError::ThreadNotFound(thread_id))?;

        let mut identities: Vec<Identity> = self
            .store
            .list_participants(thread_id)
            .await?
            .into_iter()
            .map(|p| Identity::new(p.identity_id, p.role))
            .collect();

        if let Some(owner_id) = thread.owner_client_id {
            if !identities.iter().any(|i| i.id == owner_id) {
                identities.push(Identity::new(owner_id, Role::Client));
            }
        }

        Ok(identities)
    }

    /// True when `identity` owns the thread or is listed on it. Unknown threads are invisible.
    pub async fn is_visible_to(&self, identity: &Identity, thread_id: Uuid) -> AtelierResult<bool> {
        match self.store.get_thread(thread_id).await? {
            Some(thread) => self.sees(identity, &thread).await,
            None => Ok(false),
        }
    }

    async fn sees(&self, identity: &Identity, thread: &Thread) -> AtelierResult<bool> {
        if thread.is_owned_by(identity.id) {
            return Ok(true);
        }
        self.store.is_participant(thread.id, identity.id).await
    }

    /// Loads a thread the caller may act on. Staff reach every thread.
    pub async fn accessible_thread(
        &self,
        caller: &Identity,
        thread_id: Uuid,
    ) -> AtelierResult<Thread> {
        let thread = self
            .store
            .get_thread(thread_id)
            .await?
            .ok_or(AtelierError::ThreadNotFound(thread_id))?;

        if caller.is_staff() || self.sees(caller, &thread).await? {
            Ok(thread)
        } else {
            Err(AtelierError::forbidden(format!(
                "thread {} is not visible to {}",
                thread_id, caller.id
            )))
        }
    }
}
