use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{AtelierError, AtelierResult};
use crate::models::{
    Booking, BookingRequest, Identity, Participant, Role, Thread, ThreadDetail, ThreadFlags,
    ThreadStatus, ThreadType,
};
use crate::repo::InboxStore;

use super::message_log::MessageLog;
use super::participants::ParticipantDirectory;
use super::workflow::StatusWorkflow;

/// Creates threads and applies direct mutations to them.
pub struct ThreadService {
    store: Arc<dyn InboxStore>,
    clock: Arc<dyn Clock>,
    directory: ParticipantDirectory,
    log: Arc<MessageLog>,
    workflow: StatusWorkflow,
}

impl ThreadService {
    pub fn new(
        store: Arc<dyn InboxStore>,
        clock: Arc<dyn Clock>,
        log: Arc<MessageLog>,
        workflow: StatusWorkflow,
    ) -> Self {
        Self {
            directory: ParticipantDirectory::new(store.clone()),
            store,
            clock,
            log,
            workflow,
        }
    }

    pub fn workflow(&self) -> &StatusWorkflow {
        &self.workflow
    }

    /// Opens a thread with its participants and first message in one transaction.
    ///
    /// A single client participant becomes the owner client; two or more
    /// participants make a group thread with no owner.
    pub async fn create_thread(
        &self,
        creator: &Identity,
        subject: &str,
        participants: Vec<Identity>,
        initial_body: &str,
    ) -> AtelierResult<Thread> {
        let subject = subject.trim();
        if subject.is_empty() {
            return Err(AtelierError::validation("thread subject must not be empty"));
        }
        if initial_body.trim().is_empty() {
            return Err(AtelierError::validation("message body must not be empty"));
        }

        let participants = dedupe(participants);
        if participants.is_empty() {
            return Err(AtelierError::constraint(
                "a thread needs at least one participant",
            ));
        }

        let now = self.clock.now();
        let mut thread = Thread::new(subject, ThreadType::General, now);
        if participants.len() > 1 {
            thread = thread.as_group();
        } else if participants[0].role == Role::Client {
            thread = thread.with_owner_client(participants[0].id);
        }

        let mut tx = self.store.begin().await?;
        tx.insert_thread(&thread).await?;
        for identity in participants.iter().chain(std::iter::once(creator)) {
            tx.insert_participant(&Participant::new(thread.id, identity.id, identity.role, now))
                .await?;
        }
        self.log
            .seed(tx.as_mut(), &thread, creator.id, initial_body)
            .await?;
        tx.commit().await?;

        info!(
            thread_id = %thread.id,
            creator_id = %creator.id,
            participants = participants.len(),
            is_group = thread.is_group,
            "Thread created"
        );
        Ok(thread)
    }

    /// Turns a client's booking request into a pending booking plus a request thread.
    pub async fn create_from_booking_request(
        &self,
        client: &Identity,
        request: &BookingRequest,
    ) -> AtelierResult<(Thread, Booking)> {
        if client.role != Role::Client {
            return Err(AtelierError::forbidden(
                "only clients can submit booking requests",
            ));
        }

        let mut tx = self.store.begin().await?;
        let service = tx
            .get_service(request.service_id)
            .await?
            .filter(|s| s.is_active)
            .ok_or(AtelierError::ServiceNotFound(request.service_id))?;

        let now = self.clock.now();
        let notes = Some(request.preferred_dates.trim())
            .filter(|d| !d.is_empty())
            .map(str::to_string);
        let booking = Booking::pending(client.id, &service, notes, now);
        let thread = Thread::new(request.subject(&service), ThreadType::Request, now)
            .with_owner_client(client.id)
            .with_booking(booking.id);

        tx.insert_booking(&booking).await?;
        tx.insert_thread(&thread).await?;
        tx.insert_participant(&Participant::new(thread.id, client.id, client.role, now))
            .await?;
        self.log
            .seed(tx.as_mut(), &thread, client.id, &request.compose_body(&service))
            .await?;
        tx.commit().await?;

        info!(
            thread_id = %thread.id,
            booking_id = %booking.id,
            client_id = %client.id,
            service = %service.name,
            "Booking request received"
        );
        Ok((thread, booking))
    }

    pub async fn set_starred(
        &self,
        caller: &Identity,
        thread_id: Uuid,
        value: bool,
    ) -> AtelierResult<Thread> {
        self.set_flags(caller, thread_id, ThreadFlags::starred(value))
            .await
    }

    pub async fn set_archived(
        &self,
        caller: &Identity,
        thread_id: Uuid,
        value: bool,
    ) -> AtelierResult<Thread> {
        self.set_flags(caller, thread_id, ThreadFlags::archived(value))
            .await
    }

    /// Staff only: a closed thread rejects every append, staff replies included.
    pub async fn set_closed(
        &self,
        caller: &Identity,
        thread_id: Uuid,
        value: bool,
    ) -> AtelierResult<Thread> {
        if !caller.is_staff() {
            return Err(AtelierError::forbidden("only staff can close or reopen a thread"));
        }
        self.set_flags(caller, thread_id, ThreadFlags::closed(value))
            .await
    }

    async fn set_flags(
        &self,
        caller: &Identity,
        thread_id: Uuid,
        flags: ThreadFlags,
    ) -> AtelierResult<Thread> {
        self.directory.accessible_thread(caller, thread_id).await?;

        let mut tx = self.store.begin().await?;
        let mut thread = tx
            .lock_thread(thread_id)
            .await?
            .ok_or(AtelierError::ThreadNotFound(thread_id))?;
        tx.set_flags(thread_id, flags).await?;
        tx.commit().await?;

        flags.apply(&mut thread);
        info!(
            thread_id = %thread_id,
            caller_id = %caller.id,
            starred = thread.is_starred,
            archived = thread.is_archived,
            closed = thread.is_closed,
            "Thread flags updated"
        );
        Ok(thread)
    }

    /// Staff-only explicit status change, validated by the workflow.
    pub async fn set_status(
        &self,
        caller: &Identity,
        thread_id: Uuid,
        status: ThreadStatus,
    ) -> AtelierResult<Thread> {
        if !caller.is_staff() {
            return Err(AtelierError::forbidden("only staff can change thread status"));
        }

        let mut tx = self.store.begin().await?;
        let mut thread = tx
            .lock_thread(thread_id)
            .await?
            .ok_or(AtelierError::ThreadNotFound(thread_id))?;

        self.workflow.check(thread.status, status)?;
        if thread.status == status {
            debug!(thread_id = %thread_id, status = %status, "Status unchanged");
            return Ok(thread);
        }

        tx.set_status(thread_id, status).await?;
        tx.commit().await?;

        info!(
            thread_id = %thread_id,
            caller_id = %caller.id,
            from = %thread.status,
            to = %status,
            "Thread status changed"
        );
        thread.status = status;
        Ok(thread)
    }

    pub async fn get_thread(&self, caller: &Identity, thread_id: Uuid) -> AtelierResult<ThreadDetail> {
        let thread = self.directory.accessible_thread(caller, thread_id).await?;
        let participants = self.directory.participants_of(thread_id).await?;
        let messages = self.log.list_by_thread(thread_id).await?;

        Ok(ThreadDetail {
            thread,
            participants,
            messages,
        })
    }
}

/// First occurrence of each identity wins.
fn dedupe(identities: Vec<Identity>) -> Vec<Identity> {
    let mut seen = HashSet::new();
    identities
        .into_iter()
        .filter(|i| seen.insert(i.id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let client = Identity::client();
        let assistant = Identity::assistant();

        let deduped = dedupe(vec![client, assistant, client, Identity::new(client.id, Role::Owner)]);

        assert_eq!(deduped, vec![client, assistant]);
    }
}
