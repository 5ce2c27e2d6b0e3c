use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{AtelierError, AtelierResult};
use crate::models::{Identity, LatestMessage, Message, Thread};
use crate::repo::{InboxStore, StoreTx};

use super::participants::ParticipantDirectory;

/// Side effect of an append, run inside the append's transaction.
///
/// `thread` is the locked row; observers keep it in step with what they write.
#[async_trait]
pub trait AppendObserver: Send + Sync {
    fn name(&self) -> &str;

    async fn on_append(
        &self,
        tx: &mut dyn StoreTx,
        thread: &mut Thread,
        sender: &Identity,
        message: &Message,
    ) -> AtelierResult<()>;
}

pub type DynAppendObserver = Arc<dyn AppendObserver>;

/// Keeps `thread.last_message_at` on the newest message.
pub struct LastMessageAtObserver;

#[async_trait]
impl AppendObserver for LastMessageAtObserver {
    fn name(&self) -> &str {
        "last_message_at"
    }

    async fn on_append(
        &self,
        tx: &mut dyn StoreTx,
        thread: &mut Thread,
        _sender: &Identity,
        message: &Message,
    ) -> AtelierResult<()> {
        tx.set_last_message_at(thread.id, message.created_at)
            .await?;
        thread.last_message_at = message.created_at;
        Ok(())
    }
}

/// Result of a committed append.
#[derive(Debug, Clone)]
pub struct Appended {
    pub message: Message,
    /// The thread after every observer ran.
    pub thread: Thread,
    pub status_changed: bool,
}

/// The append-only message log.
pub struct MessageLog {
    store: Arc<dyn InboxStore>,
    clock: Arc<dyn Clock>,
    directory: ParticipantDirectory,
    observers: Vec<DynAppendObserver>,
}

impl MessageLog {
    pub fn new(
        store: Arc<dyn InboxStore>,
        clock: Arc<dyn Clock>,
        observers: Vec<DynAppendObserver>,
    ) -> Self {
        Self {
            directory: ParticipantDirectory::new(store.clone()),
            store,
            clock,
            observers,
        }
    }

    pub async fn append(
        &self,
        sender: &Identity,
        thread_id: Uuid,
        body: &str,
    ) -> AtelierResult<Appended> {
        let body = validate_body(body)?;
        let visible = self.directory.accessible_thread(sender, thread_id).await?;

        let mut tx = self.store.begin().await?;
        let mut thread = tx
            .lock_thread(visible.id)
            .await?
            .ok_or(AtelierError::ThreadNotFound(thread_id))?;

        if thread.is_closed {
            return Err(AtelierError::constraint(format!(
                "thread {} is closed",
                thread_id
            )));
        }

        let created_at = self.clock.now().max(thread.last_message_at);
        let draft = Message::new(thread.id, sender.id, body, created_at);
        let message = tx.insert_message(&draft).await?;

        let status_before = thread.status;
        for observer in &self.observers {
            debug!(observer = observer.name(), message_id = %message.id, "Running append observer");
            observer
                .on_append(tx.as_mut(), &mut thread, sender, &message)
                .await?;
        }

        tx.commit().await?;

        info!(
            thread_id = %thread.id,
            sender_id = %sender.id,
            message_id = %message.id,
            seq = message.seq,
            "Message appended"
        );

        Ok(Appended {
            status_changed: thread.status != status_before,
            message,
            thread,
        })
    }

    /// Writes a thread's opening message without running observers.
    pub(crate) async fn seed(
        &self,
        tx: &mut dyn StoreTx,
        thread: &Thread,
        sender_id: Uuid,
        body: &str,
    ) -> AtelierResult<Message> {
        let body = validate_body(body)?;
        let draft = Message::new(thread.id, sender_id, body, thread.last_message_at);
        tx.insert_message(&draft).await
    }

    /// Oldest first. Equal timestamps keep insertion order.
    pub async fn list_by_thread(&self, thread_id: Uuid) -> AtelierResult<Vec<Message>> {
        let messages = self.store.list_messages(thread_id).await?;
        debug!(thread_id = %thread_id, count = messages.len(), "Listed messages");
        Ok(messages)
    }

    pub async fn latest_per_thread(
        &self,
        thread_ids: &[Uuid],
    ) -> AtelierResult<HashMap<Uuid, LatestMessage>> {
        if thread_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let latest = self.store.latest_messages(thread_ids).await?;
        Ok(latest.into_iter().map(|m| (m.thread_id, m)).collect())
    }
}

pub(crate) fn validate_body(body: &str) -> AtelierResult<&str> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(AtelierError::validation("message body must not be empty"));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_body_trims() {
        assert_eq!(validate_body("  hello \n").unwrap(), "hello");
    }

    #[test]
    fn test_validate_body_rejects_blank() {
        assert!(matches!(
            validate_body(" \t\n"),
            Err(AtelierError::Validation(_))
        ));
        assert!(matches!(validate_body(""), Err(AtelierError::Validation(_))));
    }
}
