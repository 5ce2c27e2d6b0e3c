use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// An append-only unit of conversation content.
///
/// `is_read` is a single flag shared by every viewer: once any participant
/// other than the sender opens the thread, the message counts as read for
/// everyone. There is no per-viewer receipt table behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Message {
    pub id: Uuid,
    /// Store-assigned insertion order; breaks ties between equal timestamps.
    pub seq: i64,
    pub thread_id: Uuid,
    pub sender_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
}

impl Message {
    pub fn new(
        thread_id: Uuid,
        sender_id: Uuid,
        body: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            seq: 0,
            thread_id,
            sender_id,
            body: body.into(),
            created_at,
            is_read: false,
            read_at: None,
        }
    }

    pub fn mark_read(&mut self, at: DateTime<Utc>) -> bool {
        if self.is_read {
            return false;
        }
        self.is_read = true;
        self.read_at = Some(at);
        true
    }

    /// Whether this message counts toward `viewer_id`'s unread badge.
    pub fn is_unread_for(&self, viewer_id: Uuid) -> bool {
        !self.is_read && self.sender_id != viewer_id
    }
}

/// Preview of the newest message in a thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct LatestMessage {
    pub thread_id: Uuid,
    pub body: String,
    pub sender_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<&Message> for LatestMessage {
    fn from(message: &Message) -> Self {
        Self {
            thread_id: message.thread_id,
            body: message.body.clone(),
            sender_id: message.sender_id,
            created_at: message.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_new_is_unread() {
        let sender = Uuid::new_v4();
        let message = Message::new(Uuid::new_v4(), sender, "hi", Utc::now());

        assert!(!message.is_read);
        assert!(message.read_at.is_none());
        assert!(!message.is_unread_for(sender));
        assert!(message.is_unread_for(Uuid::new_v4()));
    }

    #[test]
    fn test_mark_read_once() {
        let mut message = Message::new(Uuid::new_v4(), Uuid::new_v4(), "hi", Utc::now());
        let first = Utc::now();

        assert!(message.mark_read(first));
        assert!(!message.mark_read(Utc::now()));
        assert_eq!(message.read_at, Some(first));
    }
}
