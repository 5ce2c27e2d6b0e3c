use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::identity::Identity;
use super::message::{LatestMessage, Message};
use super::thread::{Thread, ThreadStatus, ThreadType};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveFilter {
    #[default]
    Active,
    Archived,
    All,
}

impl ArchiveFilter {
    pub fn matches(&self, thread: &Thread) -> bool {
        match self {
            ArchiveFilter::Active => !thread.is_archived,
            ArchiveFilter::Archived => thread.is_archived,
            ArchiveFilter::All => true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboxFilter {
    pub archived: ArchiveFilter,
    pub starred_only: bool,
    pub unread_only: bool,
    pub status: Option<ThreadStatus>,
    pub thread_type: Option<ThreadType>,
}

impl InboxFilter {
    pub fn archived() -> Self {
        Self {
            archived: ArchiveFilter::Archived,
            ..Default::default()
        }
    }

    pub fn all() -> Self {
        Self {
            archived: ArchiveFilter::All,
            ..Default::default()
        }
    }

    pub fn starred(mut self) -> Self {
        self.starred_only = true;
        self
    }

    pub fn unread(mut self) -> Self {
        self.unread_only = true;
        self
    }

    pub fn with_status(mut self, status: ThreadStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_type(mut self, thread_type: ThreadType) -> Self {
        self.thread_type = Some(thread_type);
        self
    }

    /// Thread-level predicates; the unread filter is applied after counts are known.
    pub fn matches_thread(&self, thread: &Thread) -> bool {
        self.archived.matches(thread)
            && (!self.starred_only || thread.is_starred)
            && self.status.map_or(true, |s| thread.status == s)
            && self.thread_type.map_or(true, |t| thread.thread_type == t)
    }
}

/// One row of an inbox projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadSummary {
    #[serde(flatten)]
    pub thread: Thread,
    pub last_message_body: Option<String>,
    pub last_message_sender_id: Option<Uuid>,
    pub unread_count: i64,
}

impl ThreadSummary {
    pub fn new(thread: Thread, latest: Option<&LatestMessage>, unread_count: i64) -> Self {
        Self {
            thread,
            last_message_body: latest.map(|m| m.body.clone()),
            last_message_sender_id: latest.map(|m| m.sender_id),
            unread_count,
        }
    }

    pub fn id(&self) -> Uuid {
        self.thread.id
    }

    pub fn last_message_at(&self) -> DateTime<Utc> {
        self.thread.last_message_at
    }

    pub fn has_unread(&self) -> bool {
        self.unread_count > 0
    }

    /// Latest message body cut to `max_chars` characters, with an ellipsis when cut.
    pub fn preview(&self, max_chars: usize) -> String {
        let body = self.last_message_body.as_deref().unwrap_or_default();
        if body.chars().count() <= max_chars {
            return body.to_string();
        }
        let cut: String = body.chars().take(max_chars).collect();
        format!("{}…", cut.trim_end())
    }
}

/// A thread opened in full.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadDetail {
    pub thread: Thread,
    pub participants: Vec<Identity>,
    pub messages: Vec<Message>,
}
