use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

use super::identity::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "thread_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ThreadType {
    Request,
    Inquiry,
    Confirmation,
    Reminder,
    Booking,
    General,
}

impl std::fmt::Display for ThreadType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ThreadType::Request => write!(f, "request"),
            ThreadType::Inquiry => write!(f, "inquiry"),
            ThreadType::Confirmation => write!(f, "confirmation"),
            ThreadType::Reminder => write!(f, "reminder"),
            ThreadType::Booking => write!(f, "booking"),
            ThreadType::General => write!(f, "general"),
        }
    }
}

impl FromStr for ThreadType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "request" => Ok(ThreadType::Request),
            "inquiry" => Ok(ThreadType::Inquiry),
            "confirmation" => Ok(ThreadType::Confirmation),
            "reminder" => Ok(ThreadType::Reminder),
            "booking" => Ok(ThreadType::Booking),
            "general" => Ok(ThreadType::General),
            other => Err(format!("Unknown thread type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "thread_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ThreadStatus {
    New,
    Pending,
    Contacted,
    Approved,
    Rejected,
    Resolved,
}

impl ThreadStatus {
    /// Forward-only transition table. `Resolved` is terminal.
    pub fn allowed_next(&self) -> &'static [ThreadStatus] {
        use ThreadStatus::*;
        match self {
            New => &[Pending, Contacted, Approved, Rejected, Resolved],
            Pending => &[Contacted, Approved, Rejected, Resolved],
            Contacted => &[Approved, Rejected, Resolved],
            Approved => &[Resolved],
            Rejected => &[Resolved],
            Resolved => &[],
        }
    }

    pub fn can_transition_to(&self, next: ThreadStatus) -> bool {
        *self == next || self.allowed_next().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_next().is_empty()
    }

    pub fn all() -> [ThreadStatus; 6] {
        use ThreadStatus::*;
        [New, Pending, Contacted, Approved, Rejected, Resolved]
    }
}

impl std::fmt::Display for ThreadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ThreadStatus::New => write!(f, "new"),
            ThreadStatus::Pending => write!(f, "pending"),
            ThreadStatus::Contacted => write!(f, "contacted"),
            ThreadStatus::Approved => write!(f, "approved"),
            ThreadStatus::Rejected => write!(f, "rejected"),
            ThreadStatus::Resolved => write!(f, "resolved"),
        }
    }
}

impl FromStr for ThreadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "new" => Ok(ThreadStatus::New),
            "pending" => Ok(ThreadStatus::Pending),
            "contacted" => Ok(ThreadStatus::Contacted),
            "approved" => Ok(ThreadStatus::Approved),
            "rejected" => Ok(ThreadStatus::Rejected),
            "resolved" => Ok(ThreadStatus::Resolved),
            other => Err(format!("Unknown thread status: {}", other)),
        }
    }
}

/// A conversation container.
///
/// `owner_client_id` is only ever set on one-to-one threads: a group thread
/// (`is_group`) reaches its members through the participant rows instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Thread {
    pub id: Uuid,
    pub subject: String,
    pub thread_type: ThreadType,
    pub status: ThreadStatus,
    pub is_starred: bool,
    pub is_archived: bool,
    pub is_closed: bool,
    pub is_group: bool,
    pub owner_client_id: Option<Uuid>,
    pub booking_id: Option<Uuid>,
    pub last_message_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Thread {
    pub fn new(subject: impl Into<String>, thread_type: ThreadType, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            subject: subject.into(),
            thread_type,
            status: ThreadStatus::New,
            is_starred: false,
            is_archived: false,
            is_closed: false,
            is_group: false,
            owner_client_id: None,
            booking_id: None,
            last_message_at: now,
            created_at: now,
        }
    }

    pub fn with_owner_client(mut self, client_id: Uuid) -> Self {
        self.owner_client_id = Some(client_id);
        self
    }

    pub fn with_booking(mut self, booking_id: Uuid) -> Self {
        self.booking_id = Some(booking_id);
        self
    }

    pub fn as_group(mut self) -> Self {
        self.is_group = true;
        self
    }

    /// Group threads never carry an owner client.
    pub fn is_consistent(&self) -> bool {
        !(self.is_group && self.owner_client_id.is_some())
    }

    pub fn is_owned_by(&self, identity_id: Uuid) -> bool {
        self.owner_client_id == Some(identity_id)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadFlags {
    pub is_starred: Option<bool>,
    pub is_archived: Option<bool>,
    pub is_closed: Option<bool>,
}

impl ThreadFlags {
    pub fn starred(value: bool) -> Self {
        Self {
            is_starred: Some(value),
            ..Default::default()
        }
    }

    pub fn archived(value: bool) -> Self {
        Self {
            is_archived: Some(value),
            ..Default::default()
        }
    }

    pub fn closed(value: bool) -> Self {
        Self {
            is_closed: Some(value),
            ..Default::default()
        }
    }

    pub fn apply(&self, thread: &mut Thread) {
        if let Some(v) = self.is_starred {
            thread.is_starred = v;
        }
        if let Some(v) = self.is_archived {
            thread.is_archived = v;
        }
        if let Some(v) = self.is_closed {
            thread.is_closed = v;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Participant {
    pub thread_id: Uuid,
    pub identity_id: Uuid,
    pub role: Role,
    pub added_at: DateTime<Utc>,
}

impl Participant {
    pub fn new(thread_id: Uuid, identity_id: Uuid, role: Role, added_at: DateTime<Utc>) -> Self {
        Self {
            thread_id,
            identity_id,
            role,
            added_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_new_defaults() {
        let now = Utc::now();
        let thread = Thread::new("Hello", ThreadType::General, now);

        assert_eq!(thread.status, ThreadStatus::New);
        assert_eq!(thread.last_message_at, now);
        assert!(!thread.is_starred && !thread.is_archived && !thread.is_closed);
        assert!(thread.owner_client_id.is_none());
        assert!(thread.is_consistent());
    }

    #[test]
    fn test_group_with_owner_is_inconsistent() {
        let thread = Thread::new("Team", ThreadType::General, Utc::now())
            .as_group()
            .with_owner_client(Uuid::new_v4());
        assert!(!thread.is_consistent());
    }

    #[test]
    fn test_status_transitions_are_forward_only() {
        use ThreadStatus::*;
        assert!(New.can_transition_to(Contacted));
        assert!(Contacted.can_transition_to(Approved));
        assert!(Approved.can_transition_to(Resolved));
        assert!(!Resolved.can_transition_to(Approved));
        assert!(!Approved.can_transition_to(Rejected));
        assert!(!Contacted.can_transition_to(Pending));
        assert!(Resolved.can_transition_to(Resolved));
        assert!(Resolved.is_terminal());
    }

    #[test]
    fn test_resolved_reachable_from_every_state() {
        for status in ThreadStatus::all() {
            assert!(status.can_transition_to(ThreadStatus::Resolved));
        }
    }

    #[test]
    fn test_flags_apply_only_set_fields() {
        let mut thread = Thread::new("Hi", ThreadType::Inquiry, Utc::now());
        thread.is_archived = true;

        ThreadFlags::starred(true).apply(&mut thread);

        assert!(thread.is_starred);
        assert!(thread.is_archived);
        assert!(!thread.is_closed);
    }

    #[test]
    fn test_status_parse_round_trip() {
        for status in ThreadStatus::all() {
            assert_eq!(status.to_string().parse::<ThreadStatus>().unwrap(), status);
        }
        assert!("open".parse::<ThreadStatus>().is_err());
    }
}
