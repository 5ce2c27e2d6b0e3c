use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::{Message, Thread};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Hook {
    ThreadCreated,
    MessageAppended,
    ThreadRead,
    ThreadUpdated,
    Custom(String),
}

impl Hook {
    pub fn name(&self) -> &str {
        match self {
            Hook::ThreadCreated => "thread_created",
            Hook::MessageAppended => "message_appended",
            Hook::ThreadRead => "thread_read",
            Hook::ThreadUpdated => "thread_updated",
            Hook::Custom(name) => name,
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "thread_created" => Hook::ThreadCreated,
            "message_appended" => Hook::MessageAppended,
            "thread_read" => Hook::ThreadRead,
            "thread_updated" => Hook::ThreadUpdated,
            custom => Hook::Custom(custom.to_string()),
        }
    }

    /// Every event the messaging service emits after a committed mutation.
    pub fn all_standard() -> Vec<Self> {
        vec![
            Hook::ThreadCreated,
            Hook::MessageAppended,
            Hook::ThreadRead,
            Hook::ThreadUpdated,
        ]
    }
}

impl std::fmt::Display for Hook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum HookData {
    Thread(Thread),
    Message(Message),
    Read {
        thread_id: Uuid,
        reader_id: Uuid,
        marked: u64,
    },
    Custom(serde_json::Value),
    #[default]
    None,
}

impl HookData {
    pub fn thread_id(&self) -> Option<Uuid> {
        match self {
            HookData::Thread(thread) => Some(thread.id),
            HookData::Message(message) => Some(message.thread_id),
            HookData::Read { thread_id, .. } => Some(*thread_id),
            HookData::Custom(_) | HookData::None => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookContext {
    pub hook: Hook,
    pub data: HookData,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub actor_id: Option<Uuid>,
    pub correlation_id: Uuid,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl HookContext {
    pub fn new(hook: Hook, data: HookData) -> Self {
        Self {
            hook,
            data,
            timestamp: Utc::now(),
            source: String::new(),
            actor_id: None,
            correlation_id: Uuid::new_v4(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_actor(mut self, actor_id: Uuid) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    pub fn with_correlation_id(mut self, id: Uuid) -> Self {
        self.correlation_id = id;
        self
    }

    pub fn with_metadata<V: Serialize>(mut self, key: impl Into<String>, value: V) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.metadata.insert(key.into(), v);
        }
        self
    }

    pub fn get_metadata<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.metadata
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn thread_id(&self) -> Option<Uuid> {
        self.data.thread_id()
    }

    pub fn thread_created(thread: Thread) -> Self {
        Self::new(Hook::ThreadCreated, HookData::Thread(thread)).with_source("thread_service")
    }

    pub fn message_appended(message: Message) -> Self {
        let sender = message.sender_id;
        Self::new(Hook::MessageAppended, HookData::Message(message))
            .with_source("message_log")
            .with_actor(sender)
    }

    pub fn thread_read(thread_id: Uuid, reader_id: Uuid, marked: u64) -> Self {
        Self::new(
            Hook::ThreadRead,
            HookData::Read {
                thread_id,
                reader_id,
                marked,
            },
        )
        .with_source("read_state")
        .with_actor(reader_id)
    }

    pub fn thread_updated(thread: Thread) -> Self {
        Self::new(Hook::ThreadUpdated, HookData::Thread(thread)).with_source("thread_service")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub enum HookResult {
    #[default]
    Continue,
    Abort {
        reason: String,
    },
    Skip,
}

impl HookResult {
    pub fn ok() -> Self {
        HookResult::Continue
    }

    pub fn abort(reason: impl Into<String>) -> Self {
        HookResult::Abort {
            reason: reason.into(),
        }
    }

    pub fn skip() -> Self {
        HookResult::Skip
    }

    pub fn is_continue(&self) -> bool {
        matches!(self, HookResult::Continue)
    }

    pub fn is_abort(&self) -> bool {
        matches!(self, HookResult::Abort { .. })
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, HookResult::Skip)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookExecution {
    pub id: Uuid,
    pub hook: Hook,
    pub handler_name: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub result: Option<HookResult>,
    pub error: Option<String>,
    pub duration_ms: Option<u64>,
}

impl HookExecution {
    pub fn new(hook: Hook, handler_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            hook,
            handler_name: handler_name.into(),
            started_at: Utc::now(),
            completed_at: None,
            result: None,
            error: None,
            duration_ms: None,
        }
    }

    pub fn complete(mut self, result: HookResult) -> Self {
        let now = Utc::now();
        self.completed_at = Some(now);
        self.duration_ms = Some((now - self.started_at).num_milliseconds().max(0) as u64);
        self.result = Some(result);
        self
    }

    pub fn fail(mut self, error: impl Into<String>) -> Self {
        let now = Utc::now();
        self.completed_at = Some(now);
        self.duration_ms = Some((now - self.started_at).num_milliseconds().max(0) as u64);
        self.error = Some(error.into());
        self
    }

    pub fn is_successful(&self) -> bool {
        self.error.is_none() && self.result.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookHandlerInfo {
    pub name: String,
    pub hooks: Vec<Hook>,
    pub priority: i32,
    pub enabled: bool,
    pub description: Option<String>,
}

impl HookHandlerInfo {
    pub fn new(name: impl Into<String>, hooks: Vec<Hook>) -> Self {
        Self {
            name: name.into(),
            hooks,
            priority: 0,
            enabled: true,
            description: None,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HookConfig {
    pub timeout_ms: u64,
    pub enabled: bool,
    pub max_handlers: usize,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            enabled: true,
            max_handlers: 32,
        }
    }
}

impl HookConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn with_max_handlers(mut self, max: usize) -> Self {
        self.max_handlers = max;
        self
    }
}

impl From<&crate::config::HooksConfig> for HookConfig {
    fn from(config: &crate::config::HooksConfig) -> Self {
        Self {
            timeout_ms: config.timeout_ms,
            enabled: config.enabled,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ThreadType;

    #[test]
    fn test_hook_name() {
        assert_eq!(Hook::ThreadCreated.name(), "thread_created");
        assert_eq!(Hook::MessageAppended.name(), "message_appended");
        assert_eq!(Hook::Custom("my_hook".to_string()).name(), "my_hook");
    }

    #[test]
    fn test_hook_from_name() {
        assert_eq!(Hook::from_name("thread_read"), Hook::ThreadRead);
        assert_eq!(Hook::from_name("thread_updated"), Hook::ThreadUpdated);
        assert_eq!(
            Hook::from_name("custom_hook"),
            Hook::Custom("custom_hook".to_string())
        );
    }

    #[test]
    fn test_hook_context_creation() {
        let ctx = HookContext::new(Hook::ThreadUpdated, HookData::None)
            .with_source("test")
            .with_metadata("key", "value");

        assert_eq!(ctx.hook, Hook::ThreadUpdated);
        assert_eq!(ctx.source, "test");
        assert_eq!(ctx.get_metadata::<String>("key"), Some("value".to_string()));
        assert_eq!(ctx.thread_id(), None);
    }

    #[test]
    fn test_context_carries_thread_id() {
        let thread = Thread::new("Hello", ThreadType::General, Utc::now());
        let thread_id = thread.id;

        assert_eq!(HookContext::thread_created(thread).thread_id(), Some(thread_id));

        let reader = Uuid::new_v4();
        let ctx = HookContext::thread_read(thread_id, reader, 3);
        assert_eq!(ctx.thread_id(), Some(thread_id));
        assert_eq!(ctx.actor_id, Some(reader));
    }

    #[test]
    fn test_hook_result_variants() {
        assert!(HookResult::ok().is_continue());
        assert!(HookResult::abort("reason").is_abort());
        assert!(HookResult::skip().is_skip());
    }

    #[test]
    fn test_hook_execution() {
        let execution = HookExecution::new(Hook::ThreadCreated, "test_handler");
        assert!(execution.completed_at.is_none());
        assert!(execution.result.is_none());

        let completed = execution.complete(HookResult::ok());
        assert!(completed.completed_at.is_some());
        assert!(completed.is_successful());

        let failed = HookExecution::new(Hook::ThreadCreated, "test_handler").fail("boom");
        assert!(!failed.is_successful());
    }

    #[test]
    fn test_hook_config_from_settings() {
        let settings = crate::config::HooksConfig {
            enabled: false,
            timeout_ms: 250,
            webhook_url: String::new(),
            audit_log_path: None,
        };
        let config = HookConfig::from(&settings);

        assert_eq!(config.timeout_ms, 250);
        assert!(!config.enabled);
        assert_eq!(config.max_handlers, HookConfig::default().max_handlers);
    }
}
