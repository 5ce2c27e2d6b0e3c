use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, error, warn};

use crate::error::AtelierResult;

use super::manager::HookHandler;
use super::types::{Hook, HookContext, HookResult};

pub const MESSAGES_VIEW_PATH: &str = "/dashboard/messages";

/// Dashboard views that render `ctx` and must be refreshed.
pub fn invalidated_paths(ctx: &HookContext) -> Vec<String> {
    let mut paths = vec![MESSAGES_VIEW_PATH.to_string()];
    if let Some(thread_id) = ctx.thread_id() {
        paths.push(format!("{}/{}", MESSAGES_VIEW_PATH, thread_id));
    }
    paths
}

/// Per-thread paths held between drains before the oldest are dropped.
pub const DEFAULT_PENDING_VIEWS: usize = 1024;

#[derive(Default)]
struct PendingViews {
    messages_view: bool,
    threads: VecDeque<String>,
    seen: HashSet<String>,
    dropped: u64,
}

/// Turns committed mutations into view re-render triggers.
///
/// Pending paths are bounded: past `capacity` thread paths the oldest is
/// dropped. The messages list path is never dropped, so a consumer that
/// drains late still re-renders the inbox.
pub struct ViewInvalidationHandler {
    pending: RwLock<PendingViews>,
    capacity: usize,
    notifier: Option<Arc<dyn Fn(Vec<String>) + Send + Sync>>,
}

impl Default for ViewInvalidationHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewInvalidationHandler {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_PENDING_VIEWS)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pending: RwLock::new(PendingViews::default()),
            capacity: capacity.max(1),
            notifier: None,
        }
    }

    pub fn with_notifier<F>(mut self, notifier: F) -> Self
    where
        F: Fn(Vec<String>) + Send + Sync + 'static,
    {
        self.notifier = Some(Arc::new(notifier));
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub async fn pending_len(&self) -> usize {
        let pending = self.pending.read().await;
        pending.threads.len() + usize::from(pending.messages_view)
    }

    /// Paths invalidated since the last call, each listed once. The messages
    /// list comes first, then thread paths in first-seen order.
    pub async fn take_invalidated(&self) -> Vec<String> {
        let mut pending = self.pending.write().await;
        let PendingViews {
            messages_view,
            threads,
            dropped,
            ..
        } = std::mem::take(&mut *pending);

        if dropped > 0 {
            debug!(dropped, "Thread views dropped before drain");
        }

        let mut paths = Vec::with_capacity(threads.len() + 1);
        if messages_view {
            paths.push(MESSAGES_VIEW_PATH.to_string());
        }
        paths.extend(threads);
        paths
    }

    async fn record(&self, paths: &[String]) {
        let mut pending = self.pending.write().await;
        for path in paths {
            if path == MESSAGES_VIEW_PATH {
                pending.messages_view = true;
                continue;
            }
            if !pending.seen.insert(path.clone()) {
                continue;
            }
            pending.threads.push_back(path.clone());
            if pending.threads.len() > self.capacity {
                if let Some(oldest) = pending.threads.pop_front() {
                    pending.seen.remove(&oldest);
                    pending.dropped += 1;
                }
            }
        }
    }
}

#[async_trait]
impl HookHandler for ViewInvalidationHandler {
    fn name(&self) -> &str {
        "view_invalidation"
    }

    fn hooks(&self) -> Vec<Hook> {
        Hook::all_standard()
    }

    fn priority(&self) -> i32 {
        100
    }

    fn description(&self) -> Option<&str> {
        Some("Marks dashboard message views for re-render")
    }

    async fn handle(&self, ctx: &HookContext) -> AtelierResult<HookResult> {
        let paths = invalidated_paths(ctx);
        self.record(&paths).await;

        debug!(hook = %ctx.hook.name(), paths = ?paths, "Views invalidated");

        if let Some(ref notifier) = self.notifier {
            notifier(paths);
        }

        Ok(HookResult::Continue)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogConfig {
    pub log_path: PathBuf,
    pub format: AuditLogFormat,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditLogFormat {
    #[default]
    Json,
    Plain,
}

impl Default for AuditLogConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from("atelier-audit.log"),
            format: AuditLogFormat::Json,
        }
    }
}

/// Appends one line per committed mutation to a local file.
pub struct AuditLogHandler {
    config: AuditLogConfig,
}

impl AuditLogHandler {
    pub fn new(config: AuditLogConfig) -> Self {
        Self { config }
    }

    fn format_entry(&self, ctx: &HookContext) -> String {
        let thread_id = ctx.thread_id().map(|id| id.to_string());
        let actor_id = ctx.actor_id.map(|id| id.to_string());

        match self.config.format {
            AuditLogFormat::Json => {
                let entry = serde_json::json!({
                    "timestamp": ctx.timestamp.to_rfc3339(),
                    "event": ctx.hook.name(),
                    "thread_id": thread_id,
                    "actor_id": actor_id,
                    "correlation_id": ctx.correlation_id.to_string(),
                });
                format!("{}\n", entry)
            }
            AuditLogFormat::Plain => format!(
                "[{}] {} thread={} actor={}\n",
                ctx.timestamp.format("%Y-%m-%d %H:%M:%S"),
                ctx.hook.name(),
                thread_id.as_deref().unwrap_or("-"),
                actor_id.as_deref().unwrap_or("-"),
            ),
        }
    }

    async fn write_entry(&self, entry: &str) -> AtelierResult<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.config.log_path)
            .await?;

        file.write_all(entry.as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }
}

#[async_trait]
impl HookHandler for AuditLogHandler {
    fn name(&self) -> &str {
        "audit_log"
    }

    fn hooks(&self) -> Vec<Hook> {
        Hook::all_standard()
    }

    fn priority(&self) -> i32 {
        50
    }

    fn description(&self) -> Option<&str> {
        Some("Logs messaging events to a file")
    }

    async fn handle(&self, ctx: &HookContext) -> AtelierResult<HookResult> {
        let entry = self.format_entry(ctx);

        if let Err(e) = self.write_entry(&entry).await {
            error!(error = %e, path = %self.config.log_path.display(), "Failed to write audit entry");
        }

        Ok(HookResult::Continue)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
    pub headers: HashMap<String, String>,
    /// Events to forward; empty forwards every standard event.
    pub events: Vec<Hook>,
    pub timeout_ms: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            headers: HashMap::new(),
            events: Vec::new(),
            timeout_ms: 5000,
        }
    }
}

impl WebhookConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

/// Forwards messaging events as JSON `POST`s.
pub struct WebhookHandler {
    config: WebhookConfig,
    client: reqwest::Client,
}

impl WebhookHandler {
    pub fn new(config: WebhookConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { config, client }
    }
}

#[async_trait]
impl HookHandler for WebhookHandler {
    fn name(&self) -> &str {
        "webhook"
    }

    fn hooks(&self) -> Vec<Hook> {
        Hook::all_standard()
    }

    fn priority(&self) -> i32 {
        10
    }

    fn description(&self) -> Option<&str> {
        Some("Sends messaging events to a webhook URL")
    }

    async fn handle(&self, ctx: &HookContext) -> AtelierResult<HookResult> {
        let config = &self.config;

        if config.url.is_empty() {
            return Ok(HookResult::Continue);
        }

        if !config.events.is_empty() && !config.events.contains(&ctx.hook) {
            return Ok(HookResult::Skip);
        }

        let payload = serde_json::json!({
            "hook": ctx.hook.name(),
            "timestamp": ctx.timestamp.to_rfc3339(),
            "sent_at": Utc::now().to_rfc3339(),
            "source": ctx.source,
            "actor_id": ctx.actor_id,
            "correlation_id": ctx.correlation_id.to_string(),
            "thread_id": ctx.thread_id(),
            "data": ctx.data,
        });

        let mut request = self.client.post(&config.url).json(&payload);

        for (key, value) in &config.headers {
            request = request.header(key.as_str(), value.as_str());
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                debug!(
                    hook = %ctx.hook.name(),
                    url = %config.url,
                    "Webhook sent successfully"
                );
            }
            Ok(response) => {
                warn!(
                    hook = %ctx.hook.name(),
                    url = %config.url,
                    status = %response.status(),
                    "Webhook request failed"
                );
            }
            Err(e) => {
                error!(
                    hook = %ctx.hook.name(),
                    url = %config.url,
                    error = %e,
                    "Webhook request error"
                );
            }
        }

        Ok(HookResult::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::HookData;
    use crate::models::{Message, Thread, ThreadType};
    use uuid::Uuid;

    fn thread() -> Thread {
        Thread::new("Touch-up", ThreadType::General, Utc::now())
    }

    #[tokio::test]
    async fn test_view_invalidation_paths() {
        let handler = ViewInvalidationHandler::new();
        let thread = thread();
        let thread_id = thread.id;

        let result = handler
            .handle(&HookContext::thread_created(thread))
            .await
            .unwrap();
        assert!(result.is_continue());

        let paths = handler.take_invalidated().await;
        assert_eq!(
            paths,
            vec![
                "/dashboard/messages".to_string(),
                format!("/dashboard/messages/{}", thread_id),
            ]
        );
        assert!(handler.take_invalidated().await.is_empty());
    }

    #[tokio::test]
    async fn test_view_invalidation_dedupes_pending_paths() {
        let handler = ViewInvalidationHandler::new();
        let thread_id = Uuid::new_v4();
        let message = Message::new(thread_id, Uuid::new_v4(), "hi", Utc::now());

        handler
            .handle(&HookContext::message_appended(message))
            .await
            .unwrap();
        handler
            .handle(&HookContext::thread_read(thread_id, Uuid::new_v4(), 1))
            .await
            .unwrap();

        assert_eq!(handler.take_invalidated().await.len(), 2);
    }

    #[tokio::test]
    async fn test_view_invalidation_pending_is_bounded() {
        let handler = ViewInvalidationHandler::with_capacity(16);

        for _ in 0..500 {
            handler
                .handle(&HookContext::thread_created(thread()))
                .await
                .unwrap();
        }
        assert_eq!(handler.pending_len().await, 17);

        let last = thread();
        let last_path = format!("/dashboard/messages/{}", last.id);
        handler
            .handle(&HookContext::thread_created(last))
            .await
            .unwrap();

        let paths = handler.take_invalidated().await;
        assert_eq!(paths.len(), 17);
        assert_eq!(paths[0], MESSAGES_VIEW_PATH);
        assert_eq!(paths.last(), Some(&last_path));
        assert_eq!(handler.pending_len().await, 0);
    }

    #[tokio::test]
    async fn test_view_invalidation_notifier() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handler = ViewInvalidationHandler::new().with_notifier(move |paths| {
            sink.lock().unwrap().extend(paths);
        });

        handler
            .handle(&HookContext::new(Hook::ThreadUpdated, HookData::None))
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["/dashboard/messages".to_string()]);
    }

    #[tokio::test]
    async fn test_audit_log_handler_writes_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("audit.log");
        let handler = AuditLogHandler::new(AuditLogConfig {
            log_path: log_path.clone(),
            format: AuditLogFormat::Json,
        });

        let thread = thread();
        let thread_id = thread.id;
        handler
            .handle(&HookContext::thread_created(thread))
            .await
            .unwrap();
        handler
            .handle(&HookContext::thread_read(thread_id, Uuid::new_v4(), 2))
            .await
            .unwrap();

        let content = tokio::fs::read_to_string(&log_path).await.unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "thread_created");
        assert_eq!(lines[1]["event"], "thread_read");
        assert_eq!(lines[1]["thread_id"], thread_id.to_string());
    }

    #[tokio::test]
    async fn test_audit_log_handler_plain_format() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("audit.log");
        let handler = AuditLogHandler::new(AuditLogConfig {
            log_path: log_path.clone(),
            format: AuditLogFormat::Plain,
        });

        handler
            .handle(&HookContext::new(Hook::ThreadUpdated, HookData::None))
            .await
            .unwrap();

        let content = tokio::fs::read_to_string(&log_path).await.unwrap();
        assert!(content.contains("thread_updated thread=- actor=-"));
    }

    #[tokio::test]
    async fn test_webhook_handler_empty_url() {
        let handler = WebhookHandler::new(WebhookConfig::default());

        let ctx = HookContext::new(Hook::ThreadCreated, HookData::None);
        let result = handler.handle(&ctx).await.unwrap();

        assert!(result.is_continue());
    }

    #[tokio::test]
    async fn test_webhook_handler_skips_unselected_events() {
        let config = WebhookConfig {
            events: vec![Hook::MessageAppended],
            ..WebhookConfig::new("http://127.0.0.1:9/hooks")
        };
        let handler = WebhookHandler::new(config);

        let ctx = HookContext::new(Hook::ThreadRead, HookData::None);
        assert!(handler.handle(&ctx).await.unwrap().is_skip());
    }
}
