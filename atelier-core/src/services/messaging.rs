use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::config::AtelierConfig;
use crate::error::{AtelierError, AtelierResult};
use crate::hooks::{
    trigger_hook, AuditLogConfig, AuditLogFormat, AuditLogHandler, HookConfig, HookContext,
    HookManager, ViewInvalidationHandler, WebhookConfig, WebhookHandler,
};
use crate::models::{
    Booking, BookingRequest, Identity, InboxFilter, LatestMessage, Message, Thread, ThreadDetail,
    ThreadStatus, ThreadSummary,
};
use crate::repo::InboxStore;

use super::inbox::InboxProjector;
use super::message_log::{Appended, DynAppendObserver, LastMessageAtObserver, MessageLog};
use super::participants::ParticipantDirectory;
use super::read_state::ReadStateTracker;
use super::threads::ThreadService;
use super::workflow::{AutoContactObserver, StatusWorkflow};

/// Observers every append runs, in order.
pub fn default_observers(workflow: StatusWorkflow) -> Vec<DynAppendObserver> {
    vec![
        Arc::new(LastMessageAtObserver),
        Arc::new(AutoContactObserver::new(workflow)),
    ]
}

fn authenticated(caller: Option<&Identity>) -> AtelierResult<&Identity> {
    caller.ok_or(AtelierError::NotAuthenticated)
}

/// Entry point for dashboard requests.
///
/// Every operation takes the caller resolved by the identity provider; `None`
/// fails with `NotAuthenticated` before any data is read. Committed mutations
/// emit a hook event; hook failures are logged and never undo the mutation.
pub struct MessagingService {
    directory: ParticipantDirectory,
    threads: ThreadService,
    log: Arc<MessageLog>,
    read_state: Arc<ReadStateTracker>,
    inbox: InboxProjector,
    hooks: Arc<HookManager>,
    views: Option<Arc<ViewInvalidationHandler>>,
}

impl MessagingService {
    pub fn new(
        store: Arc<dyn InboxStore>,
        clock: Arc<dyn Clock>,
        workflow: StatusWorkflow,
    ) -> Self {
        let log = Arc::new(MessageLog::new(
            store.clone(),
            clock.clone(),
            default_observers(workflow),
        ));
        let read_state = Arc::new(ReadStateTracker::new(store.clone(), clock.clone()));

        Self {
            directory: ParticipantDirectory::new(store.clone()),
            threads: ThreadService::new(store.clone(), clock, log.clone(), workflow),
            inbox: InboxProjector::new(store, read_state.clone()),
            log,
            read_state,
            hooks: Arc::new(HookManager::new()),
            views: None,
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<HookManager>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Keeps a handle on a view invalidation handler registered with the
    /// hook manager so callers can drain it.
    pub fn with_views(mut self, views: Arc<ViewInvalidationHandler>) -> Self {
        self.views = Some(views);
        self
    }

    /// Wires the service from configuration: system clock, workflow mode,
    /// view invalidation, plus the webhook and audit log when configured.
    pub async fn from_config(
        store: Arc<dyn InboxStore>,
        config: &AtelierConfig,
    ) -> AtelierResult<Self> {
        let hooks = Arc::new(HookManager::with_config(HookConfig::from(&config.hooks)));
        let views = Arc::new(ViewInvalidationHandler::new());
        hooks.register(views.clone()).await?;

        if !config.hooks.webhook_url.is_empty() {
            let webhook = WebhookConfig {
                timeout_ms: config.hooks.timeout_ms,
                ..WebhookConfig::new(config.hooks.webhook_url.clone())
            };
            hooks.register(Arc::new(WebhookHandler::new(webhook))).await?;
        }

        if let Some(log_path) = &config.hooks.audit_log_path {
            let audit = AuditLogConfig {
                log_path: log_path.clone(),
                format: AuditLogFormat::Json,
            };
            hooks.register(Arc::new(AuditLogHandler::new(audit))).await?;
        }

        Ok(Self::new(
            store,
            Arc::new(SystemClock::new()),
            StatusWorkflow::from_config(&config.workflow),
        )
        .with_hooks(hooks)
        .with_views(views))
    }

    pub fn hooks(&self) -> &Arc<HookManager> {
        &self.hooks
    }

    pub fn views(&self) -> Option<&Arc<ViewInvalidationHandler>> {
        self.views.as_ref()
    }

    /// Drains the paths invalidated since the last call.
    pub async fn take_invalidated(&self) -> Vec<String> {
        match &self.views {
            Some(views) => views.take_invalidated().await,
            None => Vec::new(),
        }
    }

    pub fn workflow(&self) -> &StatusWorkflow {
        self.threads.workflow()
    }

    async fn emit(&self, ctx: HookContext) {
        let hook = ctx.hook.clone();
        if let Err(e) = trigger_hook(&self.hooks, ctx).await {
            warn!(hook = %hook, error = %e, "Hook failed after commit");
        }
    }

    pub async fn create_thread(
        &self,
        caller: Option<&Identity>,
        subject: &str,
        participants: Vec<Identity>,
        initial_body: &str,
    ) -> AtelierResult<Thread> {
        let caller = authenticated(caller)?;
        let thread = self
            .threads
            .create_thread(caller, subject, participants, initial_body)
            .await?;
        self.emit(HookContext::thread_created(thread.clone()).with_actor(caller.id))
            .await;
        Ok(thread)
    }

    pub async fn create_from_booking_request(
        &self,
        caller: Option<&Identity>,
        request: &BookingRequest,
    ) -> AtelierResult<(Thread, Booking)> {
        let caller = authenticated(caller)?;
        let (thread, booking) = self
            .threads
            .create_from_booking_request(caller, request)
            .await?;
        self.emit(
            HookContext::thread_created(thread.clone())
                .with_actor(caller.id)
                .with_metadata("booking_id", booking.id),
        )
        .await;
        Ok((thread, booking))
    }

    pub async fn append(
        &self,
        caller: Option<&Identity>,
        thread_id: Uuid,
        body: &str,
    ) -> AtelierResult<Message> {
        let caller = authenticated(caller)?;
        let Appended {
            message,
            thread,
            status_changed,
        } = self.log.append(caller, thread_id, body).await?;

        self.emit(HookContext::message_appended(message.clone()))
            .await;
        if status_changed {
            self.emit(HookContext::thread_updated(thread).with_actor(caller.id))
                .await;
        }
        Ok(message)
    }

    pub async fn list_messages(
        &self,
        caller: Option<&Identity>,
        thread_id: Uuid,
    ) -> AtelierResult<Vec<Message>> {
        let caller = authenticated(caller)?;
        self.directory.accessible_thread(caller, thread_id).await?;
        self.log.list_by_thread(thread_id).await
    }

    /// Staff keep every id; clients keep the threads they can open.
    async fn visible_ids(
        &self,
        caller: &Identity,
        thread_ids: &[Uuid],
    ) -> AtelierResult<Vec<Uuid>> {
        if caller.is_staff() {
            return Ok(thread_ids.to_vec());
        }
        let mut visible = Vec::with_capacity(thread_ids.len());
        for id in thread_ids {
            if self.directory.is_visible_to(caller, *id).await? {
                visible.push(*id);
            }
        }
        Ok(visible)
    }

    /// Latest message per thread, restricted to threads the caller can open.
    pub async fn latest_per_thread(
        &self,
        caller: Option<&Identity>,
        thread_ids: &[Uuid],
    ) -> AtelierResult<HashMap<Uuid, LatestMessage>> {
        let caller = authenticated(caller)?;
        let visible = self.visible_ids(caller, thread_ids).await?;
        self.log.latest_per_thread(&visible).await
    }

    pub async fn get_thread(
        &self,
        caller: Option<&Identity>,
        thread_id: Uuid,
    ) -> AtelierResult<ThreadDetail> {
        let caller = authenticated(caller)?;
        self.threads.get_thread(caller, thread_id).await
    }

    pub async fn participants_of(
        &self,
        caller: Option<&Identity>,
        thread_id: Uuid,
    ) -> AtelierResult<Vec<Identity>> {
        let caller = authenticated(caller)?;
        self.directory.accessible_thread(caller, thread_id).await?;
        self.directory.participants_of(thread_id).await
    }

    pub async fn is_visible_to(
        &self,
        caller: Option<&Identity>,
        thread_id: Uuid,
    ) -> AtelierResult<bool> {
        let caller = authenticated(caller)?;
        self.directory.is_visible_to(caller, thread_id).await
    }

    pub async fn mark_thread_read(
        &self,
        caller: Option<&Identity>,
        thread_id: Uuid,
    ) -> AtelierResult<u64> {
        let caller = authenticated(caller)?;
        let marked = self.read_state.mark_thread_read(caller, thread_id).await?;
        if marked > 0 {
            self.emit(HookContext::thread_read(thread_id, caller.id, marked))
                .await;
        }
        Ok(marked)
    }

    /// Unread counts as the caller sees them. Every listed thread the caller
    /// can open gets an entry, zero when nothing is unread; threads hidden
    /// from a client are left out.
    pub async fn unread_counts(
        &self,
        caller: Option<&Identity>,
        thread_ids: &[Uuid],
    ) -> AtelierResult<HashMap<Uuid, i64>> {
        let caller = authenticated(caller)?;
        let visible = self.visible_ids(caller, thread_ids).await?;
        self.read_state.unread_counts(caller.id, &visible).await
    }

    pub async fn total_unread(&self, caller: Option<&Identity>) -> AtelierResult<i64> {
        let caller = authenticated(caller)?;
        self.read_state.total_unread(caller).await
    }

    pub async fn inbox(
        &self,
        caller: Option<&Identity>,
        filter: &InboxFilter,
    ) -> AtelierResult<Vec<ThreadSummary>> {
        let caller = authenticated(caller)?;
        self.inbox.inbox_for(caller, filter).await
    }

    pub async fn set_starred(
        &self,
        caller: Option<&Identity>,
        thread_id: Uuid,
        value: bool,
    ) -> AtelierResult<Thread> {
        let caller = authenticated(caller)?;
        let thread = self.threads.set_starred(caller, thread_id, value).await?;
        self.emit_updated(caller, &thread).await;
        Ok(thread)
    }

    pub async fn set_archived(
        &self,
        caller: Option<&Identity>,
        thread_id: Uuid,
        value: bool,
    ) -> AtelierResult<Thread> {
        let caller = authenticated(caller)?;
        let thread = self.threads.set_archived(caller, thread_id, value).await?;
        self.emit_updated(caller, &thread).await;
        Ok(thread)
    }

    pub async fn set_closed(
        &self,
        caller: Option<&Identity>,
        thread_id: Uuid,
        value: bool,
    ) -> AtelierResult<Thread> {
        let caller = authenticated(caller)?;
        let thread = self.threads.set_closed(caller, thread_id, value).await?;
        self.emit_updated(caller, &thread).await;
        Ok(thread)
    }

    pub async fn set_status(
        &self,
        caller: Option<&Identity>,
        thread_id: Uuid,
        status: ThreadStatus,
    ) -> AtelierResult<Thread> {
        let caller = authenticated(caller)?;
        let thread = self.threads.set_status(caller, thread_id, status).await?;
        self.emit_updated(caller, &thread).await;
        Ok(thread)
    }

    async fn emit_updated(&self, caller: &Identity, thread: &Thread) {
        debug!(thread_id = %thread.id, "Emitting thread update");
        self.emit(HookContext::thread_updated(thread.clone()).with_actor(caller.id))
            .await;
    }
}
