use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info, warn};

use crate::error::{AtelierError, AtelierResult};

use super::types::{Hook, HookConfig, HookContext, HookExecution, HookHandlerInfo, HookResult};

#[async_trait]
pub trait HookHandler: Send + Sync {
    fn name(&self) -> &str;

    /// Events this handler subscribes to.
    fn hooks(&self) -> Vec<Hook>;

    fn priority(&self) -> i32 {
        0
    }

    fn description(&self) -> Option<&str> {
        None
    }

    async fn handle(&self, ctx: &HookContext) -> AtelierResult<HookResult>;

    fn info(&self) -> HookHandlerInfo {
        HookHandlerInfo {
            name: self.name().to_string(),
            hooks: self.hooks(),
            priority: self.priority(),
            enabled: true,
            description: self.description().map(|s| s.to_string()),
        }
    }
}

pub type DynHookHandler = Arc<dyn HookHandler>;

struct RegisteredHandler {
    handler: DynHookHandler,
    enabled: bool,
}

/// Dispatches post-commit events to registered handlers in priority order.
pub struct HookManager {
    handlers: RwLock<HashMap<Hook, Vec<RegisteredHandler>>>,
    configs: RwLock<HashMap<Hook, HookConfig>>,
    global_config: RwLock<HookConfig>,
    executions: RwLock<Vec<HookExecution>>,
    max_execution_history: usize,
}

impl Default for HookManager {
    fn default() -> Self {
        Self::new()
    }
}

impl HookManager {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            configs: RwLock::new(HashMap::new()),
            global_config: RwLock::new(HookConfig::default()),
            executions: RwLock::new(Vec::new()),
            max_execution_history: 1000,
        }
    }

    pub fn with_config(config: HookConfig) -> Self {
        Self {
            global_config: RwLock::new(config),
            ..Self::new()
        }
    }

    pub fn with_max_history(mut self, max: usize) -> Self {
        self.max_execution_history = max;
        self
    }

    /// Registers `handler` under every hook it subscribes to.
    pub async fn register(&self, handler: DynHookHandler) -> AtelierResult<()> {
        let hooks = handler.hooks();
        if hooks.is_empty() {
            return Err(AtelierError::HookError(format!(
                "Handler '{}' subscribes to no hooks",
                handler.name()
            )));
        }

        for hook in &hooks {
            let config = self.get_config(hook).await;
            let handlers = self.handlers.read().await;
            if let Some(existing) = handlers.get(hook) {
                if existing.len() >= config.max_handlers {
                    return Err(AtelierError::HookError(format!(
                        "Maximum handlers ({}) reached for hook '{}'",
                        config.max_handlers,
                        hook.name()
                    )));
                }
                if existing.iter().any(|h| h.handler.name() == handler.name()) {
                    return Err(AtelierError::HookError(format!(
                        "Handler '{}' already registered for hook '{}'",
                        handler.name(),
                        hook.name()
                    )));
                }
            }
        }

        let mut handlers = self.handlers.write().await;
        for hook in hooks {
            let hook_handlers = handlers.entry(hook.clone()).or_default();
            hook_handlers.push(RegisteredHandler {
                handler: handler.clone(),
                enabled: true,
            });
            hook_handlers.sort_by(|a, b| b.handler.priority().cmp(&a.handler.priority()));

            info!(
                hook = %hook.name(),
                handler = %handler.name(),
                "Registered hook handler"
            );
        }

        Ok(())
    }

    pub async fn unregister(&self, hook: &Hook, handler_name: &str) -> AtelierResult<()> {
        let mut handlers = self.handlers.write().await;

        if let Some(hook_handlers) = handlers.get_mut(hook) {
            let initial_len = hook_handlers.len();
            hook_handlers.retain(|h| h.handler.name() != handler_name);

            if hook_handlers.len() < initial_len {
                info!(
                    hook = %hook.name(),
                    handler = %handler_name,
                    "Unregistered hook handler"
                );
                return Ok(());
            }
        }

        Err(AtelierError::HookHandlerNotFound(format!(
            "{}/{}",
            hook.name(),
            handler_name
        )))
    }

    pub async fn enable_handler(&self, hook: &Hook, handler_name: &str) -> AtelierResult<()> {
        self.set_handler_enabled(hook, handler_name, true).await
    }

    pub async fn disable_handler(&self, hook: &Hook, handler_name: &str) -> AtelierResult<()> {
        self.set_handler_enabled(hook, handler_name, false).await
    }

    async fn set_handler_enabled(
        &self,
        hook: &Hook,
        handler_name: &str,
        enabled: bool,
    ) -> AtelierResult<()> {
        let mut handlers = self.handlers.write().await;

        if let Some(hook_handlers) = handlers.get_mut(hook) {
            for h in hook_handlers.iter_mut() {
                if h.handler.name() == handler_name {
                    h.enabled = enabled;
                    debug!(
                        hook = %hook.name(),
                        handler = %handler_name,
                        enabled = enabled,
                        "Handler enabled state changed"
                    );
                    return Ok(());
                }
            }
        }

        Err(AtelierError::HookHandlerNotFound(format!(
            "{}/{}",
            hook.name(),
            handler_name
        )))
    }

    pub async fn set_config(&self, hook: Hook, config: HookConfig) {
        let mut configs = self.configs.write().await;
        configs.insert(hook, config);
    }

    pub async fn set_global_config(&self, config: HookConfig) {
        let mut global = self.global_config.write().await;
        *global = config;
    }

    pub async fn get_config(&self, hook: &Hook) -> HookConfig {
        let configs = self.configs.read().await;
        if let Some(config) = configs.get(hook) {
            return *config;
        }
        *self.global_config.read().await
    }

    pub async fn execute(&self, ctx: HookContext) -> AtelierResult<HookResult> {
        let config = self.get_config(&ctx.hook).await;

        if !config.enabled {
            debug!(hook = %ctx.hook.name(), "Hook disabled, skipping execution");
            return Ok(HookResult::Skip);
        }

        let enabled_handlers: Vec<DynHookHandler> = {
            let handlers = self.handlers.read().await;
            match handlers.get(&ctx.hook) {
                Some(h) => h
                    .iter()
                    .filter(|r| r.enabled)
                    .map(|r| r.handler.clone())
                    .collect(),
                None => Vec::new(),
            }
        };

        if enabled_handlers.is_empty() {
            debug!(hook = %ctx.hook.name(), "No enabled handlers for hook");
            return Ok(HookResult::Continue);
        }

        let timeout_duration = Duration::from_millis(config.timeout_ms);
        let mut final_result = HookResult::Continue;

        for handler in enabled_handlers {
            let handler_name = handler.name().to_string();
            let execution = HookExecution::new(ctx.hook.clone(), &handler_name);

            debug!(
                hook = %ctx.hook.name(),
                handler = %handler_name,
                priority = handler.priority(),
                "Executing hook handler"
            );

            let result = match timeout(timeout_duration, handler.handle(&ctx)).await {
                Ok(Ok(result)) => {
                    self.record_execution(execution.complete(result.clone()))
                        .await;
                    result
                }
                Ok(Err(e)) => {
                    error!(
                        hook = %ctx.hook.name(),
                        handler = %handler_name,
                        error = %e,
                        "Hook handler execution failed"
                    );
                    self.record_execution(execution.fail(e.to_string())).await;
                    return Err(AtelierError::HookExecutionFailed {
                        hook: ctx.hook.name().to_string(),
                        message: e.to_string(),
                    });
                }
                Err(_) => {
                    warn!(
                        hook = %ctx.hook.name(),
                        handler = %handler_name,
                        timeout_ms = config.timeout_ms,
                        "Hook handler timed out"
                    );
                    self.record_execution(execution.fail("Timeout")).await;
                    return Err(AtelierError::HookTimeout(
                        ctx.hook.name().to_string(),
                        config.timeout_ms,
                    ));
                }
            };

            match &result {
                HookResult::Abort { reason } => {
                    info!(
                        hook = %ctx.hook.name(),
                        handler = %handler_name,
                        reason = %reason,
                        "Hook chain aborted"
                    );
                    return Err(AtelierError::HookAborted(
                        ctx.hook.name().to_string(),
                        reason.clone(),
                    ));
                }
                HookResult::Skip => {
                    debug!(
                        hook = %ctx.hook.name(),
                        handler = %handler_name,
                        "Handler skipped"
                    );
                }
                HookResult::Continue => {
                    final_result = result;
                }
            }
        }

        Ok(final_result)
    }

    async fn record_execution(&self, execution: HookExecution) {
        let mut executions = self.executions.write().await;
        executions.push(execution);

        if executions.len() > self.max_execution_history {
            let drain_count = executions.len() - self.max_execution_history;
            executions.drain(0..drain_count);
        }
    }

    pub async fn get_handlers(&self, hook: &Hook) -> Vec<HookHandlerInfo> {
        let handlers = self.handlers.read().await;
        handlers
            .get(hook)
            .map(|h| {
                h.iter()
                    .map(|r| {
                        let mut info = r.handler.info();
                        info.enabled = r.enabled;
                        info
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub async fn get_recent_executions(&self, limit: usize) -> Vec<HookExecution> {
        let executions = self.executions.read().await;
        executions.iter().rev().take(limit).cloned().collect()
    }

    pub async fn get_executions_for_hook(&self, hook: &Hook, limit: usize) -> Vec<HookExecution> {
        let executions = self.executions.read().await;
        executions
            .iter()
            .rev()
            .filter(|e| &e.hook == hook)
            .take(limit)
            .cloned()
            .collect()
    }

    pub async fn clear_execution_history(&self) {
        let mut executions = self.executions.write().await;
        executions.clear();
    }

    /// Registrations across all hooks; a handler subscribed to two hooks counts twice.
    pub async fn handler_count(&self) -> usize {
        let handlers = self.handlers.read().await;
        handlers.values().map(|h| h.len()).sum()
    }

    pub async fn has_handlers(&self, hook: &Hook) -> bool {
        let handlers = self.handlers.read().await;
        handlers.get(hook).map(|h| !h.is_empty()).unwrap_or(false)
    }
}

/// Runs a hook, treating an abort as a normal outcome.
pub async fn trigger_hook(manager: &HookManager, ctx: HookContext) -> AtelierResult<()> {
    match manager.execute(ctx).await {
        Ok(_) => Ok(()),
        Err(AtelierError::HookAborted(_, _)) => Ok(()),
        Err(e) => Err(e),
    }
}
