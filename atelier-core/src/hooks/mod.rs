mod handlers;
mod manager;
mod types;

pub use handlers::{
    invalidated_paths, AuditLogConfig, AuditLogFormat, AuditLogHandler, ViewInvalidationHandler,
    WebhookConfig, WebhookHandler, DEFAULT_PENDING_VIEWS, MESSAGES_VIEW_PATH,
};

pub use manager::{trigger_hook, DynHookHandler, HookHandler, HookManager};

pub use types::{
    Hook, HookConfig, HookContext, HookData, HookExecution, HookHandlerInfo, HookResult,
};
