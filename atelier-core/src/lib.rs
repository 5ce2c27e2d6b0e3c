pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod hooks;
pub mod models;
pub mod repo;
pub mod services;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    get_config_dir, AtelierConfig, ConfigLoadError, DatabaseConfig as AtelierDatabaseConfig,
    HooksConfig, InboxConfig, LoggingConfig, WorkflowConfig,
};
pub use db::{init_database, Database, DatabaseConfig, DatabaseError, PoolStatus};
pub use error::{AtelierError, AtelierResult, CliErrorDisplay};
pub use hooks::{
    invalidated_paths, trigger_hook, AuditLogConfig, AuditLogFormat, AuditLogHandler,
    DynHookHandler, Hook, HookConfig, HookContext, HookData, HookExecution, HookHandler,
    HookHandlerInfo, HookManager, HookResult, ViewInvalidationHandler, WebhookConfig,
    WebhookHandler, MESSAGES_VIEW_PATH,
};
pub use models::{
    ArchiveFilter, Booking, BookingRequest, BookingStatus, Identity, InboxFilter, LatestMessage,
    Message, Participant, Role, StudioService, Thread, ThreadDetail, ThreadFlags, ThreadStatus,
    ThreadSummary, ThreadType,
};
pub use repo::{
    BookingRepository, InboxStore, MemoryInboxStore, MessageRepository, ParticipantRepository,
    PgInboxStore, Repository, ServiceRepository, StoreTx, ThreadRepository,
};
pub use services::{
    default_observers, inbox_order, AppendObserver, Appended, AutoContactObserver,
    DynAppendObserver, InboxProjector, LastMessageAtObserver, MessageLog, MessagingService,
    ParticipantDirectory, ReadStateTracker, StatusWorkflow, ThreadService,
};
