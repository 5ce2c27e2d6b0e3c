pub mod config;
pub mod demo;
pub mod inbox;
pub mod messages;
pub mod request;
pub mod thread;

pub use config::{handle_config_command, ConfigCommand};
pub use demo::cmd_demo;
pub use inbox::{cmd_inbox, InboxArgs};
pub use messages::{cmd_read, cmd_send};
pub use request::{cmd_request, RequestArgs};
pub use thread::{handle_thread_command, ThreadCommand};

use std::sync::Arc;

use anyhow::Context;
use atelier_core::{
    AtelierConfig, AtelierError, Database, Identity, MessagingService, PgInboxStore, Role,
    ThreadStatus,
};
use chrono::{DateTime, Local, Utc};
use clap::Args;
use colored::{ColoredString, Colorize};
use comfy_table::Color;
use tracing::debug;
use uuid::Uuid;

use crate::config::CliConfig;

/// Who the command acts as. Without `--as` every command runs unauthenticated.
#[derive(Args, Debug, Clone)]
pub struct CallerArgs {
    #[arg(
        long = "as",
        global = true,
        env = "ATELIER_AS",
        value_name = "UUID",
        help = "Identity to act as"
    )]
    pub id: Option<Uuid>,

    #[arg(
        long,
        global = true,
        env = "ATELIER_ROLE",
        default_value = "owner",
        help = "Role of the acting identity (owner, assistant, client)"
    )]
    pub role: Role,
}

impl CallerArgs {
    pub fn identity(&self) -> Option<Identity> {
        self.id.map(|id| Identity::new(id, self.role))
    }
}

/// A connected messaging service plus the caller it acts for.
pub struct Session {
    pub settings: AtelierConfig,
    pub service: MessagingService,
    pub store: Arc<PgInboxStore>,
    caller: Option<Identity>,
    db: Database,
}

impl Session {
    pub async fn open(caller: &CallerArgs) -> anyhow::Result<Self> {
        let settings = CliConfig::load()?.into_settings();

        let db = Database::connect(&settings.to_database_config())
            .await
            .map_err(AtelierError::from)?;
        let store = Arc::new(PgInboxStore::from_database(&db));
        let service = MessagingService::from_config(store.clone(), &settings)
            .await
            .context("Failed to start messaging service")?;

        debug!(
            caller = ?caller.id,
            role = %caller.role,
            enforce_transitions = settings.workflow.enforce_transitions,
            "Session opened"
        );

        Ok(Self {
            settings,
            service,
            store,
            caller: caller.identity(),
            db,
        })
    }

    pub fn caller(&self) -> Option<&Identity> {
        self.caller.as_ref()
    }

    pub async fn close(self) {
        let invalidated = self.service.take_invalidated().await;
        if !invalidated.is_empty() {
            debug!(paths = ?invalidated, "Views to refresh");
        }
        self.db.close().await;
    }
}

pub fn is_json(format: &str) -> bool {
    format.eq_ignore_ascii_case("json")
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn short_id(id: Uuid) -> String {
    id.to_string()[..8].to_string()
}

pub fn format_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

pub fn status_label(status: ThreadStatus) -> ColoredString {
    let label = status.to_string();
    match status {
        ThreadStatus::New => label.cyan().bold(),
        ThreadStatus::Pending => label.yellow(),
        ThreadStatus::Contacted => label.blue(),
        ThreadStatus::Approved => label.green(),
        ThreadStatus::Rejected => label.red(),
        ThreadStatus::Resolved => label.dimmed(),
    }
}

pub fn status_color(status: ThreadStatus) -> Color {
    match status {
        ThreadStatus::New => Color::Cyan,
        ThreadStatus::Pending => Color::Yellow,
        ThreadStatus::Contacted => Color::Blue,
        ThreadStatus::Approved => Color::Green,
        ThreadStatus::Rejected => Color::Red,
        ThreadStatus::Resolved => Color::DarkGrey,
    }
}

pub fn truncate(s: &str, max_chars: usize) -> String {
    let flat = s.replace('\n', " ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut: String = flat.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{}…", cut)
}
