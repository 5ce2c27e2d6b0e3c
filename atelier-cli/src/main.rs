use atelier_core::{AtelierError, CliErrorDisplay, Database};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::process::ExitCode;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

mod commands;
mod config;

use commands::{
    cmd_demo, cmd_inbox, cmd_read, cmd_request, cmd_send, handle_config_command,
    handle_thread_command, CallerArgs, ConfigCommand, InboxArgs, RequestArgs, ThreadCommand,
};
use config::{mask_password, CliConfig};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const NAME: &str = env!("CARGO_PKG_NAME");

#[derive(Parser)]
#[command(name = "atelier")]
#[command(version = VERSION)]
#[command(about = "Atelier - conversations and read state for the studio dashboard")]
#[command(long_about = r#"
Atelier keeps the studio's conversations: threads between staff and clients,
their messages, unread badges and the request workflow.

Use 'atelier init' to prepare the database, then act as an identity with
'--as <uuid> --role <owner|assistant|client>'. 'atelier demo' runs a full
booking conversation in memory without a database.
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    caller: CallerArgs,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[arg(long, global = true, env = "ATELIER_LOG_JSON", help = "Emit logs as JSON")]
    log_json: bool,

    #[arg(
        short,
        long,
        global = true,
        default_value = "text",
        help = "Output format (text, json)"
    )]
    format: String,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Connect to the database and run migrations")]
    Init,

    #[command(about = "List conversations with unread counts")]
    Inbox(InboxArgs),

    #[command(about = "Create, inspect and update threads")]
    Thread {
        #[command(subcommand)]
        action: ThreadCommand,
    },

    #[command(about = "Append a message to a thread")]
    Send {
        #[arg(help = "Thread ID (UUID)")]
        thread_id: Uuid,

        #[arg(help = "Message body")]
        body: String,
    },

    #[command(about = "Mark a thread's messages as read for the caller")]
    Read {
        #[arg(help = "Thread ID (UUID)")]
        thread_id: Uuid,
    },

    #[command(about = "Request a booking, opening a request thread (clients)")]
    Request(RequestArgs),

    #[command(about = "Run an in-memory booking conversation")]
    Demo,

    #[command(about = "Show or initialize configuration")]
    Config {
        #[command(subcommand)]
        action: Option<ConfigCommand>,
    },

    #[command(about = "Show version information")]
    Version {
        #[arg(short, long)]
        detailed: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.log_json);

    match run(cli).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => match e.downcast_ref::<AtelierError>() {
            Some(err) => {
                eprint!("{}: {}", "Error".red().bold(), CliErrorDisplay::new(err));
                exit_code_for(err)
            }
            None => {
                eprintln!("{}: {:#}", "Error".red().bold(), e);
                ExitCode::FAILURE
            }
        },
    }
}

/// Rejected requests exit with 2, everything else with 1.
fn exit_code_for(err: &AtelierError) -> ExitCode {
    if err.is_client_error() {
        ExitCode::from(2)
    } else {
        ExitCode::FAILURE
    }
}

fn init_logging(verbose: bool, json: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().with_target(false)).init();
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let caller = cli.caller;
    let format = cli.format;

    match cli.command {
        Commands::Init => cmd_init().await,
        Commands::Inbox(args) => cmd_inbox(&caller, &args, &format).await,
        Commands::Thread { action } => handle_thread_command(&caller, action, &format).await,
        Commands::Send { thread_id, body } => cmd_send(&caller, thread_id, &body, &format).await,
        Commands::Read { thread_id } => cmd_read(&caller, thread_id, &format).await,
        Commands::Request(args) => cmd_request(&caller, &args, &format).await,
        Commands::Demo => cmd_demo(&format).await,
        Commands::Config { action } => handle_config_command(action, &format).await,
        Commands::Version { detailed } => cmd_version(detailed),
    }
}

async fn cmd_init() -> anyhow::Result<()> {
    println!("{}", "Initializing Atelier...".cyan().bold());
    println!();

    let config = CliConfig::load()?;
    println!(
        "  {} Database URL: {}",
        "→".blue(),
        mask_password(config.database_url())
    );

    println!("  {} Connecting to database...", "→".blue());
    let db = Database::connect(&config.settings.to_database_config())
        .await
        .map_err(AtelierError::from)?;

    println!("  {} Running migrations...", "→".blue());
    db.run_migrations().await.map_err(AtelierError::from)?;

    println!("  {} Verifying connection...", "→".blue());
    db.health_check().await.map_err(AtelierError::from)?;

    let status = db.status().await.map_err(AtelierError::from)?;
    println!(
        "    Migrations: {}/{} applied, pool {} open ({} idle)",
        status.migrations_applied, status.migrations_known, status.size, status.idle
    );
    if !status.is_schema_current() {
        println!("    {} Schema is behind the embedded migrations", "!".yellow());
    }

    db.close().await;

    println!();
    println!(
        "{} {}",
        "✓".green().bold(),
        "Database initialized successfully!".green()
    );

    Ok(())
}

fn cmd_version(detailed: bool) -> anyhow::Result<()> {
    if detailed {
        println!("{}", "Atelier Version Information".cyan().bold());
        println!("{}", "═".repeat(40).dimmed());
        println!("  {:<15} {}", "Version:".bold(), VERSION);
        println!("  {:<15} {}", "Name:".bold(), NAME);
        println!("  {:<15} Apache-2.0", "License:".bold());
        println!();
        println!("  {}", "Build Information:".bold());
        println!("    Rust Edition: 2021");
        #[cfg(debug_assertions)]
        println!("    Build:        Debug");
        #[cfg(not(debug_assertions))]
        println!("    Build:        Release");
    } else {
        println!("atelier {}", VERSION);
    }

    Ok(())
}
