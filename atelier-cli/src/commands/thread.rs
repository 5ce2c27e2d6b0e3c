use atelier_core::{Identity, Role, Thread, ThreadDetail, ThreadStatus};
use clap::Subcommand;
use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};
use uuid::Uuid;

use super::{format_time, is_json, print_json, short_id, status_label, CallerArgs, Session};

#[derive(Subcommand)]
pub enum ThreadCommand {
    #[command(about = "Show a thread with its participants and messages")]
    Show {
        #[arg(help = "Thread ID (UUID)")]
        thread_id: Uuid,
    },

    #[command(about = "Start a new thread with one or more participants")]
    Create {
        #[arg(help = "Thread subject")]
        subject: String,

        #[arg(
            short = 'p',
            long = "with",
            required = true,
            value_parser = parse_participant,
            help = "Participant as <uuid>[:role], repeatable; role defaults to client"
        )]
        participants: Vec<Identity>,

        #[arg(short, long, help = "First message of the thread")]
        body: String,
    },

    #[command(about = "Star or unstar a thread")]
    Star {
        #[arg(help = "Thread ID (UUID)")]
        thread_id: Uuid,

        #[arg(long, help = "Remove the star instead")]
        off: bool,
    },

    #[command(about = "Archive or restore a thread")]
    Archive {
        #[arg(help = "Thread ID (UUID)")]
        thread_id: Uuid,

        #[arg(long, help = "Move the thread back to the active inbox")]
        restore: bool,
    },

    #[command(about = "Close a thread to new messages, or reopen it")]
    Close {
        #[arg(help = "Thread ID (UUID)")]
        thread_id: Uuid,

        #[arg(long, help = "Reopen the thread instead")]
        reopen: bool,
    },

    #[command(about = "Move a thread to another workflow status (staff only)")]
    Status {
        #[arg(help = "Thread ID (UUID)")]
        thread_id: Uuid,

        #[arg(help = "Target status (new, pending, contacted, approved, rejected, resolved)")]
        status: ThreadStatus,
    },
}

pub async fn handle_thread_command(
    caller: &CallerArgs,
    cmd: ThreadCommand,
    format: &str,
) -> anyhow::Result<()> {
    let session = Session::open(caller).await?;
    let service = &session.service;
    let who = session.caller();

    let result = match cmd {
        ThreadCommand::Show { thread_id } => {
            let detail = service.get_thread(who, thread_id).await?;
            if is_json(format) {
                print_json(&detail)?;
            } else {
                render_thread(&detail);
            }
            Ok(())
        }
        ThreadCommand::Create {
            subject,
            participants,
            body,
        } => {
            let thread = service
                .create_thread(who, &subject, participants, &body)
                .await?;
            report_thread("Thread created", &thread, format)
        }
        ThreadCommand::Star { thread_id, off } => {
            let thread = service.set_starred(who, thread_id, !off).await?;
            let action = if off { "Star removed" } else { "Thread starred" };
            report_thread(action, &thread, format)
        }
        ThreadCommand::Archive { thread_id, restore } => {
            let thread = service.set_archived(who, thread_id, !restore).await?;
            let action = if restore {
                "Thread restored"
            } else {
                "Thread archived"
            };
            report_thread(action, &thread, format)
        }
        ThreadCommand::Close { thread_id, reopen } => {
            let thread = service.set_closed(who, thread_id, !reopen).await?;
            let action = if reopen {
                "Thread reopened"
            } else {
                "Thread closed"
            };
            report_thread(action, &thread, format)
        }
        ThreadCommand::Status { thread_id, status } => {
            let thread = service.set_status(who, thread_id, status).await?;
            report_thread("Status updated", &thread, format)
        }
    };

    session.close().await;
    result
}

/// Parses `<uuid>` or `<uuid>:<role>`.
pub fn parse_participant(value: &str) -> Result<Identity, String> {
    let (id, role) = match value.split_once(':') {
        Some((id, role)) => (id, role.parse::<Role>()?),
        None => (value, Role::Client),
    };

    let id = Uuid::parse_str(id.trim()).map_err(|e| format!("Invalid participant id: {}", e))?;
    Ok(Identity::new(id, role))
}

fn report_thread(action: &str, thread: &Thread, format: &str) -> anyhow::Result<()> {
    if is_json(format) {
        return print_json(thread);
    }

    println!("{} {}", "✓".green().bold(), action.green());
    println!();
    print_thread_header(thread);
    Ok(())
}

fn print_thread_header(thread: &Thread) {
    println!("  {:<12} {}", "ID:".bold(), thread.id);
    println!("  {:<12} {}", "Subject:".bold(), thread.subject);
    println!("  {:<12} {}", "Type:".bold(), thread.thread_type);
    println!("  {:<12} {}", "Status:".bold(), status_label(thread.status));

    let mut flags = Vec::new();
    if thread.is_starred {
        flags.push("starred");
    }
    if thread.is_archived {
        flags.push("archived");
    }
    if thread.is_closed {
        flags.push("closed");
    }
    if thread.is_group {
        flags.push("group");
    }
    if !flags.is_empty() {
        println!("  {:<12} {}", "Flags:".bold(), flags.join(", "));
    }
    if let Some(booking_id) = thread.booking_id {
        println!("  {:<12} {}", "Booking:".bold(), booking_id);
    }
    println!(
        "  {:<12} {}",
        "Last activity:".bold(),
        format_time(thread.last_message_at)
    );
}

pub fn render_thread(detail: &ThreadDetail) {
    println!("{}", detail.thread.subject.cyan().bold());
    println!("{}", "═".repeat(50).dimmed());
    print_thread_header(&detail.thread);
    println!();

    println!("  {}", "Participants".yellow().bold());
    for participant in &detail.participants {
        println!(
            "    {} {} ({})",
            "•".blue(),
            participant.id,
            participant.role
        );
    }
    println!();

    if detail.messages.is_empty() {
        println!("  {}", "No messages yet.".dimmed());
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("#").fg(Color::White),
            Cell::new("Sent").fg(Color::White),
            Cell::new("From").fg(Color::White),
            Cell::new("Message").fg(Color::White),
            Cell::new("Read").fg(Color::White),
        ]);

    for message in &detail.messages {
        let read_cell = match message.read_at {
            Some(at) if message.is_read => Cell::new(format_time(at)).fg(Color::Green),
            _ => Cell::new("unread").fg(Color::Yellow),
        };

        table.add_row(vec![
            Cell::new(message.seq).fg(Color::DarkGrey),
            Cell::new(format_time(message.created_at)),
            Cell::new(short_id(message.sender_id)),
            Cell::new(&message.body),
            read_cell,
        ]);
    }

    println!("{table}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_participant_defaults_to_client() {
        let id = Uuid::new_v4();
        let identity = parse_participant(&id.to_string()).unwrap();
        assert_eq!(identity.id, id);
        assert_eq!(identity.role, Role::Client);
    }

    #[test]
    fn test_parse_participant_with_role() {
        let id = Uuid::new_v4();
        let identity = parse_participant(&format!("{}:assistant", id)).unwrap();
        assert_eq!(identity.role, Role::Assistant);
        assert!(identity.is_staff());
    }

    #[test]
    fn test_parse_participant_rejects_garbage() {
        assert!(parse_participant("not-a-uuid").is_err());
        assert!(parse_participant(&format!("{}:landlord", Uuid::new_v4())).is_err());
    }
}
