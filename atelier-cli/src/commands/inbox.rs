use atelier_core::{InboxFilter, ThreadStatus, ThreadSummary, ThreadType};
use clap::Args;
use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};

use super::{
    format_time, is_json, print_json, short_id, status_color, truncate, CallerArgs, Session,
};

#[derive(Args, Debug, Clone, Default)]
pub struct InboxArgs {
    #[arg(long, conflicts_with = "all", help = "Show archived threads instead of active ones")]
    pub archived: bool,

    #[arg(long, help = "Show active and archived threads")]
    pub all: bool,

    #[arg(long, help = "Only starred threads")]
    pub starred: bool,

    #[arg(long, help = "Only threads with unread messages")]
    pub unread: bool,

    #[arg(short, long, help = "Filter by status (new, pending, contacted, ...)")]
    pub status: Option<ThreadStatus>,

    #[arg(short = 't', long = "type", help = "Filter by thread type (request, inquiry, ...)")]
    pub thread_type: Option<ThreadType>,
}

impl InboxArgs {
    pub fn filter(&self) -> InboxFilter {
        let mut filter = if self.all {
            InboxFilter::all()
        } else if self.archived {
            InboxFilter::archived()
        } else {
            InboxFilter::default()
        };

        if self.starred {
            filter = filter.starred();
        }
        if self.unread {
            filter = filter.unread();
        }
        if let Some(status) = self.status {
            filter = filter.with_status(status);
        }
        if let Some(thread_type) = self.thread_type {
            filter = filter.with_type(thread_type);
        }
        filter
    }
}

pub async fn cmd_inbox(caller: &CallerArgs, args: &InboxArgs, format: &str) -> anyhow::Result<()> {
    let session = Session::open(caller).await?;
    let filter = args.filter();

    let summaries = session.service.inbox(session.caller(), &filter).await?;
    let total_unread = session.service.total_unread(session.caller()).await?;

    if is_json(format) {
        print_json(&serde_json::json!({
            "total_unread": total_unread,
            "threads": summaries,
        }))?;
    } else {
        render_inbox(
            &summaries,
            total_unread,
            session.settings.inbox.preview_chars,
        );
    }

    session.close().await;
    Ok(())
}

pub fn render_inbox(summaries: &[ThreadSummary], total_unread: i64, preview_chars: usize) {
    if summaries.is_empty() {
        println!("{}", "No conversations found.".yellow());
        println!(
            "{}",
            "Start one with 'atelier thread create' or 'atelier request'.".dimmed()
        );
        return;
    }

    let badge = if total_unread > 0 {
        format!("{} unread", total_unread).red().bold()
    } else {
        "all read".green()
    };
    println!("{} ({})", "Inbox".cyan().bold(), badge);
    println!();

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("ID").fg(Color::White),
            Cell::new("").fg(Color::White),
            Cell::new("Subject").fg(Color::White),
            Cell::new("Type").fg(Color::White),
            Cell::new("Status").fg(Color::White),
            Cell::new("Unread").fg(Color::White),
            Cell::new("Last Message").fg(Color::White),
            Cell::new("Updated").fg(Color::White),
        ]);

    for summary in summaries {
        let thread = &summary.thread;
        let mut markers = String::new();
        if thread.is_starred {
            markers.push('★');
        }
        if thread.is_closed {
            markers.push('⊘');
        }
        if thread.is_group {
            markers.push('⧉');
        }

        let unread_cell = if summary.has_unread() {
            Cell::new(summary.unread_count).fg(Color::Red)
        } else {
            Cell::new("-").fg(Color::DarkGrey)
        };

        table.add_row(vec![
            Cell::new(short_id(thread.id)).fg(Color::DarkGrey),
            Cell::new(markers).fg(Color::Yellow),
            Cell::new(truncate(&thread.subject, 32)),
            Cell::new(thread.thread_type.to_string()),
            Cell::new(thread.status.to_string()).fg(status_color(thread.status)),
            unread_cell,
            Cell::new(summary.preview(preview_chars).replace('\n', " ")),
            Cell::new(format_time(thread.last_message_at)),
        ]);
    }

    println!("{table}");
    println!();
    println!("  {} {}", "Threads:".dimmed(), summaries.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use atelier_core::ArchiveFilter;

    #[test]
    fn test_default_args_show_active_threads() {
        let filter = InboxArgs::default().filter();
        assert_eq!(filter, InboxFilter::default());
        assert_eq!(filter.archived, ArchiveFilter::Active);
    }

    #[test]
    fn test_args_build_combined_filter() {
        let args = InboxArgs {
            all: true,
            starred: true,
            unread: true,
            status: Some(ThreadStatus::Contacted),
            thread_type: Some(ThreadType::Request),
            ..Default::default()
        };
        let filter = args.filter();

        assert_eq!(filter.archived, ArchiveFilter::All);
        assert!(filter.starred_only);
        assert!(filter.unread_only);
        assert_eq!(filter.status, Some(ThreadStatus::Contacted));
        assert_eq!(filter.thread_type, Some(ThreadType::Request));
    }

    #[test]
    fn test_archived_flag() {
        let args = InboxArgs {
            archived: true,
            ..Default::default()
        };
        assert_eq!(args.filter().archived, ArchiveFilter::Archived);
    }
}
