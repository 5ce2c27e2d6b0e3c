use colored::Colorize;
use uuid::Uuid;

use super::{format_time, is_json, print_json, short_id, CallerArgs, Session};

pub async fn cmd_send(
    caller: &CallerArgs,
    thread_id: Uuid,
    body: &str,
    format: &str,
) -> anyhow::Result<()> {
    let session = Session::open(caller).await?;
    let result = session.service.append(session.caller(), thread_id, body).await;
    session.close().await;
    let message = result?;

    if is_json(format) {
        return print_json(&message);
    }

    println!("{} {}", "✓".green().bold(), "Message sent".green());
    println!();
    println!("  {:<10} {}", "Thread:".bold(), message.thread_id);
    println!("  {:<10} #{}", "Seq:".bold(), message.seq);
    println!("  {:<10} {}", "Sent:".bold(), format_time(message.created_at));
    Ok(())
}

pub async fn cmd_read(caller: &CallerArgs, thread_id: Uuid, format: &str) -> anyhow::Result<()> {
    let session = Session::open(caller).await?;
    let result = session
        .service
        .mark_thread_read(session.caller(), thread_id)
        .await;
    session.close().await;
    let marked = result?;

    if is_json(format) {
        return print_json(&serde_json::json!({
            "thread_id": thread_id,
            "marked": marked,
        }));
    }

    if marked == 0 {
        println!(
            "  {} Nothing unread in thread {}",
            "○".yellow(),
            short_id(thread_id)
        );
    } else {
        println!(
            "{} Marked {} message(s) read in thread {}",
            "✓".green().bold(),
            marked,
            short_id(thread_id)
        );
    }
    Ok(())
}
