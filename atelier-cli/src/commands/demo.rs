use std::sync::Arc;

use atelier_core::{
    BookingRequest, HookConfig, HookManager, Identity, InboxFilter, MemoryInboxStore,
    MessagingService, StatusWorkflow, StudioService, SystemClock, ThreadStatus,
    ViewInvalidationHandler,
};
use colored::Colorize;

use super::inbox::render_inbox;
use super::thread::render_thread;
use super::{is_json, print_json, status_label};

const PREVIEW_CHARS: usize = 48;

/// Runs a booking conversation end to end against the in-memory store.
pub async fn cmd_demo(format: &str) -> anyhow::Result<()> {
    let store = Arc::new(MemoryInboxStore::new());
    let brows = StudioService::new("Brow Lamination", 45, 6_500);
    store.add_service(brows.clone()).await;

    let views = Arc::new(ViewInvalidationHandler::new());
    let hooks = Arc::new(HookManager::with_config(HookConfig::default()));
    hooks.register(views.clone()).await?;

    let service = MessagingService::new(
        store.clone(),
        Arc::new(SystemClock::new()),
        StatusWorkflow::default(),
    )
    .with_hooks(hooks.clone())
    .with_views(views);

    let owner = Identity::owner();
    let assistant = Identity::assistant();
    let client = Identity::client();
    let json = is_json(format);

    let step = |text: &str| {
        if !json {
            println!("  {} {}", "→".blue(), text);
        }
    };

    if !json {
        println!("{}", "Atelier Inbox Demo".cyan().bold());
        println!("{}", "═".repeat(40).dimmed());
        println!();
    }

    step("Client requests a booking");
    let (request_thread, booking) = service
        .create_from_booking_request(
            Some(&client),
            &BookingRequest::new(
                brows.id,
                "First time, sensitive skin.",
                "Tuesday or Thursday afternoon",
            ),
        )
        .await?;

    step("Owner opens an aftercare thread with the client and the assistant");
    let aftercare = service
        .create_thread(
            Some(&owner),
            "Aftercare notes",
            vec![client, assistant],
            "Keep brows dry for 24 hours.",
        )
        .await?;

    step("Owner replies to the booking request");
    service
        .append(
            Some(&owner),
            request_thread.id,
            "Thursday at 3pm works. See you then!",
        )
        .await?;

    let client_unread_before = service.total_unread(Some(&client)).await?;

    step("Client reads the reply");
    let marked = service
        .mark_thread_read(Some(&client), request_thread.id)
        .await?;

    step("Owner approves the request and stars the aftercare thread");
    service
        .set_status(Some(&owner), request_thread.id, ThreadStatus::Approved)
        .await?;
    service
        .set_starred(Some(&owner), aftercare.id, true)
        .await?;

    let owner_inbox = service.inbox(Some(&owner), &InboxFilter::default()).await?;
    let client_inbox = service
        .inbox(Some(&client), &InboxFilter::default())
        .await?;
    let detail = service.get_thread(Some(&owner), request_thread.id).await?;
    let invalidated = service.take_invalidated().await;
    let executions = hooks.get_recent_executions(100).await;

    if json {
        return print_json(&serde_json::json!({
            "booking": booking,
            "client_unread_before_read": client_unread_before,
            "marked_read": marked,
            "owner_inbox": owner_inbox,
            "client_inbox": client_inbox,
            "request_thread": detail,
            "invalidated_paths": invalidated,
            "hook_executions": executions.len(),
        }));
    }

    println!();
    println!(
        "  Client had {} unread before reading; {} marked read.",
        client_unread_before, marked
    );
    println!(
        "  Request thread is now {}.",
        status_label(detail.thread.status)
    );
    println!();

    println!("{}", "Owner view".yellow().bold());
    let owner_unread = service.total_unread(Some(&owner)).await?;
    render_inbox(&owner_inbox, owner_unread, PREVIEW_CHARS);
    println!();

    println!("{}", "Client view".yellow().bold());
    let client_unread = service.total_unread(Some(&client)).await?;
    render_inbox(&client_inbox, client_unread, PREVIEW_CHARS);
    println!();

    render_thread(&detail);
    println!();

    println!("{}", "Invalidated views".yellow().bold());
    for path in &invalidated {
        println!("    {} {}", "•".blue(), path);
    }
    println!();
    println!(
        "  {} {} hook executions recorded",
        "✓".green().bold(),
        executions.len()
    );

    Ok(())
}
