use atelier_core::{AtelierError, BookingRequest, StudioService};
use clap::Args;
use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};
use uuid::Uuid;

use super::{is_json, print_json, CallerArgs, Session};

#[derive(Args, Debug, Clone)]
pub struct RequestArgs {
    #[arg(help = "Service ID (UUID); omit to list bookable services")]
    pub service_id: Option<Uuid>,

    #[arg(short, long, default_value = "", help = "Note for the studio")]
    pub message: String,

    #[arg(short, long, default_value = "", help = "Preferred dates, free text")]
    pub dates: String,
}

pub async fn cmd_request(
    caller: &CallerArgs,
    args: &RequestArgs,
    format: &str,
) -> anyhow::Result<()> {
    let session = Session::open(caller).await?;

    let result = match args.service_id {
        None => match session.store.services().get_active().await {
            Ok(services) => render_services(&services, format),
            Err(e) => Err(AtelierError::from(e).into()),
        },
        Some(service_id) => {
            let request = BookingRequest::new(service_id, &args.message, &args.dates);
            match session
                .service
                .create_from_booking_request(session.caller(), &request)
                .await
            {
                Ok((thread, booking)) if is_json(format) => print_json(&serde_json::json!({
                    "thread": thread,
                    "booking": booking,
                })),
                Ok((thread, booking)) => {
                    println!("{} {}", "✓".green().bold(), "Booking requested".green());
                    println!();
                    println!("  {:<10} {}", "Thread:".bold(), thread.id);
                    println!("  {:<10} {}", "Subject:".bold(), thread.subject);
                    println!("  {:<10} {}", "Booking:".bold(), booking.id);
                    println!("  {:<10} {}", "Status:".bold(), booking.status);
                    println!(
                        "  {:<10} {}",
                        "Total:".bold(),
                        format_price(booking.total_in_cents)
                    );
                    Ok(())
                }
                Err(e) => Err(e.into()),
            }
        }
    };

    session.close().await;
    result
}

fn render_services(services: &[StudioService], format: &str) -> anyhow::Result<()> {
    if is_json(format) {
        return print_json(&services);
    }

    if services.is_empty() {
        println!("{}", "No bookable services.".yellow());
        return Ok(());
    }

    println!("{}", "Bookable Services".cyan().bold());
    println!();

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("ID").fg(Color::White),
            Cell::new("Service").fg(Color::White),
            Cell::new("Duration").fg(Color::White),
            Cell::new("Price").fg(Color::White),
        ]);

    for service in services {
        table.add_row(vec![
            Cell::new(service.id).fg(Color::DarkGrey),
            Cell::new(&service.name).fg(Color::Cyan),
            Cell::new(format!("{} min", service.duration_minutes)),
            Cell::new(format_price(service.price_in_cents)).fg(Color::Green),
        ]);
    }

    println!("{table}");
    Ok(())
}

pub fn format_price(cents: i64) -> String {
    format!("${}.{:02}", cents / 100, (cents % 100).abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(6_500), "$65.00");
        assert_eq!(format_price(1_999), "$19.99");
        assert_eq!(format_price(5), "$0.05");
    }
}
