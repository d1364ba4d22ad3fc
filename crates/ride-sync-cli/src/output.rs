//! Output formatting for the CLI.

use chrono::{DateTime, Local, Utc};
use clap::ValueEnum;
use ride_sync::{ConnectionStatus, Toast};
use ride_types::{RideMessage, RideSnapshot};
use serde::Serialize;

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Print a value as one JSON line.
fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error: failed to encode output: {}", e),
    }
}

/// Print a success message.
pub fn print_success(message: &str, format: OutputFormat) {
    match format {
        OutputFormat::Text => println!("{}", message),
        OutputFormat::Json => print_json(&serde_json::json!({
            "status": "success",
            "message": message,
        })),
    }
}

/// Print a row of label and value.
pub fn print_row(label: &str, value: &str) {
    println!("  {:<16} {}", format!("{}:", label), value);
}

fn time_or_dash(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Print the current ride row.
pub fn print_ride(ride: &RideSnapshot, format: OutputFormat) {
    match format {
        OutputFormat::Text => {
            println!("Ride {}", ride.id);
            print_row("Status", ride.status.as_str());
            let location = ride
                .location
                .map(|l| format!("{:.5}, {:.5}", l.latitude, l.longitude))
                .unwrap_or_else(|| "-".to_string());
            print_row("Location", &location);
            print_row("Scheduled", &time_or_dash(ride.scheduled_at));
            if let Some(driver) = &ride.driver_id {
                print_row("Driver", driver.as_str());
            }
            if !ride.cancellation.is_empty() {
                print_row(
                    "Cancelled by",
                    ride.cancellation
                        .cancelled_by
                        .as_ref()
                        .map(|id| id.as_str())
                        .unwrap_or("-"),
                );
                print_row(
                    "Reason",
                    ride.cancellation.reason.as_deref().unwrap_or("-"),
                );
            }
        }
        OutputFormat::Json => print_json(&serde_json::json!({ "ride": ride })),
    }
}

/// Print a connection status change.
pub fn print_status(status: ConnectionStatus, format: OutputFormat) {
    match format {
        OutputFormat::Text => println!("[{}]", status),
        OutputFormat::Json => print_json(&serde_json::json!({ "connection": status })),
    }
}

/// Print a toast as it appears.
pub fn print_toast(toast: &Toast, format: OutputFormat) {
    match format {
        OutputFormat::Text => println!("** {}: {}", toast.title, toast.body),
        OutputFormat::Json => print_json(&serde_json::json!({ "toast": toast })),
    }
}

/// Print a list of messages.
pub fn print_messages(messages: &[RideMessage], format: OutputFormat) {
    match format {
        OutputFormat::Text => {
            if messages.is_empty() {
                println!("No messages");
                return;
            }
            println!("{:<20} {:<36} {}", "Sent", "From", "Content");
            println!("{}", "-".repeat(80));
            for message in messages {
                println!(
                    "{:<20} {:<36} {}",
                    time_or_dash(message.created_at),
                    message.sender_id,
                    message.content
                );
            }
        }
        OutputFormat::Json => print_json(&serde_json::json!({ "messages": messages })),
    }
}
