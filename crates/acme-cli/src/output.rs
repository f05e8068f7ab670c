//! Output formatting for the CLI.

use acme_auth_client::ApiError;
use clap::ValueEnum;
use serde::Serialize;

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Print a serializable value as pretty JSON.
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error: failed to encode output: {}", e),
    }
}

/// Print a success message.
pub fn print_success(message: &str, format: &OutputFormat) {
    match format {
        OutputFormat::Text => println!("{}", message),
        OutputFormat::Json => print_json(&serde_json::json!({
            "status": "success",
            "message": message,
        })),
    }
}

/// Print an error message.
pub fn print_error(message: &str, format: &OutputFormat) {
    match format {
        OutputFormat::Text => eprintln!("Error: {}", message),
        OutputFormat::Json => eprintln!(
            "{}",
            serde_json::json!({"status": "error", "message": message})
        ),
    }
}

/// Print an auth service error, with field-level details when present.
pub fn print_api_error(context: &str, error: &ApiError, format: &OutputFormat) {
    match format {
        OutputFormat::Text => {
            eprintln!("Error: {}: {}", context, error.message);
            for detail in &error.details {
                eprintln!("  {}: {}", detail.field, detail.message);
            }
        }
        OutputFormat::Json => eprintln!(
            "{}",
            serde_json::json!({"status": "error", "message": context, "error": error})
        ),
    }
}

/// Print a table row.
pub fn print_row(label: &str, value: &str) {
    println!("  {:<10} {}", format!("{}:", label), value);
}

/// Join a list for display, `-` when empty.
pub fn list_or_dash(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}
