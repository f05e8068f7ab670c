//! Logging initialization.
//!
//! Thin wrapper over the observability crate: structured JSONL to
//! `~/.acme-auth/logs/dev.jsonl`, level from `RUST_LOG` or the given default.

pub use observability::LogConfig;

const SERVICE_NAME: &str = "acme-auth";

/// Initialize logging for the acme-auth service.
///
/// Set `ACME_LOG_STDERR=1` to mirror logs to stderr.
pub fn init_logging(level: &str) {
    init_logging_for_service(SERVICE_NAME, level);
}

/// Initialize logging with a custom service name.
pub fn init_logging_for_service(service_name: &str, level: &str) {
    let also_stderr = std::env::var("ACME_LOG_STDERR")
        .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
        .unwrap_or(false);

    observability::init_with_config(LogConfig {
        service_name: service_name.into(),
        default_level: level.into(),
        also_stderr,
        ..Default::default()
    });
}

/// Parse a log level string into a tracing Level.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
