//! Configuration, paths and logging setup for the acme session crates.

mod base_url;
mod config;
mod error;
mod logging;
mod paths;

pub use base_url::{resolve_base_url, AUTH_API_PATH, AUTH_SERVICE_PORT, DEFAULT_AUTH_URL};
pub use config::{Config, DEFAULT_EXPIRY_CHECK_INTERVAL_SECS, DEFAULT_LOG_LEVEL};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, init_logging_for_service, parse_level};
pub use paths::Paths;
