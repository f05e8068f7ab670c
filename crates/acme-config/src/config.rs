//! Configuration management.

use crate::{resolve_base_url, CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default interval between proactive expiry checks.
pub const DEFAULT_EXPIRY_CHECK_INTERVAL_SECS: u64 = 60;

/// Session client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Explicit auth service base URL. Takes precedence over origin detection.
    #[serde(default)]
    pub auth_url: Option<String>,
    /// Origin the hosting app is served from, used for cloud workspace detection.
    #[serde(default)]
    pub origin: Option<String>,
    /// Whether the session proactively refreshes tokens about to expire.
    #[serde(default = "default_auto_refresh")]
    pub auto_refresh: bool,
    /// Seconds between proactive expiry checks.
    #[serde(default = "default_expiry_check_interval_secs")]
    pub expiry_check_interval_secs: u64,
    /// Override for the persisted token file.
    #[serde(default)]
    pub token_file: Option<PathBuf>,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_auto_refresh() -> bool {
    true
}

fn default_expiry_check_interval_secs() -> u64 {
    DEFAULT_EXPIRY_CHECK_INTERVAL_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            auth_url: None,
            origin: None,
            auto_refresh: default_auto_refresh(),
            expiry_check_interval_secs: DEFAULT_EXPIRY_CHECK_INTERVAL_SECS,
            token_file: None,
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from the config file, falling back to defaults,
    /// then apply environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the config file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    fn load_from_env(&mut self) {
        self.apply_env_with(|name| std::env::var(name).ok());
    }

    /// Apply `ACME_*` overrides using the given variable lookup.
    fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(level) = non_empty("ACME_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(url) = non_empty("ACME_AUTH_URL") {
            self.auth_url = Some(url);
        }
        if let Some(origin) = non_empty("ACME_APP_ORIGIN") {
            self.origin = Some(origin);
        }
        if let Some(flag) = non_empty("ACME_AUTO_REFRESH") {
            match flag.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.auto_refresh = true,
                "0" | "false" | "no" | "off" => self.auto_refresh = false,
                other => tracing::warn!(value = %other, "Ignoring invalid ACME_AUTO_REFRESH"),
            }
        }
    }

    /// Resolve the auth service base URL.
    ///
    /// An explicit `auth_url` wins; otherwise the origin is inspected for a
    /// cloud workspace host. Trailing slashes are stripped.
    pub fn resolve_auth_url(&self) -> CoreResult<Url> {
        let raw = match &self.auth_url {
            Some(url) => url.clone(),
            None => resolve_base_url(self.origin.as_deref()),
        };
        let url = Url::parse(raw.trim_end_matches('/'))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(CoreError::Config(format!(
                "Auth URL must be http or https: {}",
                url
            )));
        }
        Ok(url)
    }

    /// Interval between proactive expiry checks.
    pub fn expiry_check_interval(&self) -> Duration {
        Duration::from_secs(self.expiry_check_interval_secs.max(1))
    }

    /// Token file location, honouring the override.
    pub fn token_file(&self, paths: &Paths) -> PathBuf {
        self.token_file
            .clone()
            .unwrap_or_else(|| paths.token_file())
    }
}
