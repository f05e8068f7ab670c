//! CLI command implementations.

mod auth;
mod request;

pub use auth::{login, logout, refresh, signup, status, whoami};
pub use request::get;

use acme_auth_client::{AuthApiClient, SessionConfig, SessionController};
use acme_config::{Config, Paths};
use acme_token_store::{FileStorage, TokenStore};
use anyhow::Result;
use std::io::{self, Write};
use std::sync::Arc;
use tracing::debug;

/// Build the session controller backed by the token file.
///
/// The CLI exits after each command, so the expiry watch is never started.
pub fn open_session(config: &Config) -> Result<Arc<SessionController>> {
    let paths = Paths::new()?;
    paths.ensure_dirs()?;

    let token_file = config.token_file(&paths);
    debug!(path = %token_file.display(), "Using token file");

    let tokens = TokenStore::new(Box::new(FileStorage::new(token_file)));
    let api = AuthApiClient::from_config(config)?;
    debug!(url = %api.base_url(), "Using auth service");

    let session_config = SessionConfig {
        auto_refresh: false,
        ..SessionConfig::from(config)
    };
    Ok(SessionController::new(api, tokens, session_config))
}

/// Fail unless a session is active.
fn auth_required(session: &SessionController) -> Result<()> {
    if !session.is_authenticated() {
        anyhow::bail!("Not logged in. Run 'acme-auth login' first");
    }
    Ok(())
}

/// Read a non-empty line from stdin after printing `label`.
fn prompt(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;

    let mut value = String::new();
    io::stdin().read_line(&mut value)?;
    let value = value.trim().to_string();

    if value.is_empty() {
        anyhow::bail!("{} is required", label);
    }
    Ok(value)
}

/// Read a password without echo.
fn prompt_password() -> Result<String> {
    let password = rpassword::prompt_password("Password: ")?;
    if password.is_empty() {
        anyhow::bail!("Password is required");
    }
    Ok(password)
}
