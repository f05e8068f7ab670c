//! Authenticated requests against protected APIs.

use super::auth::restore;
use super::auth_required;
use crate::output::{self, OutputFormat};
use acme_auth_client::{AuthError, AuthenticatedClient, SessionController};
use anyhow::Result;
use std::sync::Arc;
use tracing::debug;

/// GET `url` with the session's bearer token and print the JSON body.
pub async fn get(session: Arc<SessionController>, url: &str, format: &OutputFormat) -> Result<()> {
    if let Some(e) = restore(&session).await {
        debug!(error = %e, "Session restore failed");
    }
    auth_required(&session)?;

    let client = AuthenticatedClient::new(session, reqwest::Client::new());

    match client.get_json::<serde_json::Value>(url).await {
        Ok(body) => {
            output::print_json(&body);
            Ok(())
        }
        Err(AuthError::Api(e)) => {
            output::print_api_error(&format!("GET {} failed", url), &e, format);
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}
