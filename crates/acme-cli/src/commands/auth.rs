//! Authentication commands.

use super::{auth_required, prompt, prompt_password};
use crate::output::{self, OutputFormat};
use acme_auth_client::{AuthError, LoginRequest, SessionController, SignupRequest};
use acme_token_store::decode_token;
use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Status report, as printed by `status`.
#[derive(Debug, Serialize)]
struct StatusReport {
    logged_in: bool,
    phase: String,
    email: Option<String>,
    tenant_id: Option<String>,
    roles: Vec<String>,
    scopes: Vec<String>,
    expires_at: Option<String>,
    error: Option<String>,
}

/// Restore the persisted session. Startup errors are returned, not raised.
pub(super) async fn restore(session: &SessionController) -> Option<AuthError> {
    match session.initialize().await {
        Ok(restored) => {
            debug!(restored, "Startup check finished");
            None
        }
        Err(e) => Some(e),
    }
}

fn report_auth_error(context: &str, error: &AuthError, format: &OutputFormat) {
    match error.api_error() {
        Some(api_error) => output::print_api_error(context, api_error, format),
        None => output::print_error(&format!("{}: {}", context, error), format),
    }
}

/// Login with email and password.
pub async fn login(
    session: Arc<SessionController>,
    email: Option<String>,
    format: &OutputFormat,
) -> Result<()> {
    restore(&session).await;
    if let Some(user) = session.user() {
        output::print_success(&format!("Already logged in as {}", user.email), format);
        return Ok(());
    }

    let email = match email {
        Some(email) => email,
        None => prompt("Email")?,
    };
    let password = prompt_password()?;

    match session.login(&LoginRequest::new(email, password)).await {
        Ok(user) => {
            output::print_success(&format!("Logged in as {}", user.email), format);
            Ok(())
        }
        Err(e) => {
            report_auth_error("Login failed", &e, format);
            std::process::exit(1);
        }
    }
}

/// Create an account and log in to it.
pub async fn signup(
    session: Arc<SessionController>,
    name: String,
    tenant: String,
    email: Option<String>,
    format: &OutputFormat,
) -> Result<()> {
    let email = match email {
        Some(email) => email,
        None => prompt("Email")?,
    };
    let password = prompt_password()?;

    let request = SignupRequest {
        email,
        password,
        name,
        tenant_slug: tenant,
    };

    match session.signup(&request).await {
        Ok(user) => {
            output::print_success(
                &format!("Account created, logged in as {}", user.email),
                format,
            );
            Ok(())
        }
        Err(e) => {
            report_auth_error("Signup failed", &e, format);
            std::process::exit(1);
        }
    }
}

/// Logout and clear the persisted session.
pub async fn logout(session: Arc<SessionController>, format: &OutputFormat) -> Result<()> {
    session.logout();
    output::print_success("Logged out successfully", format);
    Ok(())
}

/// Show the current session.
pub async fn status(session: Arc<SessionController>, format: &OutputFormat) -> Result<()> {
    let startup_error = restore(&session).await;
    let snapshot = session.snapshot();

    let expires_at = session
        .access_token()
        .and_then(|token| decode_token(&token))
        .and_then(|claims| claims.expires_at())
        .map(|at| at.to_rfc3339());

    let report = StatusReport {
        logged_in: snapshot.is_authenticated,
        phase: snapshot.phase.to_string(),
        email: snapshot.user.as_ref().map(|u| u.email.clone()),
        tenant_id: snapshot.tenant_id.clone(),
        roles: snapshot.roles.clone(),
        scopes: snapshot.scopes.clone(),
        expires_at,
        error: startup_error.map(|e| e.to_string()),
    };

    match format {
        OutputFormat::Json => output::print_json(&report),
        OutputFormat::Text => {
            if report.logged_in {
                println!("Auth:     logged in");
                output::print_row("Email", report.email.as_deref().unwrap_or("unknown"));
                output::print_row("Tenant", report.tenant_id.as_deref().unwrap_or("-"));
                output::print_row("Roles", &output::list_or_dash(&report.roles));
                output::print_row("Scopes", &output::list_or_dash(&report.scopes));
                output::print_row("Expires", report.expires_at.as_deref().unwrap_or("unknown"));
            } else {
                println!("Auth:     not logged in");
            }
            if let Some(error) = &report.error {
                output::print_row("Warning", error);
            }
        }
    }

    Ok(())
}

/// Print the current user as reported by the auth service.
pub async fn whoami(session: Arc<SessionController>, format: &OutputFormat) -> Result<()> {
    if let Some(e) = restore(&session).await {
        report_auth_error("Could not restore session", &e, format);
    }

    auth_required(&session)?;
    let user = session
        .user()
        .ok_or_else(|| anyhow::anyhow!("Session has no user"))?;

    match format {
        OutputFormat::Json => output::print_json(&user),
        OutputFormat::Text => {
            output::print_row("Name", &user.name);
            output::print_row("Email", &user.email);
            output::print_row("ID", &user.id);
            output::print_row("Tenant", user.tenant_id.as_deref().unwrap_or("-"));
            output::print_row(
                "Roles",
                &output::list_or_dash(user.roles.as_deref().unwrap_or_default()),
            );
            output::print_row("Enabled", if user.enabled { "yes" } else { "no" });
        }
    }

    Ok(())
}

/// Exchange the refresh token for a new access token.
pub async fn refresh(session: Arc<SessionController>, format: &OutputFormat) -> Result<()> {
    match session.refresh_access_token().await {
        Ok(()) => {
            output::print_success("Access token refreshed", format);
            Ok(())
        }
        Err(AuthError::NoRefreshToken) => {
            anyhow::bail!("Not logged in. Run 'acme-auth login' first")
        }
        Err(e) => {
            report_auth_error("Refresh failed, session cleared", &e, format);
            std::process::exit(1);
        }
    }
}
