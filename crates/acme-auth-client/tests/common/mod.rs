#![allow(dead_code)]

use acme_auth_client::{AuthApiClient, SessionConfig, SessionController};
use acme_token_store::TokenStore;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use httpmock::MockServer;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// Unsigned JWT carrying `claims`.
pub fn mint_token(claims: Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{}.{}.c2lnbmF0dXJl", header, payload)
}

/// Token for ada@example.com expiring `expires_in_secs` from now (negative for the past).
pub fn token_expiring_in(expires_in_secs: i64, roles: &[&str]) -> String {
    let now = chrono::Utc::now().timestamp();
    mint_token(json!({
        "sub": "ada@example.com",
        "iat": now,
        "exp": now + expires_in_secs,
        "tenantId": "tenant-1",
        "roles": roles,
        "scopes": ["tickets:read", "tickets:write"]
    }))
}

pub fn valid_token(roles: &[&str]) -> String {
    token_expiring_in(3600, roles)
}

pub fn auth_body(access_token: &str, refresh_token: &str) -> Value {
    json!({
        "accessToken": access_token,
        "refreshToken": refresh_token,
        "tokenType": "Bearer",
        "expiresIn": 900
    })
}

pub fn user_body() -> Value {
    json!({
        "id": "3f2c6d0e-1b4a-4c1e-9a57-2d1f0c9b8e11",
        "email": "ada@example.com",
        "name": "Ada Lovelace",
        "createdAt": "2026-01-01T00:00:00Z",
        "updatedAt": "2026-01-01T00:00:00Z",
        "enabled": true,
        "tenantId": "tenant-1",
        "roles": ["ROLE_USER"]
    })
}

pub fn error_body(code: &str, message: &str) -> Value {
    json!({
        "code": code,
        "message": message,
        "timestamp": "2026-01-01T00:00:00Z",
        "path": "/api/auth"
    })
}

pub fn auth_base(server: &MockServer) -> String {
    server.url("/api/auth")
}

/// Controller without the expiry watch.
pub fn session(server: &MockServer, tokens: TokenStore) -> Arc<SessionController> {
    session_with(
        server,
        tokens,
        SessionConfig {
            auto_refresh: false,
            ..SessionConfig::default()
        },
    )
}

pub fn session_with(
    server: &MockServer,
    tokens: TokenStore,
    config: SessionConfig,
) -> Arc<SessionController> {
    let api = AuthApiClient::new(&auth_base(server)).unwrap();
    SessionController::new(api, tokens, config)
}

pub fn fast_watch() -> SessionConfig {
    SessionConfig {
        auto_refresh: true,
        expiry_check_interval: Duration::from_millis(50),
    }
}

pub fn stored_tokens(access_token: &str, refresh_token: &str) -> TokenStore {
    let tokens = TokenStore::in_memory();
    tokens.set_tokens(access_token, refresh_token);
    tokens
}
