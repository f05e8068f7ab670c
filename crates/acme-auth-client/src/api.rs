//! Typed HTTP calls to the auth service.

use crate::error::{ApiError, AuthError, AuthResult};
use crate::types::{AuthResponse, LoginRequest, RefreshTokenRequest, SignupRequest, UserResponse};
use acme_config::Config;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

/// Client for the auth service endpoints.
///
/// Non-2xx responses become [`AuthError::Api`]. Transport failures propagate
/// as [`AuthError::Http`]. Nothing here retries or times out on its own.
#[derive(Clone)]
pub struct AuthApiClient {
    http_client: Client,
    base_url: String,
}

impl AuthApiClient {
    /// Create a client for the given base URL, e.g. `http://localhost:8081/api/auth`.
    pub fn new(base_url: &str) -> AuthResult<Self> {
        Self::with_client(base_url, Client::new())
    }

    /// Create a client sharing an existing HTTP connection pool.
    pub fn with_client(base_url: &str, http_client: Client) -> AuthResult<Self> {
        let parsed = Url::parse(base_url)?;
        if parsed.cannot_be_a_base() {
            return Err(AuthError::Config(format!(
                "Auth URL cannot be used as a base: {}",
                base_url
            )));
        }

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a client for the auth URL the configuration resolves to.
    pub fn from_config(config: &Config) -> AuthResult<Self> {
        let url = config.resolve_auth_url()?;
        Self::new(url.as_str())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn signup(&self, request: &SignupRequest) -> AuthResult<AuthResponse> {
        debug!(email = %request.email, tenant = %request.tenant_slug, "Signing up");
        self.post("/signup", request).await
    }

    pub async fn login(&self, request: &LoginRequest) -> AuthResult<AuthResponse> {
        debug!(email = %request.email, "Logging in");
        self.post("/login", request).await
    }

    pub async fn refresh_token(&self, request: &RefreshTokenRequest) -> AuthResult<AuthResponse> {
        debug!("Refreshing access token");
        self.post("/refresh", request).await
    }

    pub async fn get_current_user(&self, access_token: &str) -> AuthResult<UserResponse> {
        let url = self.endpoint("/me");
        debug!(url = %url, "Fetching current user");

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(access_token)
            .header("Accept", "application/json")
            .send()
            .await?;

        Self::parse_response(response).await
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> AuthResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path);

        let response = self
            .http_client
            .post(&url)
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    async fn parse_response<T: DeserializeOwned>(response: Response) -> AuthResult<T> {
        let status = response.status();
        if !status.is_success() {
            let url = response.url().clone();
            let error = ApiError::from_response(response).await;
            warn!(
                url = %url,
                status = %status,
                code = %error.code,
                message = %error.message,
                "Auth service request failed"
            );
            return Err(AuthError::Api(error));
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use httpmock::prelude::*;
    use serde_json::json;

    fn auth_body() -> serde_json::Value {
        json!({
            "accessToken": "A",
            "refreshToken": "B",
            "tokenType": "Bearer",
            "expiresIn": 900
        })
    }

    fn client_for(server: &MockServer) -> AuthApiClient {
        AuthApiClient::new(&server.url("/api/auth")).unwrap()
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = AuthApiClient::new("http://localhost:8081/api/auth/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8081/api/auth");
        assert_eq!(client.endpoint("/me"), "http://localhost:8081/api/auth/me");
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        assert!(matches!(
            AuthApiClient::new("not a url"),
            Err(AuthError::InvalidUrl(_))
        ));
        assert!(matches!(
            AuthApiClient::new("mailto:ada@example.com"),
            Err(AuthError::Config(_))
        ));
    }

    #[test]
    fn test_from_config_uses_explicit_url() {
        let config = Config {
            auth_url: Some("https://auth.acme.dev/api/auth".to_string()),
            ..Config::default()
        };

        let client = AuthApiClient::from_config(&config).unwrap();
        assert_eq!(client.base_url(), "https://auth.acme.dev/api/auth");
    }

    #[tokio::test]
    async fn test_login_posts_credentials() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/auth/login")
                    .json_body(json!({"email": "ada@example.com", "password": "hunter22"}));
                then.status(200).json_body(auth_body());
            })
            .await;

        let response = client_for(&server)
            .login(&LoginRequest::new("ada@example.com", "hunter22"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.access_token, "A");
        assert_eq!(response.refresh_token, "B");
        assert_eq!(response.token_type, "Bearer");
    }

    #[tokio::test]
    async fn test_signup_posts_tenant_slug() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/auth/signup").json_body(json!({
                    "email": "ada@example.com",
                    "password": "hunter22",
                    "name": "Ada",
                    "tenantSlug": "analytical"
                }));
                then.status(201).json_body(auth_body());
            })
            .await;

        let request = SignupRequest {
            email: "ada@example.com".to_string(),
            password: "hunter22".to_string(),
            name: "Ada".to_string(),
            tenant_slug: "analytical".to_string(),
        };
        let response = client_for(&server).signup(&request).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.access_token, "A");
    }

    #[tokio::test]
    async fn test_refresh_posts_refresh_token() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/auth/refresh")
                    .json_body(json!({"refreshToken": "B"}));
                then.status(200).json_body(auth_body());
            })
            .await;

        let response = client_for(&server)
            .refresh_token(&RefreshTokenRequest {
                refresh_token: "B".to_string(),
            })
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.access_token, "A");
    }

    #[tokio::test]
    async fn test_get_current_user_sends_bearer() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/auth/me")
                    .header("Authorization", "Bearer A");
                then.status(200).json_body(json!({
                    "id": "u-1",
                    "email": "ada@example.com",
                    "name": "Ada",
                    "createdAt": "2026-01-01T00:00:00Z",
                    "updatedAt": "2026-01-01T00:00:00Z",
                    "enabled": true,
                    "tenantId": "t-1",
                    "roles": ["ROLE_USER"]
                }));
            })
            .await;

        let user = client_for(&server).get_current_user("A").await.unwrap();

        mock.assert_async().await;
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.tenant_id.as_deref(), Some("t-1"));
    }

    #[tokio::test]
    async fn test_error_envelope_becomes_api_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/auth/login");
                then.status(401).json_body(json!({
                    "code": "UNAUTHORIZED",
                    "message": "Invalid email or password",
                    "timestamp": "2026-01-01T00:00:00Z",
                    "path": "/api/auth/login",
                    "requestId": "req-1"
                }));
            })
            .await;

        let err = client_for(&server)
            .login(&LoginRequest::new("ada@example.com", "wrong"))
            .await
            .unwrap_err();

        let api = err.api_error().unwrap();
        assert_eq!(api.code, ErrorCode::Unauthorized);
        assert_eq!(api.message, "Invalid email or password");
        assert_eq!(api.status_code, 401);
        assert_eq!(api.request_id.as_deref(), Some("req-1"));
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_validation_details_are_kept() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/auth/signup");
                then.status(400).json_body(json!({
                    "code": "VALIDATION_ERROR",
                    "message": "Validation failed",
                    "details": [
                        {"field": "password", "message": "size must be between 8 and 100", "code": "Size"}
                    ],
                    "timestamp": "2026-01-01T00:00:00Z"
                }));
            })
            .await;

        let request = SignupRequest {
            email: "ada@example.com".to_string(),
            password: "short".to_string(),
            name: "Ada".to_string(),
            tenant_slug: "analytical".to_string(),
        };
        let err = client_for(&server).signup(&request).await.unwrap_err();

        assert_eq!(err.code(), Some(ErrorCode::ValidationError));
        let details = &err.api_error().unwrap().details;
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].field, "password");
    }

    #[tokio::test]
    async fn test_non_json_error_body_is_synthesized() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/auth/me");
                then.status(503).body("upstream unavailable");
            })
            .await;

        let err = client_for(&server).get_current_user("A").await.unwrap_err();

        let api = err.api_error().unwrap();
        assert_eq!(api.code, ErrorCode::InternalError);
        assert_eq!(api.message, "Service Unavailable");
        assert_eq!(api.status_code, 503);
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_malformed_success_body_is_json_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/auth/login");
                then.status(200).body("not json");
            })
            .await;

        let err = client_for(&server)
            .login(&LoginRequest::new("ada@example.com", "hunter22"))
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::Json(_)));
    }

    #[tokio::test]
    async fn test_connection_failure_is_http_error() {
        // Nothing listens on port 9 locally.
        let client = AuthApiClient::new("http://127.0.0.1:9/api/auth").unwrap();

        let err = client.get_current_user("A").await.unwrap_err();

        assert!(matches!(err, AuthError::Http(_)));
        assert!(err.is_transient());
    }
}
