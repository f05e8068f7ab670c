//! Authentication error types.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error codes the auth service puts in its error envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    NotFound,
    Unauthorized,
    Forbidden,
    Conflict,
    InternalError,
    BadRequest,
    RateLimited,
    /// A code this client does not know about.
    #[serde(other)]
    Unknown,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::InternalError => "INTERNAL_ERROR",
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::RateLimited => "RATE_LIMITED",
            ErrorCode::Unknown => "UNKNOWN",
        }
    }

    /// Code used when a failed response carries no usable envelope.
    pub fn from_status(status: StatusCode) -> Self {
        match status.as_u16() {
            400 => ErrorCode::BadRequest,
            401 => ErrorCode::Unauthorized,
            403 => ErrorCode::Forbidden,
            404 => ErrorCode::NotFound,
            409 => ErrorCode::Conflict,
            422 => ErrorCode::ValidationError,
            429 => ErrorCode::RateLimited,
            _ => ErrorCode::InternalError,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
}

/// JSON body the auth service returns with any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default)]
    pub details: Option<Vec<FieldError>>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub request_id: Option<String>,
}

/// Typed domain error: the service's error envelope plus the HTTP status.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[error("{code}: {message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Vec<FieldError>,
    pub status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ApiError {
    pub fn from_envelope(envelope: ErrorResponse, status: StatusCode) -> Self {
        Self {
            code: envelope.code,
            message: envelope.message,
            details: envelope.details.unwrap_or_default(),
            status_code: status.as_u16(),
            timestamp: envelope.timestamp,
            path: envelope.path,
            request_id: envelope.request_id,
        }
    }

    /// Error built from the status line alone.
    pub fn from_status(status: StatusCode) -> Self {
        let message = status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

        Self {
            code: ErrorCode::from_status(status),
            message,
            details: Vec::new(),
            status_code: status.as_u16(),
            timestamp: None,
            path: None,
            request_id: None,
        }
    }

    /// Parse a body received with a non-2xx status.
    pub fn from_body(status: StatusCode, body: &str) -> Self {
        match serde_json::from_str::<ErrorResponse>(body) {
            Ok(envelope) => Self::from_envelope(envelope, status),
            Err(_) => Self::from_status(status),
        }
    }

    /// Consume a failed response. A body that cannot be read counts as empty.
    pub async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Self::from_body(status, &body)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.code == ErrorCode::Unauthorized || self.status_code == 401
    }
}

/// Authentication error type.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Non-2xx response from the auth service or a protected API
    #[error("{0}")]
    Api(#[from] ApiError),

    /// No access token for an authenticated request
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Refresh requested without a persisted refresh token
    #[error("No refresh token available")]
    NoRefreshToken,

    /// Refresh failed and the session was cleared
    #[error("Your session has expired. Please log in again.")]
    SessionExpired,

    /// Invalid state transition in the session FSM
    #[error("Invalid session state transition: {0}")]
    InvalidStateTransition(String),

    /// Request body is a stream and cannot be replayed
    #[error("Request cannot be retried because its body is not cloneable")]
    RequestNotCloneable,

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parse error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Header value rejected by the HTTP stack
    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] acme_token_store::StorageError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AuthError {
    /// The service error code, for API errors.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            AuthError::Api(e) => Some(e.code),
            _ => None,
        }
    }

    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            AuthError::Api(e) => Some(e),
            _ => None,
        }
    }

    /// Returns true for `UNAUTHORIZED`-coded or HTTP 401 errors.
    pub fn is_unauthorized(&self) -> bool {
        match self {
            AuthError::Api(e) => e.is_unauthorized(),
            AuthError::Http(e) => e.status() == Some(StatusCode::UNAUTHORIZED),
            _ => false,
        }
    }

    /// Returns true if this error is transient and the operation could be retried.
    ///
    /// Transient errors include:
    /// - Connection failures and timeouts
    /// - 5xx responses
    /// - `RATE_LIMITED` responses
    pub fn is_transient(&self) -> bool {
        match self {
            AuthError::Http(e) => {
                if e.is_connect() || e.is_timeout() {
                    return true;
                }
                if let Some(status) = e.status() {
                    return status.is_server_error();
                }
                false
            }
            AuthError::Api(e) => e.status_code >= 500 || e.code == ErrorCode::RateLimited,
            _ => false,
        }
    }
}

impl From<acme_config::CoreError> for AuthError {
    fn from(e: acme_config::CoreError) -> Self {
        AuthError::Config(e.to_string())
    }
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;
