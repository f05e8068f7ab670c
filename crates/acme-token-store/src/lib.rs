//! Persisted token pair and JWT claim decoding.
//!
//! This crate provides:
//! - A key/value storage abstraction with in-memory and file backends
//! - [`TokenStore`], the only reader/writer of the persisted access and
//!   refresh tokens
//! - Unverified decoding of access token claims
//!
//! # Claims are advisory
//!
//! [`decode_token`] and everything built on it read the JWT payload
//! **without verifying its signature**. The result is only fit for display
//! and UX decisions (showing a role badge, hiding a button, scheduling a
//! refresh). It is not an authorization check: every protected operation
//! must be re-validated by the auth service.

mod claims;
mod file;
mod keys;
mod memory;
mod store;
mod traits;

pub use claims::{
    decode_token, email_from_token, is_token_expired, is_token_expired_at,
    is_token_expiring_soon, is_token_expiring_soon_at, roles_from_token, scopes_from_token,
    tenant_id_from_token, TokenClaims, EXPIRY_WARNING_WINDOW_SECS,
};
pub use file::FileStorage;
pub use keys::StorageKeys;
pub use memory::MemoryStorage;
pub use store::TokenStore;
pub use traits::KeyValueStorage;

use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend-specific failure (unavailable, quota exceeded, ...)
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
