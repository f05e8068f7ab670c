//! Storage key constants.

/// Keys under which the token pair is persisted.
pub struct StorageKeys;

impl StorageKeys {
    /// Access token (JWT, stored verbatim)
    pub const ACCESS_TOKEN: &'static str = "accessToken";

    /// Refresh token (opaque, stored verbatim)
    pub const REFRESH_TOKEN: &'static str = "refreshToken";
}
