//! The token pair persisted between runs.

use crate::{KeyValueStorage, MemoryStorage, StorageKeys};
use tracing::{debug, warn};

/// Reader/writer of the persisted access and refresh tokens.
///
/// Storage failures never escape: reads that fail return `None` and writes
/// that fail are dropped, both with a warning.
pub struct TokenStore {
    storage: Box<dyn KeyValueStorage>,
}

impl TokenStore {
    pub fn new(storage: Box<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }

    /// Token store that forgets everything when the process exits.
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStorage::new()))
    }

    pub fn set_access_token(&self, token: &str) {
        self.write(StorageKeys::ACCESS_TOKEN, token);
    }

    pub fn get_access_token(&self) -> Option<String> {
        self.read(StorageKeys::ACCESS_TOKEN)
    }

    pub fn set_refresh_token(&self, token: &str) {
        self.write(StorageKeys::REFRESH_TOKEN, token);
    }

    pub fn get_refresh_token(&self) -> Option<String> {
        self.read(StorageKeys::REFRESH_TOKEN)
    }

    /// Persist a freshly issued pair.
    pub fn set_tokens(&self, access_token: &str, refresh_token: &str) {
        self.set_access_token(access_token);
        self.set_refresh_token(refresh_token);
    }

    /// Remove both tokens. Idempotent.
    pub fn clear_tokens(&self) {
        for key in [StorageKeys::ACCESS_TOKEN, StorageKeys::REFRESH_TOKEN] {
            if let Err(e) = self.storage.delete(key) {
                warn!(key = %key, error = %e, "Failed to remove token from storage");
            }
        }
        debug!("Cleared persisted tokens");
    }

    /// Whether an access token is persisted (valid or not).
    pub fn has_session(&self) -> bool {
        self.get_access_token().is_some()
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.storage.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read token from storage");
                None
            }
        }
    }

    fn write(&self, key: &str, value: &str) {
        if let Err(e) = self.storage.set(key, value) {
            warn!(key = %key, error = %e, "Failed to write token to storage");
        }
    }
}
