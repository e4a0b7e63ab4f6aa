//! Secure Token Storage
//!
//! Persists the single connector credential in the platform secure store
//! (Keychain, Secret Service, Credential Manager) via the `SecureStore` bridge.
//!
//! ## Security Features
//!
//! - Tokens are never logged or exposed in error messages
//! - The credential lives under one key: the application identifier
//! - Corrupted entries are erased on read
//!
//! ## Example
//!
//! ```no_run
//! use core_auth::{AccessToken, TokenStore};
//! use std::sync::Arc;
//! # use bridge_traits::storage::SecureStore;
//! # fn example(secure_store: Arc<dyn SecureStore>) -> core_auth::Result<()> {
//! let token_store = TokenStore::new(secure_store, "receipt-connector.session");
//!
//! token_store.save(&AccessToken::new("sl.abc"))?;
//! assert!(token_store.load()?.is_some());
//!
//! token_store.clear()?;
//! assert!(token_store.load()?.is_none());
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::types::AccessToken;
use bridge_traits::storage::SecureStore;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Secure storage for the connector token
///
/// All operations are synchronous; platform keychains answer without
/// suspending. "Not found" is reported as `None`, never as an error.
#[derive(Clone)]
pub struct TokenStore {
    secure_store: Arc<dyn SecureStore>,
    key: String,
}

impl TokenStore {
    /// Create a token store keyed by `app_identifier`
    pub fn new(secure_store: Arc<dyn SecureStore>, app_identifier: impl Into<String>) -> Self {
        let key = app_identifier.into();
        debug!(key = %key, "Initializing TokenStore");
        Self { secure_store, key }
    }

    /// Key the token is stored under
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Store the token, overwriting any previous one.
    pub fn save(&self, token: &AccessToken) -> Result<()> {
        let json = serde_json::to_vec(token).map_err(|e| {
            warn!(error = %e, "Failed to serialize token");
            AuthError::Serialization(e)
        })?;

        self.secure_store.set_secret(&self.key, &json).map_err(|e| {
            warn!(error = %e, "Failed to store token in secure storage");
            AuthError::StorageFault(e.to_string())
        })?;

        info!(
            has_refresh_token = token.refresh_token().is_some(),
            expires_at = ?token.expires_at(),
            "Token stored securely"
        );

        Ok(())
    }

    /// Load the stored token.
    ///
    /// Returns:
    /// - `Ok(Some(token))` if a valid token exists
    /// - `Ok(None)` if nothing was saved or it was cleared
    /// - `Err(TokenCorrupted)` if the entry could not be decoded; it is deleted
    /// - `Err(StorageFault)` if the secure store is unavailable
    pub fn load(&self) -> Result<Option<AccessToken>> {
        let data = self.secure_store.get_secret(&self.key).map_err(|e| {
            warn!(error = %e, "Failed to retrieve token from secure storage");
            AuthError::StorageFault(e.to_string())
        })?;

        let Some(data) = data else {
            debug!("No token found in storage");
            return Ok(None);
        };

        let token: AccessToken = match serde_json::from_slice(&data) {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Failed to deserialize token, it may be corrupted");

                if let Err(delete_err) = self.secure_store.delete_secret(&self.key) {
                    warn!(error = %delete_err, "Failed to delete corrupted token data");
                }

                return Err(AuthError::TokenCorrupted {
                    reason: e.to_string(),
                });
            }
        };

        info!(
            has_refresh_token = token.refresh_token().is_some(),
            expires_at = ?token.expires_at(),
            "Token retrieved successfully"
        );

        Ok(Some(token))
    }

    /// Erase the stored token. Idempotent.
    pub fn clear(&self) -> Result<()> {
        self.secure_store.delete_secret(&self.key).map_err(|e| {
            warn!(error = %e, "Failed to delete token from secure storage");
            AuthError::StorageFault(e.to_string())
        })?;

        info!("Token deleted securely");
        Ok(())
    }

    /// Check for a stored entry without decoding it
    pub fn has_token(&self) -> Result<bool> {
        self.secure_store.has_secret(&self.key).map_err(|e| {
            warn!(error = %e, "Failed to check token existence in secure storage");
            AuthError::StorageFault(e.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use chrono::{Duration, Utc};
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// Mock implementation of SecureStore for testing
    #[derive(Clone, Default)]
    struct MockSecureStore {
        storage: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl SecureStore for MockSecureStore {
        fn set_secret(&self, key: &str, value: &[u8]) -> BridgeResult<()> {
            self.storage.lock().insert(key.to_string(), value.to_vec());
            Ok(())
        }

        fn get_secret(&self, key: &str) -> BridgeResult<Option<Vec<u8>>> {
            Ok(self.storage.lock().get(key).cloned())
        }

        fn delete_secret(&self, key: &str) -> BridgeResult<()> {
            self.storage.lock().remove(key);
            Ok(())
        }
    }

    /// Secure store whose backend is gone
    struct UnavailableSecureStore;

    impl SecureStore for UnavailableSecureStore {
        fn set_secret(&self, _key: &str, _value: &[u8]) -> BridgeResult<()> {
            Err(BridgeError::NotAvailable("keychain locked".to_string()))
        }

        fn get_secret(&self, _key: &str) -> BridgeResult<Option<Vec<u8>>> {
            Err(BridgeError::NotAvailable("keychain locked".to_string()))
        }

        fn delete_secret(&self, _key: &str) -> BridgeResult<()> {
            Err(BridgeError::NotAvailable("keychain locked".to_string()))
        }
    }

    const KEY: &str = "receipt-connector.session";

    #[test]
    fn test_save_and_load() {
        let secure_store = Arc::new(MockSecureStore::default());
        let token_store = TokenStore::new(secure_store, KEY);

        let token = AccessToken::new("sl.access")
            .with_refresh_token("refresh")
            .with_expires_at(Utc::now() + Duration::hours(4));

        token_store.save(&token).expect("Failed to save token");

        let loaded = token_store
            .load()
            .expect("Failed to load token")
            .expect("Token not found");
        assert_eq!(loaded, token);
    }

    #[test]
    fn test_load_never_saved_is_none() {
        let token_store = TokenStore::new(Arc::new(MockSecureStore::default()), KEY);
        assert!(token_store.load().unwrap().is_none());
        assert!(!token_store.has_token().unwrap());
    }

    #[test]
    fn test_clear_then_load_is_none() {
        let token_store = TokenStore::new(Arc::new(MockSecureStore::default()), KEY);

        token_store.save(&AccessToken::new("sl.access")).unwrap();
        assert!(token_store.has_token().unwrap());

        token_store.clear().unwrap();
        assert!(token_store.load().unwrap().is_none());

        // Idempotent
        token_store.clear().unwrap();
    }

    #[test]
    fn test_save_overwrites() {
        let token_store = TokenStore::new(Arc::new(MockSecureStore::default()), KEY);

        token_store.save(&AccessToken::new("first")).unwrap();
        token_store.save(&AccessToken::new("second")).unwrap();

        assert_eq!(token_store.load().unwrap().unwrap().secret(), "second");
    }

    #[test]
    fn test_stored_under_application_identifier() {
        let secure_store = Arc::new(MockSecureStore::default());
        let token_store = TokenStore::new(secure_store.clone(), KEY);

        token_store.save(&AccessToken::new("sl.access")).unwrap();

        let storage = secure_store.storage.lock();
        assert_eq!(storage.len(), 1);
        assert!(storage.contains_key(KEY));
    }

    #[test]
    fn test_corrupted_token_is_deleted() {
        let secure_store = Arc::new(MockSecureStore::default());
        secure_store
            .set_secret(KEY, b"not json at all")
            .unwrap();

        let token_store = TokenStore::new(secure_store.clone(), KEY);
        let result = token_store.load();

        assert!(matches!(result, Err(AuthError::TokenCorrupted { .. })));
        assert!(secure_store.get_secret(KEY).unwrap().is_none());
        assert!(token_store.load().unwrap().is_none());
    }

    #[test]
    fn test_storage_fault() {
        let token_store = TokenStore::new(Arc::new(UnavailableSecureStore), KEY);

        assert!(matches!(
            token_store.save(&AccessToken::new("sl.access")),
            Err(AuthError::StorageFault(_))
        ));
        assert!(matches!(token_store.load(), Err(AuthError::StorageFault(_))));
        assert!(matches!(token_store.clear(), Err(AuthError::StorageFault(_))));
    }
}
