//! Cloud Storage Provider Contract
//!
//! The connector never talks to a provider API directly. The host injects a
//! [`ProviderClient`] that performs the three remote operations the connector
//! needs: identity lookup (used to validate a token), file upload, and the
//! optional refresh-token exchange.
//!
//! Providers classify their failures into [`ProviderError`] so the session
//! layer can tell an invalid credential apart from a flaky network.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classified provider failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The credential was rejected (revoked, expired, malformed)
    #[error("Provider rejected the credential: {0}")]
    AuthInvalid(String),

    /// Timeouts, connectivity loss, 5xx responses
    #[error("Transient provider failure: {0}")]
    Transient(String),

    /// Anything else (quota, bad path, unsupported operation)
    #[error("Provider error: {0}")]
    Other(String),
}

impl ProviderError {
    /// Whether the failure proves the credential is no longer usable.
    pub fn is_auth_invalid(&self) -> bool {
        matches!(self, ProviderError::AuthInvalid(_))
    }
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Account identity returned by a successful validation call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Provider-scoped account identifier
    pub account_id: String,
    /// Human-readable name, if the provider returns one
    pub display_name: Option<String>,
}

impl Identity {
    pub fn new(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

/// Result of a refresh-token exchange
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    /// Replacement refresh credential; `None` keeps the previous one
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Remote cloud-storage operations required by the connector
///
/// Every method receives the bearer token explicitly; implementations must
/// not cache credentials between calls.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::provider::{ProviderClient, ProviderError};
///
/// async fn check(client: &dyn ProviderClient, token: &str) -> bool {
///     match client.get_current_identity(token).await {
///         Ok(_) => true,
///         Err(ProviderError::AuthInvalid(_)) => false,
///         Err(_) => true, // transient: keep the session
///     }
/// }
/// ```
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Look up the account that owns `token`. Used to validate a stored session.
    async fn get_current_identity(&self, token: &str) -> ProviderResult<Identity>;

    /// Upload `bytes` to `remote_path`, overwriting any existing file.
    ///
    /// Returns the path the provider stored the file under.
    async fn upload(&self, token: &str, remote_path: &str, bytes: Bytes) -> ProviderResult<String>;

    /// Exchange a refresh credential for a new access token.
    ///
    /// Providers issuing long-lived tokens leave the default, which reports
    /// the operation as unsupported.
    async fn refresh_access_token(&self, _refresh_token: &str) -> ProviderResult<TokenGrant> {
        Err(ProviderError::Other(
            "token refresh is not supported by this provider".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct LongLivedProvider;

    #[async_trait]
    impl ProviderClient for LongLivedProvider {
        async fn get_current_identity(&self, _token: &str) -> ProviderResult<Identity> {
            Ok(Identity::new("dbid:1"))
        }

        async fn upload(
            &self,
            _token: &str,
            remote_path: &str,
            _bytes: Bytes,
        ) -> ProviderResult<String> {
            Ok(remote_path.to_string())
        }
    }

    #[tokio::test]
    async fn test_refresh_defaults_to_unsupported() {
        let provider = LongLivedProvider;
        let err = provider.refresh_access_token("r").await.unwrap_err();
        assert!(matches!(err, ProviderError::Other(_)));
        assert!(!err.is_auth_invalid());
    }

    #[test]
    fn test_token_grant_debug_redacts() {
        let grant = TokenGrant {
            access_token: "sl.secret".to_string(),
            refresh_token: Some("refresh-secret".to_string()),
            expires_at: None,
        };
        let debug = format!("{:?}", grant);
        assert!(!debug.contains("sl.secret"));
        assert!(!debug.contains("refresh-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_identity_builder() {
        let identity = Identity::new("dbid:42").with_display_name("Expenses");
        assert_eq!(identity.account_id, "dbid:42");
        assert_eq!(identity.display_name.as_deref(), Some("Expenses"));
    }
}
