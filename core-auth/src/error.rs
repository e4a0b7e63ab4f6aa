use bridge_traits::{BridgeError, ProviderError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Not connected to the storage provider")]
    NotConnected,

    #[error("Session expired, reconnect required: {0}")]
    AuthExpired(String),

    #[error("Network failure talking to the provider: {0}")]
    TransientNetwork(String),

    #[error("Authorization cancelled by the user")]
    Cancelled,

    #[error("Secure storage fault: {0}")]
    StorageFault(String),

    #[error("Authorization failed: {0}")]
    AuthorizationFailed(String),

    #[error("Invalid redirect: {0}")]
    InvalidRedirect(String),

    #[error("Stored token is corrupted: {reason}")]
    TokenCorrupted { reason: String },

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl AuthError {
    /// Whether the user has to go through authorization again.
    pub fn requires_reconnect(&self) -> bool {
        matches!(self, AuthError::NotConnected | AuthError::AuthExpired(_))
    }
}

impl From<ProviderError> for AuthError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::AuthInvalid(reason) => AuthError::AuthExpired(reason),
            ProviderError::Transient(reason) => AuthError::TransientNetwork(reason),
            ProviderError::Other(reason) => AuthError::Other(reason),
        }
    }
}

impl From<BridgeError> for AuthError {
    fn from(err: BridgeError) -> Self {
        AuthError::StorageFault(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
