//! Errors reported by host bridges

use std::io;
use thiserror::Error;

/// Failure inside a host capability (keychain, filesystem, presenter).
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The capability is missing on this platform or build
    #[error("{0} is not available on this platform")]
    NotAvailable(String),

    /// The platform call was made and failed
    #[error("Platform call failed: {0}")]
    OperationFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl BridgeError {
    /// Whether the failure means the file does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, BridgeError::Io(e) if e.kind() == io::ErrorKind::NotFound)
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_detection() {
        let missing = BridgeError::from(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(missing.is_not_found());

        let denied = BridgeError::from(io::Error::new(io::ErrorKind::PermissionDenied, "no"));
        assert!(!denied.is_not_found());
        assert!(!BridgeError::OperationFailed("keychain locked".to_string()).is_not_found());
    }
}
