use thiserror::Error;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Invalid job ID: {0}")]
    InvalidJobId(String),

    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidStateTransition {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Invalid destination name: {0}")]
    InvalidDestination(String),

    #[error("Capture log error: {0}")]
    CaptureLog(String),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, UploadError>;

/// Terminal reason of a failed upload job.
///
/// The `Display` text is what the user sees next to the capture.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadFailure {
    #[error("Not connected to the storage provider. Reconnect and try again.")]
    NotConnected,

    #[error("Session expired. Reconnect and try again.")]
    AuthExpired,

    #[error("Network error: {0}")]
    Transient(String),

    #[error("Upload failed: {0}")]
    Other(String),
}

impl UploadFailure {
    /// Whether the user has to reconnect before a retry can succeed.
    pub fn requires_reconnect(&self) -> bool {
        matches!(self, UploadFailure::NotConnected | UploadFailure::AuthExpired)
    }

    /// Whether retrying later without user action may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, UploadFailure::Transient(_))
    }
}
