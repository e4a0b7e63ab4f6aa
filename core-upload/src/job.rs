//! # Upload Job State Machine
//!
//! Lifecycle of a single upload with validated state transitions.
//!
//! ## State Machine
//!
//! ```text
//! Pending → InFlight → Succeeded
//!     ↓         ↓
//!     └──────→ Failed
//! ```
//!
//! A job goes in flight at most once. Retrying a capture creates a new job.
//!
//! ## Usage
//!
//! ```rust
//! use bytes::Bytes;
//! use chrono::Utc;
//! use core_upload::{UploadJob, UploadStatus};
//!
//! let mut job = UploadJob::new(Bytes::from_static(b"jpeg"), "receipt.jpg", Utc::now());
//! job.start().unwrap();
//! job.succeed("/dkexpenses/inbox/receipt.jpg").unwrap();
//!
//! assert!(job.start().is_err());
//! assert_eq!(job.status_text().as_deref(), Some("Success"));
//! ```

use crate::error::{Result, UploadError, UploadFailure};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status text recorded for a successful upload
pub const SUCCESS_STATUS: &str = "Success";

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for an upload job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UploadJobId(Uuid);

impl UploadJobId {
    /// Create a new random upload job ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an upload job ID from a string
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid UUID
    pub fn from_string(s: &str) -> Result<Self> {
        Ok(Self(
            Uuid::parse_str(s).map_err(|e| UploadError::InvalidJobId(e.to_string()))?,
        ))
    }
}

impl Default for UploadJobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UploadJobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Status Types
// ============================================================================

/// The current status of an upload job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadStatus {
    /// Created, not yet handed to the provider
    Pending,
    /// The provider call is running
    InFlight,
    /// Stored by the provider under `remote_path`
    Succeeded { remote_path: String },
    /// Gave up with `reason`
    Failed { reason: UploadFailure },
}

impl UploadStatus {
    /// Check if this status represents a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            UploadStatus::Succeeded { .. } | UploadStatus::Failed { .. }
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStatus::Pending => "pending",
            UploadStatus::InFlight => "in_flight",
            UploadStatus::Succeeded { .. } => "succeeded",
            UploadStatus::Failed { .. } => "failed",
        }
    }
}

impl std::fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Upload Job Entity
// ============================================================================

/// One attempt to store a capture with the provider.
///
/// Jobs live in memory only.
#[derive(Debug, Clone)]
pub struct UploadJob {
    /// Unique identifier for this job
    pub id: UploadJobId,
    /// File contents
    pub bytes: Bytes,
    /// File name under the remote upload folder
    pub destination_name: String,
    /// Current status
    pub status: UploadStatus,
    /// When the job was created
    pub created_at: DateTime<Utc>,
}

impl UploadJob {
    /// Create a new upload job in pending state
    pub fn new(bytes: Bytes, destination_name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: UploadJobId::new(),
            bytes,
            destination_name: destination_name.into(),
            status: UploadStatus::Pending,
            created_at,
        }
    }

    /// Hand the job to the provider
    ///
    /// # Errors
    ///
    /// Returns an error unless the job is `Pending`
    pub fn start(&mut self) -> Result<()> {
        self.validate_transition(&UploadStatus::InFlight)?;
        self.status = UploadStatus::InFlight;
        Ok(())
    }

    /// Mark the job as stored by the provider
    ///
    /// # Errors
    ///
    /// Returns an error unless the job is `InFlight`
    pub fn succeed(&mut self, remote_path: impl Into<String>) -> Result<()> {
        let status = UploadStatus::Succeeded {
            remote_path: remote_path.into(),
        };
        self.validate_transition(&status)?;
        self.status = status;
        Ok(())
    }

    /// Mark the job as failed
    ///
    /// # Errors
    ///
    /// Returns an error if the job is already terminal
    pub fn fail(&mut self, reason: UploadFailure) -> Result<()> {
        let status = UploadStatus::Failed { reason };
        self.validate_transition(&status)?;
        self.status = status;
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn remote_path(&self) -> Option<&str> {
        match &self.status {
            UploadStatus::Succeeded { remote_path } => Some(remote_path),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&UploadFailure> {
        match &self.status {
            UploadStatus::Failed { reason } => Some(reason),
            _ => None,
        }
    }

    /// Text shown next to the capture once the job is terminal.
    pub fn status_text(&self) -> Option<String> {
        match &self.status {
            UploadStatus::Succeeded { .. } => Some(SUCCESS_STATUS.to_string()),
            UploadStatus::Failed { reason } => Some(reason.to_string()),
            _ => None,
        }
    }

    /// Validate a state transition
    fn validate_transition(&self, to: &UploadStatus) -> Result<()> {
        let valid = matches!(
            (&self.status, to),
            (UploadStatus::Pending, UploadStatus::InFlight)
                | (UploadStatus::Pending, UploadStatus::Failed { .. })
                | (UploadStatus::InFlight, UploadStatus::Succeeded { .. })
                | (UploadStatus::InFlight, UploadStatus::Failed { .. })
        );

        if !valid {
            return Err(UploadError::InvalidStateTransition {
                from: self.status.as_str().to_string(),
                to: to.as_str().to_string(),
                reason: format!(
                    "Cannot transition from {} to {}",
                    self.status.as_str(),
                    to.as_str()
                ),
            });
        }

        Ok(())
    }
}

/// Checks that `name` is a single, non-empty path segment.
pub fn validate_destination_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(UploadError::InvalidDestination(
            "name is empty".to_string(),
        ));
    }

    if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
        return Err(UploadError::InvalidDestination(format!(
            "{} is not a single path segment",
            name
        )));
    }

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
