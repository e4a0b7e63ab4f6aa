//! # Capture Log
//!
//! Local, append-only record of every receipt captured on this device and
//! the outcome of its upload.
//!
//! The log is one JSON array stored in the app data directory. It is read in
//! full on load and rewritten in full on every change; memory is only
//! updated once the write succeeded. A missing or undecodable file starts an
//! empty log.

use crate::error::{Result, UploadError};
use bridge_traits::storage::FileSystemAccess;
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Extension of captured receipt images
pub const CAPTURE_EXTENSION: &str = "jpg";

/// One captured receipt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureLogEntry {
    /// When the receipt was captured
    pub timestamp: DateTime<Utc>,
    /// Local and remote file name
    pub filename: String,
    /// "Success" or the failure text of the latest upload attempt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// File name for a capture taken at `timestamp`: ISO-8601 plus `.jpg`.
pub fn capture_filename(timestamp: DateTime<Utc>) -> String {
    format!(
        "{}.{}",
        timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
        CAPTURE_EXTENSION
    )
}

/// Persistent capture log over the `FileSystemAccess` bridge
pub struct CaptureLog {
    fs: Arc<dyn FileSystemAccess>,
    file_name: String,
    entries: Mutex<Vec<CaptureLogEntry>>,
}

impl CaptureLog {
    /// Create an empty log backed by `file_name` in the data directory.
    ///
    /// Call [`load`](Self::load) to read existing entries.
    pub fn new(fs: Arc<dyn FileSystemAccess>, file_name: impl Into<String>) -> Self {
        Self {
            fs,
            file_name: file_name.into(),
            entries: Mutex::new(Vec::new()),
        }
    }

    async fn path(&self) -> Result<PathBuf> {
        let dir = self
            .fs
            .get_data_directory()
            .await
            .map_err(|e| UploadError::CaptureLog(e.to_string()))?;
        Ok(dir.join(&self.file_name))
    }

    /// Replace the in-memory log with the file contents.
    ///
    /// Returns the number of entries loaded.
    pub async fn load(&self) -> Result<usize> {
        let path = self.path().await?;
        let loaded = self.read_entries(&path).await;

        let count = loaded.len();
        *self.entries.lock().await = loaded;

        info!(entries = count, "Capture log loaded");
        Ok(count)
    }

    async fn read_entries(&self, path: &std::path::Path) -> Vec<CaptureLogEntry> {
        match self.fs.exists(path).await {
            Ok(true) => {}
            Ok(false) => {
                debug!("No capture log yet");
                return Vec::new();
            }
            Err(e) => {
                warn!(error = %e, "Could not check for capture log, starting empty");
                return Vec::new();
            }
        }

        let data = match self.fs.read_file(path).await {
            Ok(data) => data,
            Err(e) => {
                warn!(error = %e, "Could not read capture log, starting empty");
                return Vec::new();
            }
        };

        match serde_json::from_slice(&data) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "Capture log is corrupted, starting empty");
                Vec::new()
            }
        }
    }

    /// Append an entry for a new capture and persist the log.
    pub async fn record_capture(
        &self,
        filename: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Result<CaptureLogEntry> {
        let entry = CaptureLogEntry {
            timestamp,
            filename: filename.into(),
            status: None,
        };

        let mut entries = self.entries.lock().await;
        let mut updated = entries.clone();
        updated.push(entry.clone());
        self.persist(&updated).await?;
        *entries = updated;

        debug!(filename = %entry.filename, "Capture recorded");
        Ok(entry)
    }

    /// Set the upload status of the latest entry for `filename`.
    ///
    /// Returns `false` if no such entry exists.
    pub async fn record_status(&self, filename: &str, status: impl Into<String>) -> Result<bool> {
        let mut entries = self.entries.lock().await;
        let mut updated = entries.clone();

        let Some(entry) = updated.iter_mut().rev().find(|e| e.filename == filename) else {
            warn!(filename, "No capture log entry to update");
            return Ok(false);
        };
        entry.status = Some(status.into());

        self.persist(&updated).await?;
        *entries = updated;
        Ok(true)
    }

    /// All entries, oldest first
    pub async fn entries(&self) -> Vec<CaptureLogEntry> {
        self.entries.lock().await.clone()
    }

    /// Latest entry for `filename`
    pub async fn find(&self, filename: &str) -> Option<CaptureLogEntry> {
        self.entries
            .lock()
            .await
            .iter()
            .rev()
            .find(|e| e.filename == filename)
            .cloned()
    }

    async fn persist(&self, entries: &[CaptureLogEntry]) -> Result<()> {
        let json = serde_json::to_vec(entries)?;
        let path = self.path().await?;

        self.fs
            .write_file(&path, Bytes::from(json))
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to write capture log");
                UploadError::CaptureLog(e.to_string())
            })
    }
}
