//! Integration tests for the capture log on a real filesystem

use async_trait::async_trait;
use bridge_desktop::TokioFileSystem;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::storage::FileSystemAccess;
use bytes::Bytes;
use chrono::{TimeZone, Utc};
use core_upload::{capture_filename, CaptureLog};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const LOG_FILE: &str = "capture_logs.json";

/// Real filesystem whose writes can be switched off.
struct FlakyFileSystem {
    inner: TokioFileSystem,
    fail_writes: AtomicBool,
}

#[async_trait]
impl FileSystemAccess for FlakyFileSystem {
    async fn get_data_directory(&self) -> BridgeResult<PathBuf> {
        self.inner.get_data_directory().await
    }

    async fn exists(&self, path: &Path) -> BridgeResult<bool> {
        self.inner.exists(path).await
    }

    async fn create_dir_all(&self, path: &Path) -> BridgeResult<()> {
        self.inner.create_dir_all(path).await
    }

    async fn read_file(&self, path: &Path) -> BridgeResult<Bytes> {
        self.inner.read_file(path).await
    }

    async fn write_file(&self, path: &Path, data: Bytes) -> BridgeResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(BridgeError::OperationFailed("disk full".to_string()));
        }
        self.inner.write_file(path, data).await
    }

    async fn delete_file(&self, path: &Path) -> BridgeResult<()> {
        self.inner.delete_file(path).await
    }
}

fn log_in(dir: &tempfile::TempDir) -> (CaptureLog, Arc<TokioFileSystem>) {
    let fs = Arc::new(TokioFileSystem::with_data_directory(dir.path().to_path_buf()));
    (CaptureLog::new(fs.clone(), LOG_FILE), fs)
}

#[tokio::test]
async fn test_missing_log_loads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let (log, _) = log_in(&dir);

    assert_eq!(log.load().await.unwrap(), 0);
    assert!(log.entries().await.is_empty());
}

#[tokio::test]
async fn test_entries_survive_reload_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let first = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
    let second = Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap();

    {
        let (log, _) = log_in(&dir);
        log.load().await.unwrap();
        log.record_capture(capture_filename(first), first).await.unwrap();
        log.record_capture(capture_filename(second), second).await.unwrap();
        assert!(log
            .record_status(&capture_filename(first), "Success")
            .await
            .unwrap());
    }

    let (log, _) = log_in(&dir);
    assert_eq!(log.load().await.unwrap(), 2);

    let entries = log.entries().await;
    assert_eq!(entries[0].filename, "2024-05-01T10:00:00Z.jpg");
    assert_eq!(entries[0].status.as_deref(), Some("Success"));
    assert_eq!(entries[1].filename, "2024-05-01T11:00:00Z.jpg");
    assert_eq!(entries[1].status, None);
}

#[tokio::test]
async fn test_corrupted_log_loads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let (log, fs) = log_in(&dir);
    fs.write_file(&dir.path().join(LOG_FILE), Bytes::from("{oops"))
        .await
        .unwrap();

    assert_eq!(log.load().await.unwrap(), 0);

    // The next write replaces the corrupted file
    let now = Utc::now();
    log.record_capture(capture_filename(now), now).await.unwrap();
    let (reloaded, _) = log_in(&dir);
    assert_eq!(reloaded.load().await.unwrap(), 1);
}

#[tokio::test]
async fn test_status_for_unknown_capture() {
    let dir = tempfile::tempdir().unwrap();
    let (log, _) = log_in(&dir);
    log.load().await.unwrap();

    assert!(!log.record_status("missing.jpg", "Success").await.unwrap());
}

#[tokio::test]
async fn test_status_is_overwritten_by_retry() {
    let dir = tempfile::tempdir().unwrap();
    let (log, _) = log_in(&dir);
    let now = Utc::now();
    let name = capture_filename(now);

    log.record_capture(name.clone(), now).await.unwrap();
    log.record_status(&name, "Network error: offline")
        .await
        .unwrap();
    log.record_status(&name, "Success").await.unwrap();

    assert_eq!(
        log.find(&name).await.unwrap().status.as_deref(),
        Some("Success")
    );
}

#[tokio::test]
async fn test_failed_write_leaves_log_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let fs = Arc::new(FlakyFileSystem {
        inner: TokioFileSystem::with_data_directory(dir.path().to_path_buf()),
        fail_writes: AtomicBool::new(false),
    });
    let log = CaptureLog::new(fs.clone(), LOG_FILE);
    let first = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
    let second = Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap();
    log.record_capture(capture_filename(first), first).await.unwrap();

    fs.fail_writes.store(true, Ordering::SeqCst);
    assert!(log
        .record_capture(capture_filename(second), second)
        .await
        .is_err());
    assert!(log
        .record_status(&capture_filename(first), "Success")
        .await
        .is_err());

    let entries = log.entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, None);

    // Memory still matches what is on disk
    let (reloaded, _) = log_in(&dir);
    reloaded.load().await.unwrap();
    assert_eq!(reloaded.entries().await, entries);
}
