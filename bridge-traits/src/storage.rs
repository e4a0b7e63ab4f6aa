//! Storage and File System Abstractions
//!
//! Provides platform-agnostic traits for file I/O and secure credential storage.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// File system access trait
///
/// Abstracts file I/O operations to support different platforms:
/// - Desktop: Direct filesystem access
/// - iOS/Android: Sandboxed app documents directory
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::FileSystemAccess;
///
/// async fn keep_capture(fs: &dyn FileSystemAccess, data: &[u8]) -> Result<()> {
///     let data_dir = fs.get_data_directory().await?;
///     let file_path = data_dir.join("2024-05-01T10:00:00Z.jpg");
///     fs.write_file(&file_path, Bytes::copy_from_slice(data)).await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait FileSystemAccess: Send + Sync {
    /// Get the application's data directory
    ///
    /// Captured files and the capture log live here.
    async fn get_data_directory(&self) -> Result<PathBuf>;

    /// Check if a file or directory exists
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Create a directory and all parent directories if they don't exist
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Read entire file contents into memory
    async fn read_file(&self, path: &Path) -> Result<Bytes>;

    /// Write data to a file, replacing any previous contents
    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()>;

    /// Delete a file
    async fn delete_file(&self, path: &Path) -> Result<()>;
}

/// Secure credential storage trait
///
/// Abstracts secure storage mechanisms:
/// - macOS/iOS: Keychain
/// - Android: Keystore (hardware-backed when available)
/// - Windows: DPAPI
/// - Linux: Secret Service / libsecret
///
/// The trait is synchronous: platform keychains answer without suspending and
/// callers hold the session lock while persisting.
///
/// # Security Requirements
///
/// Implementations MUST:
/// - Encrypt data at rest
/// - Use platform-provided secure storage when available
/// - Never log or expose sensitive data
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::SecureStore;
///
/// fn store_token(store: &dyn SecureStore, token: &str) -> Result<()> {
///     store.set_secret("com.example.receipts", token.as_bytes())?;
///     Ok(())
/// }
/// ```
pub trait SecureStore: Send + Sync {
    /// Store a secret value, replacing any previous value for `key`
    fn set_secret(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Retrieve a secret value
    ///
    /// # Returns
    ///
    /// Returns `Ok(None)` if the key doesn't exist. A missing entry is never an error.
    fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Delete a secret
    ///
    /// Deleting a missing key succeeds.
    fn delete_secret(&self, key: &str) -> Result<()>;

    /// Check if a secret exists without handing it to the caller
    fn has_secret(&self, key: &str) -> Result<bool> {
        Ok(self.get_secret(key)?.is_some())
    }
}
