//! File System Access Implementation using Tokio

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::FileSystemAccess,
};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::APP_DIRECTORY_NAME;

/// Tokio-based file system implementation
///
/// Captured receipts and the capture log are kept under the platform data
/// directory (`~/.local/share/receipt-connector` on Linux).
pub struct TokioFileSystem {
    data_dir: PathBuf,
}

impl TokioFileSystem {
    /// Create a new file system accessor with the default data directory
    pub fn new() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".local")
                    .join("share")
            })
            .join(APP_DIRECTORY_NAME);

        Self { data_dir }
    }

    /// Create a new file system accessor rooted at a custom directory
    pub fn with_data_directory(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    fn map_io_error(e: std::io::Error) -> BridgeError {
        BridgeError::Io(e)
    }
}

impl Default for TokioFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FileSystemAccess for TokioFileSystem {
    async fn get_data_directory(&self) -> Result<PathBuf> {
        if !self.data_dir.exists() {
            fs::create_dir_all(&self.data_dir)
                .await
                .map_err(Self::map_io_error)?;
            debug!(path = ?self.data_dir, "Created data directory");
        }
        Ok(self.data_dir.clone())
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        fs::try_exists(path).await.map_err(Self::map_io_error)
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)
            .await
            .map_err(Self::map_io_error)?;
        debug!(path = ?path, "Created directory");
        Ok(())
    }

    async fn read_file(&self, path: &Path) -> Result<Bytes> {
        let data = fs::read(path).await.map_err(Self::map_io_error)?;
        debug!(path = ?path, size = data.len(), "Read file");
        Ok(Bytes::from(data))
    }

    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()> {
        if let Some(parent) = path.parent() {
            self.create_dir_all(parent).await?;
        }

        fs::write(path, data.as_ref())
            .await
            .map_err(Self::map_io_error)?;
        debug!(path = ?path, size = data.len(), "Wrote file");
        Ok(())
    }

    async fn delete_file(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).await.map_err(Self::map_io_error)?;
        debug!(path = ?path, "Deleted file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_custom_data_directory_is_created() {
        let root = tempfile::tempdir().unwrap();
        let data = root.path().join("nested").join("data");
        let fs = TokioFileSystem::with_data_directory(data.clone());

        let dir = fs.get_data_directory().await.unwrap();
        assert_eq!(dir, data);
        assert!(fs.exists(&data).await.unwrap());
    }

    #[tokio::test]
    async fn test_write_replaces_and_read() {
        let root = tempfile::tempdir().unwrap();
        let fs = TokioFileSystem::with_data_directory(root.path().to_path_buf());
        let file = root.path().join("logs").join("capture_logs.json");

        fs.write_file(&file, Bytes::from("[1]")).await.unwrap();
        fs.write_file(&file, Bytes::from("[]")).await.unwrap();

        assert_eq!(fs.read_file(&file).await.unwrap(), Bytes::from("[]"));

        fs.delete_file(&file).await.unwrap();
        assert!(!fs.exists(&file).await.unwrap());
    }

    #[tokio::test]
    async fn test_read_missing_file_is_io_error() {
        let root = tempfile::tempdir().unwrap();
        let fs = TokioFileSystem::with_data_directory(root.path().to_path_buf());

        let err = fs.read_file(&root.path().join("missing.jpg")).await.unwrap_err();
        assert!(matches!(err, BridgeError::Io(_)));
    }
}
