use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::StorageResult;

/// Read-only access to a directory of model or prompt files
#[async_trait]
pub trait Storage: Send + Sync {
    /// Read file contents
    async fn read(&self, path: &str) -> StorageResult<Vec<u8>>;

    /// Read file contents as UTF-8 text
    async fn read_to_string(&self, path: &str) -> StorageResult<String> {
        let bytes = self.read(path).await?;
        String::from_utf8(bytes)
            .map_err(|e| super::StorageError::InvalidContents(format!("{}: {}", path, e)))
    }

    /// List entries in a directory. Directories carry a trailing slash.
    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Get file metadata (size, modified time, etc.)
    async fn metadata(&self, path: &str) -> StorageResult<FileMetadata>;

    /// Absolute location of `path`, for collaborators that open files themselves
    fn resolve(&self, path: &str) -> StorageResult<PathBuf>;

    /// Human-readable description of where this storage lives
    fn location(&self) -> String;
}

/// File metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMetadata {
    pub size: u64,
    pub modified: Option<chrono::DateTime<chrono::Utc>>,
    pub is_dir: bool,
}
