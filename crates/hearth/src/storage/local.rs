use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

use super::traits::FileMetadata;
use super::{Storage, StorageError, StorageResult};

/// Local filesystem storage rooted at one directory
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    /// Join `path` onto the base path. Only plain relative components are
    /// accepted so callers cannot escape the base directory.
    fn full_path(&self, path: &str) -> StorageResult<PathBuf> {
        let relative = Path::new(path);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        Ok(self.base_path.join(relative))
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
        let full_path = self.full_path(path)?;
        match fs::read(&full_path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(full_path.display().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let full_path = self.full_path(prefix)?;

        if !full_path.is_dir() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        let mut read_dir = fs::read_dir(&full_path).await?;

        while let Some(entry) = read_dir.next_entry().await? {
            if let Ok(relative) = entry.path().strip_prefix(&self.base_path) {
                let mut path_str = relative.to_string_lossy().to_string();

                if entry.file_type().await?.is_dir() {
                    path_str.push('/');
                }

                entries.push(path_str);
            }
        }

        entries.sort();
        Ok(entries)
    }

    async fn metadata(&self, path: &str) -> StorageResult<FileMetadata> {
        let full_path = self.full_path(path)?;
        let metadata = match fs::metadata(&full_path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(full_path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let modified = metadata.modified().ok().and_then(|time| {
            time.duration_since(std::time::UNIX_EPOCH)
                .ok()
                .and_then(|duration| chrono::DateTime::from_timestamp(duration.as_secs() as i64, 0))
        });

        Ok(FileMetadata {
            size: metadata.len(),
            modified,
            is_dir: metadata.is_dir(),
        })
    }

    fn resolve(&self, path: &str) -> StorageResult<PathBuf> {
        self.full_path(path)
    }

    fn location(&self) -> String {
        self.base_path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_and_list() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.prompt"), "second").unwrap();
        std::fs::write(dir.path().join("a.prompt"), "first").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        let storage = LocalStorage::new(dir.path());
        assert_eq!(storage.read_to_string("a.prompt").await.unwrap(), "first");
        assert_eq!(
            storage.list("").await.unwrap(),
            vec!["a.prompt", "b.prompt", "nested/"]
        );
        assert_eq!(storage.metadata("b.prompt").await.unwrap().size, 6);
        assert!(storage.metadata("nested").await.unwrap().is_dir);
        assert!(matches!(
            storage.metadata("missing.prompt").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_directory_lists_empty() {
        let storage = LocalStorage::new("/definitely/not/here");
        assert!(storage.list("").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_escaping_paths() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());

        assert!(matches!(
            storage.read("../secret").await,
            Err(StorageError::InvalidPath(_))
        ));
        assert!(matches!(
            storage.resolve("/etc/passwd"),
            Err(StorageError::InvalidPath(_))
        ));
        assert!(matches!(
            storage.read("missing").await,
            Err(StorageError::NotFound(_))
        ));
    }
}
