//! Model and prompt directories
//!
//! Both are flat, read-only directories addressed by file name.

use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::ChatError;
use crate::storage::{Storage, StorageError, StorageResult};

/// One file offered by a catalog
#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    pub name: String,
    pub size_bytes: u64,
    pub modified: Option<chrono::DateTime<chrono::Utc>>,
}

/// Files in `storage` whose name ends in `.{extension}`
async fn list_with_extension(
    storage: &dyn Storage,
    extension: &str,
) -> StorageResult<Vec<CatalogEntry>> {
    let suffix = format!(".{}", extension);
    let mut entries = Vec::new();

    for name in storage.list("").await? {
        if name.ends_with('/') || !name.ends_with(&suffix) {
            continue;
        }
        let metadata = match storage.metadata(&name).await {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(entry = %name, error = %e, "Skipping unreadable catalog entry");
                continue;
            }
        };
        if metadata.is_dir {
            continue;
        }
        entries.push(CatalogEntry {
            name,
            size_bytes: metadata.size,
            modified: metadata.modified,
        });
    }

    Ok(entries)
}

/// Model files available for loading
#[derive(Clone)]
pub struct ModelCatalog {
    storage: Arc<dyn Storage>,
    extension: String,
}

impl ModelCatalog {
    pub fn new(storage: Arc<dyn Storage>, extension: impl Into<String>) -> Self {
        Self {
            storage,
            extension: extension.into(),
        }
    }

    pub async fn list(&self) -> StorageResult<Vec<CatalogEntry>> {
        list_with_extension(self.storage.as_ref(), &self.extension).await
    }

    /// Path of an existing model file. The identifier must be a plain file
    /// name inside the model directory.
    pub async fn resolve(&self, model: &str) -> Result<PathBuf, ChatError> {
        let load_error = |reason: String| ChatError::EngineLoad {
            model: model.to_string(),
            reason,
        };

        let has_file_name = Path::new(model)
            .components()
            .any(|c| matches!(c, Component::Normal(_)));
        if !has_file_name {
            return Err(load_error("model identifier must be a file name".to_string()));
        }

        let path = self.storage.resolve(model).map_err(|e| match e {
            StorageError::InvalidPath(_) => {
                load_error("model identifier must be a file name".to_string())
            }
            other => load_error(other.to_string()),
        })?;

        let metadata = match self.storage.metadata(model).await {
            Ok(metadata) => metadata,
            Err(StorageError::NotFound(_)) => {
                return Err(load_error(format!(
                    "model file not found in {}",
                    self.storage.location()
                )));
            }
            Err(e) => return Err(load_error(e.to_string())),
        };
        if metadata.is_dir {
            return Err(load_error("model identifier names a directory, not a file".to_string()));
        }

        Ok(path)
    }
}

/// System prompt files
#[derive(Clone)]
pub struct PromptLibrary {
    storage: Arc<dyn Storage>,
    extension: String,
}

impl PromptLibrary {
    pub fn new(storage: Arc<dyn Storage>, extension: impl Into<String>) -> Self {
        Self {
            storage,
            extension: extension.into(),
        }
    }

    pub async fn list(&self) -> StorageResult<Vec<CatalogEntry>> {
        list_with_extension(self.storage.as_ref(), &self.extension).await
    }

    /// Text of the named prompt, or the empty string when no prompt is named.
    /// A named prompt that is missing or unreadable is an error.
    pub async fn system_prompt(&self, name: Option<&str>) -> Result<String, ChatError> {
        let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
            return Ok(String::new());
        };

        let prompt_error = |reason: String| ChatError::PromptFile {
            name: name.to_string(),
            reason,
        };

        match self.storage.read_to_string(name).await {
            Ok(text) => {
                debug!(prompt = %name, bytes = text.len(), "Loaded system prompt");
                Ok(text)
            }
            Err(StorageError::NotFound(_)) => Err(prompt_error(format!(
                "not found in {}",
                self.storage.location()
            ))),
            Err(StorageError::InvalidPath(_)) => {
                Err(prompt_error("prompt identifier must be a file name".to_string()))
            }
            Err(e) => Err(prompt_error(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::storage::LocalStorage;

    fn catalogs(dir: &std::path::Path) -> (ModelCatalog, PromptLibrary) {
        let storage: Arc<dyn Storage> = Arc::new(LocalStorage::new(dir));
        (
            ModelCatalog::new(storage.clone(), "gguf"),
            PromptLibrary::new(storage, "prompt"),
        )
    }

    #[tokio::test]
    async fn test_list_filters_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("m.gguf"), b"GGUF").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        std::fs::write(dir.path().join("helpful.prompt"), b"You are helpful.").unwrap();
        std::fs::create_dir(dir.path().join("dir.gguf")).unwrap();

        let (models, prompts) = catalogs(dir.path());
        let names: Vec<_> = models.list().await.unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["m.gguf"]);

        let listed = prompts.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "helpful.prompt");
        assert_eq!(listed[0].size_bytes, 16);
    }

    #[tokio::test]
    async fn test_resolve_model() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("m.gguf"), b"GGUF").unwrap();
        let (models, _) = catalogs(dir.path());

        assert_eq!(
            models.resolve("m.gguf").await.unwrap(),
            dir.path().join("m.gguf")
        );

        let missing = models.resolve("absent.gguf").await.unwrap_err();
        assert_eq!(missing.kind(), ErrorKind::EngineLoad);
        assert!(missing.to_string().contains("not found"));

        let escape = models.resolve("../m.gguf").await.unwrap_err();
        assert_eq!(escape.kind(), ErrorKind::EngineLoad);
    }

    #[tokio::test]
    async fn test_resolve_rejects_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub.gguf")).unwrap();
        let (models, _) = catalogs(dir.path());

        for id in ["sub.gguf", "sub.gguf/", ".", "./", ""] {
            let err = models.resolve(id).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::EngineLoad, "{id}");
        }
        let err = models.resolve("sub.gguf").await.unwrap_err();
        assert!(err.to_string().contains("directory"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_list_skips_dangling_entries() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("m.gguf"), b"GGUF").unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone.gguf"), dir.path().join("dangling.gguf"))
            .unwrap();
        let (models, _) = catalogs(dir.path());

        let names: Vec<_> = models.list().await.unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["m.gguf"]);
        assert!(models.resolve("dangling.gguf").await.is_err());
    }

    #[tokio::test]
    async fn test_system_prompt() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("helpful.prompt"), "You are helpful.").unwrap();
        let (_, prompts) = catalogs(dir.path());

        assert_eq!(prompts.system_prompt(None).await.unwrap(), "");
        assert_eq!(prompts.system_prompt(Some("  ")).await.unwrap(), "");
        assert_eq!(
            prompts.system_prompt(Some("helpful.prompt")).await.unwrap(),
            "You are helpful."
        );

        let err = prompts.system_prompt(Some("absent.prompt")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PromptFile);
    }
}
