//! File storage backends.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use studyhub_common::{AppError, AppResult};

/// Storage backend trait for file operations.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Store `data` under `key`, replacing any previous content.
    async fn save(&self, key: &str, data: &[u8]) -> AppResult<()>;

    /// Remove the file stored under `key`. Missing files are not an error.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Check if a file exists.
    async fn exists(&self, key: &str) -> AppResult<bool>;

    /// Public URL for a key.
    fn url(&self, key: &str) -> String;
}

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new local storage backend rooted at `base_path`.
    #[must_use]
    pub fn new(base_path: impl Into<PathBuf>, base_url: &str) -> Self {
        Self {
            base_path: base_path.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Resolve a key below the storage root, rejecting escapes.
    fn path_for(&self, key: &str) -> AppResult<PathBuf> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(AppError::Storage(format!("Invalid storage key: {key}")));
        }
        Ok(self.base_path.join(relative))
    }
}

#[async_trait]
impl StorageBackend for LocalStorage {
    async fn save(&self, key: &str, data: &[u8]) -> AppResult<()> {
        let path = self.path_for(key)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to create directory: {e}")))?;
        }

        tokio::fs::write(&path, data)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write file: {e}")))
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let path = self.path_for(key)?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(AppError::Storage(format!("Failed to delete file: {e}"))),
        }

        // Keys are `{id}/{name}`; drop the now empty per-file directory.
        if let Some(parent) = path.parent().filter(|p| *p != self.base_path) {
            let _ = tokio::fs::remove_dir(parent).await;
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let path = self.path_for(key)?;
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| AppError::Storage(e.to_string()))
    }

    fn url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }
}

/// Storage backend that keeps nothing.
#[derive(Debug, Clone, Default)]
pub struct NoOpStorage {
    base_url: String,
}

impl NoOpStorage {
    /// Create a new no-op storage backend.
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl StorageBackend for NoOpStorage {
    async fn save(&self, _key: &str, _data: &[u8]) -> AppResult<()> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> AppResult<()> {
        Ok(())
    }

    async fn exists(&self, _key: &str) -> AppResult<bool> {
        Ok(false)
    }

    fn url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn temp_root(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("studyhub-storage-{name}-{}", std::process::id()))
    }

    #[tokio::test]
    async fn test_local_save_exists_delete() {
        let root = temp_root("roundtrip");
        let storage = LocalStorage::new(&root, "http://localhost:3000/uploads/");

        storage.save("f1/notes.txt", b"hello").await.unwrap();
        assert!(storage.exists("f1/notes.txt").await.unwrap());

        storage.delete("f1/notes.txt").await.unwrap();
        assert!(!storage.exists("f1/notes.txt").await.unwrap());

        // Deleting again is fine.
        storage.delete("f1/notes.txt").await.unwrap();
        let _ = tokio::fs::remove_dir_all(&root).await;
    }

    #[tokio::test]
    async fn test_local_rejects_escaping_keys() {
        let storage = LocalStorage::new(temp_root("escape"), "http://localhost/uploads");

        let err = storage.save("../etc/passwd", b"x").await.unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
        assert!(storage.save("/abs", b"x").await.is_err());
    }

    #[test]
    fn test_url() {
        let storage = LocalStorage::new("uploads", "http://localhost:3000/uploads/");
        assert_eq!(
            storage.url("f1/a.png"),
            "http://localhost:3000/uploads/f1/a.png"
        );
        assert_eq!(NoOpStorage::new("http://x/").url("k"), "http://x/k");
    }
}
