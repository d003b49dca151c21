//! Object storage for uploaded documents

use async_trait::async_trait;
use notebook_common::{Error, Result};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Binary object storage addressed by relative keys
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store bytes under `key`, returning the object's URL
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<String>;

    /// URL of the object under `key`
    fn url(&self, key: &str) -> Result<String>;

    async fn fetch(&self, key: &str) -> Result<Vec<u8>>;

    async fn delete(&self, key: &str) -> Result<()>;
}

/// Filesystem-backed store rooted at `<root>/uploads`
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a key to a path under the root. Keys may not escape it.
    fn resolve(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let normal = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if key.is_empty() || !normal {
            return Err(Error::Validation(format!("invalid object key '{}'", key)));
        }
        Ok(self.root.join(relative))
    }
}

fn store_error(action: &str, key: &str, err: std::io::Error) -> Error {
    Error::ExternalService(format!("object store {} failed for '{}': {}", action, key, err))
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<String> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| store_error("put", key, e))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| store_error("put", key, e))?;

        debug!(key, size = bytes.len(), "Stored object");
        self.url(key)
    }

    fn url(&self, key: &str) -> Result<String> {
        let path = self.resolve(key)?;
        Ok(format!("file://{}", path.display()))
    }

    async fn fetch(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.resolve(key)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| store_error("fetch", key, e))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(store_error("delete", key, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_fetch_delete() {
        let dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(dir.path());

        let url = store.put("user/doc.pdf", b"%PDF-1.4").await.unwrap();
        assert!(url.starts_with("file://"));
        assert!(url.ends_with("doc.pdf"));

        assert_eq!(store.fetch("user/doc.pdf").await.unwrap(), b"%PDF-1.4");

        store.delete("user/doc.pdf").await.unwrap();
        assert!(matches!(
            store.fetch("user/doc.pdf").await,
            Err(Error::ExternalService(_))
        ));
        // Deleting twice is not an error
        store.delete("user/doc.pdf").await.unwrap();
    }

    #[tokio::test]
    async fn test_keys_cannot_escape_root() {
        let dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(dir.path());

        for key in ["../outside.pdf", "/etc/passwd", "a/../../b", ""] {
            assert!(matches!(
                store.put(key, b"x").await,
                Err(Error::Validation(_))
            ));
        }
    }
}
