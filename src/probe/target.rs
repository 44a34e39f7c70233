//! The probed backend seam.
//!
//! `ObjectStore` is the one interface the sentinel needs from the object
//! storage backend. Deployments implement it over their storage SDK; the
//! filesystem implementation below backs the reference binary and local
//! testing.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::BackendError;

/// Metadata returned by a `stat` call.
#[derive(Debug, Clone)]
pub struct ObjectMeta {
    pub size: u64,
    pub last_modified_ms: Option<u64>,
}

/// Minimal object-storage interface the probes exercise.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Vec<u8>, BackendError>;
    async fn put(&self, key: &str, body: Vec<u8>) -> Result<(), BackendError>;
    async fn delete(&self, key: &str) -> Result<(), BackendError>;
    async fn list(&self, prefix: &str, limit: usize) -> Result<Vec<String>, BackendError>;
    async fn stat(&self, key: &str) -> Result<ObjectMeta, BackendError>;
}

/// Filesystem-backed object store for the reference binary.
///
/// Keys map to paths under a root directory; `/` separators become
/// subdirectories.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, BackendError> {
        if key.is_empty() || key.contains("..") {
            return Err(BackendError::internal(format!("invalid key `{key}`")));
        }
        Ok(self.root.join(key))
    }
}

fn io_err(e: std::io::Error) -> BackendError {
    BackendError::transient(e.to_string())
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>, BackendError> {
        tokio::fs::read(self.path_for(key)?).await.map_err(io_err)
    }

    async fn put(&self, key: &str, body: Vec<u8>) -> Result<(), BackendError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        tokio::fs::write(path, body).await.map_err(io_err)
    }

    async fn delete(&self, key: &str) -> Result<(), BackendError> {
        tokio::fs::remove_file(self.path_for(key)?)
            .await
            .map_err(io_err)
    }

    async fn list(&self, prefix: &str, limit: usize) -> Result<Vec<String>, BackendError> {
        let dir = self.path_for(prefix.trim_end_matches('/'))?;
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            // An empty prefix is a successful, empty listing.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_err(e)),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            if keys.len() >= limit {
                break;
            }
            keys.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(keys)
    }

    async fn stat(&self, key: &str) -> Result<ObjectMeta, BackendError> {
        let meta = tokio::fs::metadata(self.path_for(key)?)
            .await
            .map_err(io_err)?;
        let last_modified_ms = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as u64);
        Ok(ObjectMeta {
            size: meta.len(),
            last_modified_ms,
        })
    }
}
