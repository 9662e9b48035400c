//! Blob area for attachment bytes.
//!
//! [`BlobStore`] is the seam between the lifecycle operations and wherever
//! the bytes actually live. [`LocalBlobStore`] keeps them under a directory
//! on the local filesystem.
//!
//! Removal is two-phase so it can follow a database transaction: blobs are
//! first parked (moved aside, still recoverable), then either purged after
//! the commit succeeds or restored when it does not.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use uuid::Uuid;

/// Directory under the blob root holding parked removal batches.
const PARKING_DIR: &str = ".removing";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid blob key '{0}'")]
    InvalidKey(String),

    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("I/O error on blob '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    fn io(key: &str, source: std::io::Error) -> Self {
        StorageError::Io {
            key: key.to_string(),
            source,
        }
    }
}

/// A blob moved aside by [`BlobStore::park`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParkedBlob {
    /// Original key.
    pub key: String,
    /// Where the bytes sit until the batch is purged or restored.
    pub parked_key: String,
}

/// Blobs parked together for one removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalBatch {
    pub id: Uuid,
    pub blobs: Vec<ParkedBlob>,
}

impl RemovalBatch {
    pub fn new(id: Uuid, blobs: Vec<ParkedBlob>) -> Self {
        Self { id, blobs }
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write `bytes` under `key`, replacing any previous content.
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Delete a blob. A missing blob is not an error.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Move the given blobs aside. Missing blobs are left out of the batch.
    ///
    /// On failure nothing stays parked.
    async fn park(&self, keys: &[String]) -> Result<RemovalBatch, StorageError>;

    /// Put every parked blob back under its original key.
    async fn restore(&self, batch: RemovalBatch) -> Result<(), StorageError>;

    /// Permanently delete a parked batch.
    async fn purge(&self, batch: RemovalBatch) -> Result<(), StorageError>;

    /// Whether the store can currently be reached.
    async fn check(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

/// Reject keys that could escape the blob root or collide with the
/// parking area.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    let invalid = || StorageError::InvalidKey(key.to_string());
    if key.contains(['\\', '\0']) {
        return Err(invalid());
    }
    // Empty segments cover absolute keys and `a//b`; a leading dot covers
    // `.`, `..` and the parking directory.
    if key
        .split('/')
        .any(|segment| segment.is_empty() || segment.starts_with('.'))
    {
        return Err(invalid());
    }
    Ok(())
}

/// Filesystem-backed blob store rooted at one directory.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }

    async fn move_file(from: &Path, to: &Path, key: &str) -> Result<(), StorageError> {
        if let Some(parent) = to.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::io(key, e))?;
        }
        tokio::fs::rename(from, to)
            .await
            .map_err(|e| StorageError::io(key, e))
    }

    async fn restore_all(&self, blobs: &[ParkedBlob]) -> Result<(), StorageError> {
        let mut first_error = None;
        for blob in blobs {
            let from = self.root.join(&blob.parked_key);
            let to = self.root.join(&blob.key);
            if let Err(e) = Self::move_file(&from, &to, &blob.key).await {
                tracing::error!(key = %blob.key, error = %e, "Failed to restore parked blob");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::io(key, e))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| StorageError::io(key, e))
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(key)?;
        tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(key.to_string()),
            _ => StorageError::io(key, e),
        })
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(key, e)),
        }
    }

    async fn park(&self, keys: &[String]) -> Result<RemovalBatch, StorageError> {
        for key in keys {
            validate_key(key)?;
        }

        let id = Uuid::now_v7();
        let mut parked = Vec::with_capacity(keys.len());

        for key in keys {
            let from = self.root.join(key);
            let parked_key = format!("{PARKING_DIR}/{}/{key}", id.simple());
            let to = self.root.join(&parked_key);

            match tokio::fs::try_exists(&from).await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::warn!(key = %key, "Blob already missing, nothing to park");
                    continue;
                }
                Err(e) => {
                    self.restore_all(&parked).await.ok();
                    return Err(StorageError::io(key, e));
                }
            }

            if let Err(e) = Self::move_file(&from, &to, key).await {
                self.restore_all(&parked).await.ok();
                return Err(e);
            }
            parked.push(ParkedBlob {
                key: key.clone(),
                parked_key,
            });
        }

        Ok(RemovalBatch::new(id, parked))
    }

    async fn restore(&self, batch: RemovalBatch) -> Result<(), StorageError> {
        if batch.is_empty() {
            return Ok(());
        }
        self.restore_all(&batch.blobs).await?;
        let dir = self.root.join(PARKING_DIR).join(batch.id.simple().to_string());
        tokio::fs::remove_dir_all(&dir).await.ok();
        Ok(())
    }

    async fn check(&self) -> Result<(), StorageError> {
        let root = self.root.to_string_lossy();
        match tokio::fs::metadata(&self.root).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(StorageError::io(
                &root,
                std::io::Error::other("blob root is not a directory"),
            )),
            Err(e) => Err(StorageError::io(&root, e)),
        }
    }

    async fn purge(&self, batch: RemovalBatch) -> Result<(), StorageError> {
        if batch.is_empty() {
            return Ok(());
        }
        let dir = self.root.join(PARKING_DIR).join(batch.id.simple().to_string());
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(&dir.to_string_lossy(), e)),
        }
    }
}
