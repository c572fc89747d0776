//! Storage abstraction trait

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl StorageError {
    /// Whether a retry could succeed (missing blobs may appear once an upload lands).
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, StorageError::InvalidKey(_) | StorageError::ConfigError(_))
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

/// Blob store keyed by opaque path strings.
///
/// Writes never rename or move existing blobs: every derivative is written to a
/// new key, so concurrent writers cannot corrupt each other's blobs.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write `data` at `key`, replacing any existing blob at that key.
    async fn upload_with_key(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<()>;

    /// Read a whole blob.
    async fn download(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Read a blob as a stream of chunks (for large originals such as videos).
    async fn download_stream(&self, key: &str) -> StorageResult<ByteStream>;

    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Delete a blob. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Write the file at `source` to `key` without buffering it in memory.
    async fn upload_file(&self, key: &str, source: &Path, content_type: &str)
        -> StorageResult<u64>;

    /// All keys under `prefix`, sorted.
    async fn list_keys(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Remove empty directories under `prefix`; returns how many were removed.
    /// Backends without directories have nothing to prune.
    async fn prune_empty_dirs(&self, _prefix: &str) -> StorageResult<usize> {
        Ok(0)
    }

    /// Filesystem path of `key` for external tools, when the backend has one.
    /// Callers fall back to staging the blob through [`Storage::download_stream`].
    fn local_path(&self, _key: &str) -> Option<PathBuf> {
        None
    }

    fn backend_name(&self) -> &'static str;
}
