use archive_core::{AppError, TaskError};
use archive_storage::StorageError;
use thiserror::Error;

use crate::document::RasterizeError;
use crate::video::TranscodeError;

/// Failures inside a derivative pass.
///
/// Only [`DerivativeError::is_retryable`] errors leave the orchestrator; the rest
/// are reported as a failed pass.
#[derive(Debug, Error)]
pub enum DerivativeError {
    #[error("Source blob missing: {0}")]
    SourceMissing(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Failed to persist derivative path: {0}")]
    Persist(#[from] AppError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Rasterize(#[from] RasterizeError),

    #[error(transparent)]
    Transcode(#[from] TranscodeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Processing task panicked or was cancelled: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl DerivativeError {
    /// Whether running the same job again later could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            DerivativeError::SourceMissing(_) => true,
            DerivativeError::Storage(e) => e.is_recoverable(),
            DerivativeError::Persist(e) => e.is_recoverable(),
            DerivativeError::Image(_)
            | DerivativeError::Rasterize(_)
            | DerivativeError::Transcode(_)
            | DerivativeError::Io(_)
            | DerivativeError::Join(_) => false,
        }
    }
}

impl From<DerivativeError> for TaskError {
    fn from(err: DerivativeError) -> Self {
        if err.is_retryable() {
            TaskError::recoverable(anyhow::Error::new(err))
        } else {
            TaskError::unrecoverable(anyhow::Error::new(err))
        }
    }
}
