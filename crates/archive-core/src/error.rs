//! Error types module
//!
//! `AppError` is the error surfaced by the archive's service layer (upload,
//! housekeeping, command-line tools). Lower layers keep their own `thiserror`
//! enums and convert into it at the boundary.

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl AppError {
    /// Whether retrying the failed operation could succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            #[cfg(feature = "sqlx")]
            AppError::Database(_) => true,
            AppError::Internal(_) | AppError::InternalWithSource { .. } => true,
            AppError::InvalidInput(_) | AppError::NotFound(_) => false,
        }
    }
}

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Row not found".to_string()),
            other => AppError::Database(other),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("UUID parsing error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_errors_are_not_recoverable() {
        assert!(!AppError::InvalidInput("empty upload".into()).is_recoverable());
        assert!(!AppError::NotFound("record file".into()).is_recoverable());
    }

    #[test]
    fn io_errors_are_recoverable() {
        let err: AppError = io::Error::other("disk full").into();
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn anyhow_keeps_message() {
        let err: AppError = anyhow::anyhow!("boom").into();
        assert!(err.to_string().contains("Internal error"));
        assert!(err.is_recoverable());
    }
}
