use std::collections::HashSet;

use archive_core::models::{ArchivedFile, DerivativeKind};
use archive_core::AppError;
use async_trait::async_trait;
use uuid::Uuid;

/// Persistence for `record_files` rows.
///
/// Derivative writes touch a single column so that the thumbnail and preview
/// passes of one file never overwrite each other's result.
#[async_trait]
pub trait RecordFileStore: Send + Sync {
    async fn create(&self, file: &ArchivedFile) -> Result<ArchivedFile, AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<ArchivedFile>, AppError>;

    /// Files of one record in upload order.
    async fn list_for_record(&self, record_id: Uuid) -> Result<Vec<ArchivedFile>, AppError>;

    /// Every file in upload order.
    async fn list_all(&self) -> Result<Vec<ArchivedFile>, AppError>;

    /// Files whose `kind` column is still unset, in upload order.
    async fn list_missing(&self, kind: DerivativeKind) -> Result<Vec<ArchivedFile>, AppError>;

    /// Store a derivative key. Fails with `NotFound` when the row is gone.
    async fn set_derivative(&self, id: Uuid, kind: DerivativeKind, path: &str)
        -> Result<(), AppError>;

    /// Every key referenced by a file, thumbnail or preview column.
    async fn referenced_paths(&self) -> Result<HashSet<String>, AppError>;
}
