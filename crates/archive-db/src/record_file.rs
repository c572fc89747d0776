use std::collections::HashSet;

use archive_core::models::{ArchivedFile, DerivativeKind};
use archive_core::AppError;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use crate::store::RecordFileStore;

const COLUMNS: &str = "id, record_id, file, content_type, thumbnail, preview, uploaded_at";

/// Postgres repository for `record_files`.
#[derive(Clone)]
pub struct RecordFileRepository {
    pool: PgPool,
}

impl RecordFileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn derivative_column(kind: DerivativeKind) -> &'static str {
        match kind {
            DerivativeKind::Thumbnail => "thumbnail",
            DerivativeKind::Preview => "preview",
        }
    }
}

#[async_trait]
impl RecordFileStore for RecordFileRepository {
    #[tracing::instrument(skip(self, file), fields(db.table = "record_files", db.operation = "insert", db.record_id = %file.id))]
    async fn create(&self, file: &ArchivedFile) -> Result<ArchivedFile, AppError> {
        let query = format!(
            "INSERT INTO record_files ({COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {COLUMNS}"
        );
        let created = sqlx::query_as::<Postgres, ArchivedFile>(&query)
            .bind(file.id)
            .bind(file.record_id)
            .bind(&file.file)
            .bind(&file.content_type)
            .bind(&file.thumbnail)
            .bind(&file.preview)
            .bind(file.uploaded_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(created)
    }

    #[tracing::instrument(skip(self), fields(db.table = "record_files", db.operation = "select", db.record_id = %id))]
    async fn get(&self, id: Uuid) -> Result<Option<ArchivedFile>, AppError> {
        let query = format!("SELECT {COLUMNS} FROM record_files WHERE id = $1");
        let file = sqlx::query_as::<Postgres, ArchivedFile>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(file)
    }

    #[tracing::instrument(skip(self), fields(db.table = "record_files", db.operation = "select"))]
    async fn list_for_record(&self, record_id: Uuid) -> Result<Vec<ArchivedFile>, AppError> {
        let query = format!(
            "SELECT {COLUMNS} FROM record_files WHERE record_id = $1 ORDER BY uploaded_at ASC, id ASC"
        );
        let files = sqlx::query_as::<Postgres, ArchivedFile>(&query)
            .bind(record_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(files)
    }

    #[tracing::instrument(skip(self), fields(db.table = "record_files", db.operation = "select"))]
    async fn list_all(&self) -> Result<Vec<ArchivedFile>, AppError> {
        let query = format!("SELECT {COLUMNS} FROM record_files ORDER BY uploaded_at ASC, id ASC");
        let files = sqlx::query_as::<Postgres, ArchivedFile>(&query)
            .fetch_all(&self.pool)
            .await?;

        Ok(files)
    }

    #[tracing::instrument(skip(self), fields(db.table = "record_files", db.operation = "select"))]
    async fn list_missing(&self, kind: DerivativeKind) -> Result<Vec<ArchivedFile>, AppError> {
        let query = format!(
            "SELECT {COLUMNS} FROM record_files WHERE {} IS NULL ORDER BY uploaded_at ASC, id ASC",
            Self::derivative_column(kind)
        );
        let files = sqlx::query_as::<Postgres, ArchivedFile>(&query)
            .fetch_all(&self.pool)
            .await?;

        Ok(files)
    }

    #[tracing::instrument(skip(self), fields(db.table = "record_files", db.operation = "update", db.record_id = %id))]
    async fn set_derivative(
        &self,
        id: Uuid,
        kind: DerivativeKind,
        path: &str,
    ) -> Result<(), AppError> {
        let query = format!(
            "UPDATE record_files SET {} = $2 WHERE id = $1",
            Self::derivative_column(kind)
        );
        let result = sqlx::query(&query)
            .bind(id)
            .bind(path)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("record file {}", id)));
        }

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "record_files", db.operation = "select"))]
    async fn referenced_paths(&self) -> Result<HashSet<String>, AppError> {
        let rows = sqlx::query_as::<Postgres, (String, Option<String>, Option<String>)>(
            "SELECT file, thumbnail, preview FROM record_files",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut paths = HashSet::with_capacity(rows.len());
        for (file, thumbnail, preview) in rows {
            paths.insert(file);
            paths.extend(thumbnail);
            paths.extend(preview);
        }

        Ok(paths)
    }
}
