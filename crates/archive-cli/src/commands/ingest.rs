//! Ingest a local file: upload it and run its derivative job to completion.

use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use archive_core::models::{ArchivedFile, DerivativeJobPayload, TaskStatus};
use archive_db::RecordFileStore;
use archive_processing::upload_pipeline;
use archive_storage::Storage;
use archive_worker::TaskQueue;
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct IngestReport {
    pub file: ArchivedFile,
    pub task_id: Option<Uuid>,
    pub task_status: Option<TaskStatus>,
}

/// Upload `path` to `record_id`, then (unless `queue` is `None`) submit the
/// derivative job and wait up to `wait` for it to finish.
pub async fn ingest_file(
    storage: &dyn Storage,
    store: &dyn RecordFileStore,
    queue: Option<(&TaskQueue, &mut mpsc::Receiver<(Uuid, TaskStatus)>)>,
    record_id: Uuid,
    path: &Path,
    wait: Duration,
) -> Result<IngestReport> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("{} has no usable file name", path.display()))?;

    let file = upload_pipeline(storage, store, record_id, filename, data).await?;

    let Some((queue, finished)) = queue else {
        return Ok(IngestReport {
            file,
            task_id: None,
            task_status: None,
        });
    };

    let task_id = queue
        .submit_derivative_job(&DerivativeJobPayload::all(file.id))
        .await?;

    let status = tokio::time::timeout(wait, async {
        while let Some((id, status)) = finished.recv().await {
            if id == task_id {
                return Some(status);
            }
        }
        None
    })
    .await
    .context("Timed out waiting for the derivative job")?;

    let file = store
        .get(file.id)
        .await?
        .ok_or_else(|| anyhow!("File {} disappeared during ingest", file.id))?;

    Ok(IngestReport {
        file,
        task_id: Some(task_id),
        task_status: status,
    })
}
