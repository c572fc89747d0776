//! Derivative job handler

use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;

use archive_core::models::{DerivativeJobPayload, Task, TaskType};
use archive_core::{TaskError, TaskResultExt};
use archive_processing::DerivativeOrchestrator;

use crate::context::TaskHandler;
use crate::locks::KeyedLocks;

/// Runs the orchestrator for the file named in a [`DerivativeJobPayload`].
///
/// Jobs for the same file are serialized within this process; the row is read
/// after the lock is taken so each job sees its predecessor's writes.
pub struct DerivativeTaskHandler {
    orchestrator: Arc<DerivativeOrchestrator>,
    locks: KeyedLocks,
}

impl DerivativeTaskHandler {
    pub fn new(orchestrator: Arc<DerivativeOrchestrator>) -> Self {
        Self {
            orchestrator,
            locks: KeyedLocks::new(),
        }
    }
}

#[async_trait]
impl TaskHandler for DerivativeTaskHandler {
    fn task_type(&self) -> TaskType {
        TaskType::GenerateDerivatives
    }

    async fn handle(&self, task: &Task) -> Result<serde_json::Value, TaskError> {
        let payload: DerivativeJobPayload =
            serde_json::from_value(task.payload.clone()).unrecoverable()?;

        let _guard = self.locks.lock(payload.file_id).await;

        let mut file = match self.orchestrator.store().get(payload.file_id).await {
            Ok(Some(file)) => file,
            Ok(None) => {
                return Err(TaskError::unrecoverable(anyhow!(
                    "Record file {} not found",
                    payload.file_id
                )))
            }
            Err(e) if e.is_recoverable() => return Err(TaskError::recoverable(e)),
            Err(e) => return Err(TaskError::unrecoverable(e)),
        };

        let report = self
            .orchestrator
            .run_passes(&mut file, &payload.passes)
            .await?;

        serde_json::to_value(&report).unrecoverable()
    }
}
