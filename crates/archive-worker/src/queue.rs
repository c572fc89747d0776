//! Task queue: in-process worker pool, retry, and submission.
//!
//! Delivery is at-least-once within the process: a task whose handler fails with
//! a recoverable error is re-enqueued after a capped exponential backoff until
//! its retries run out.
//!
//! Shutdown: [`TaskQueue::shutdown`] signals the pool to stop; it does not wait for
//! in-flight tasks.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use archive_core::models::{DerivativeJobPayload, Task, TaskStatus, TaskType};
use archive_core::{ArchiveConfig, TaskError};
use tokio::sync::{mpsc, Semaphore};
use uuid::Uuid;

use crate::context::TaskHandlerContext;

/// Maximum delay in seconds before retrying a failed task. Caps exponential backoff
/// so that high retry counts do not produce excessively long delays.
pub const MAX_RETRY_BACKOFF_SECS: u64 = 300;

/// Computes backoff in seconds for a given retry count (exponential with cap).
#[inline]
pub(crate) fn compute_retry_backoff_seconds(retry_count: i32) -> u64 {
    2_u64
        .checked_pow(retry_count.max(0) as u32)
        .unwrap_or(u64::MAX)
        .min(MAX_RETRY_BACKOFF_SECS)
}

/// Receives `(task_id, status)` when a task reaches `Completed` or `Failed`.
pub type TaskFinishedSender = mpsc::Sender<(Uuid, TaskStatus)>;

#[derive(Clone, Debug)]
pub struct TaskQueueConfig {
    pub max_workers: usize,
    pub default_timeout_seconds: u64,
    pub max_retries: i32,
    /// Bound of the submission channel.
    pub capacity: usize,
    /// Length of one backoff second; shortened in tests.
    pub backoff_unit: Duration,
}

impl Default for TaskQueueConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            default_timeout_seconds: 3600,
            max_retries: 3,
            capacity: 1024,
            backoff_unit: Duration::from_secs(1),
        }
    }
}

impl TaskQueueConfig {
    pub fn from_config(config: &ArchiveConfig) -> Self {
        Self {
            max_workers: config.task_queue_max_workers,
            default_timeout_seconds: config.task_queue_default_timeout_seconds,
            max_retries: config.task_queue_max_retries,
            capacity: config.task_queue_capacity.max(1),
            ..Self::default()
        }
    }
}

#[derive(Clone)]
pub struct TaskQueue {
    task_tx: mpsc::Sender<Task>,
    shutdown_tx: mpsc::Sender<()>,
    config: TaskQueueConfig,
}

impl TaskQueue {
    /// Create the queue and spawn its worker pool on the current runtime.
    pub fn new(
        config: TaskQueueConfig,
        context: Arc<dyn TaskHandlerContext>,
        task_finished_tx: Option<TaskFinishedSender>,
    ) -> Self {
        let (task_tx, task_rx) = mpsc::channel(config.capacity.max(1));
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let retry_tx = task_tx.clone();
        let config_clone = config.clone();
        tokio::spawn(async move {
            Self::worker_pool(
                config_clone,
                context,
                task_rx,
                retry_tx,
                shutdown_rx,
                task_finished_tx,
            )
            .await;
        });

        Self {
            task_tx,
            shutdown_tx,
            config,
        }
    }

    /// Submit a new task to the queue.
    #[tracing::instrument(skip(self, payload))]
    pub async fn submit_task(&self, task_type: TaskType, payload: serde_json::Value) -> Result<Uuid> {
        let task = Task::new(
            task_type,
            payload,
            self.config.max_retries,
            Some(self.config.default_timeout_seconds),
        );
        let task_id = task.id;

        self.task_tx.send(task).await.map_err(|_| {
            tracing::error!(task_type = %task_type, "Task queue is shut down");
            anyhow::anyhow!("Task queue is shut down")
        })?;

        tracing::info!(task_id = %task_id, task_type = %task_type, "Task submitted to queue");

        Ok(task_id)
    }

    /// Enqueue derivative generation for one file.
    pub async fn submit_derivative_job(&self, payload: &DerivativeJobPayload) -> Result<Uuid> {
        self.submit_task(TaskType::GenerateDerivatives, serde_json::to_value(payload)?)
            .await
    }

    async fn worker_pool(
        config: TaskQueueConfig,
        context: Arc<dyn TaskHandlerContext>,
        mut task_rx: mpsc::Receiver<Task>,
        retry_tx: mpsc::Sender<Task>,
        mut shutdown_rx: mpsc::Receiver<()>,
        task_finished_tx: Option<TaskFinishedSender>,
    ) {
        tracing::info!(
            max_workers = config.max_workers,
            max_retries = config.max_retries,
            "Task queue worker pool started"
        );

        let semaphore = Arc::new(Semaphore::new(config.max_workers.max(1)));

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Task queue worker pool shutting down");
                    break;
                }
                next = task_rx.recv() => {
                    let Some(task) = next else { break };
                    let Ok(permit) = semaphore.clone().acquire_owned().await else { break };

                    let ctx = context.clone();
                    let retry_tx = retry_tx.clone();
                    let finished_tx = task_finished_tx.clone();
                    let config = config.clone();
                    tokio::spawn(async move {
                        let _permit = permit;
                        if let Err(e) =
                            Self::process_task_with_retry(task, ctx, config, retry_tx, finished_tx).await
                        {
                            tracing::error!(error = %e, "Task processing failed after retries");
                        }
                    });
                }
            }
        }

        tracing::info!("Task queue worker pool stopped");
    }

    #[tracing::instrument(skip_all, fields(task.id = %task.id, task.type = %task.task_type, task.retry = task.retry_count))]
    async fn process_task_with_retry(
        mut task: Task,
        context: Arc<dyn TaskHandlerContext>,
        config: TaskQueueConfig,
        retry_tx: mpsc::Sender<Task>,
        task_finished_tx: Option<TaskFinishedSender>,
    ) -> Result<()> {
        task.status = TaskStatus::Running;

        let timeout_duration = Duration::from_secs(
            task.timeout_seconds
                .unwrap_or(config.default_timeout_seconds),
        );

        let start = std::time::Instant::now();
        let result = tokio::time::timeout(timeout_duration, context.dispatch_task(&task)).await;

        let error = match result {
            Ok(Ok(task_result)) => {
                Self::notify(&task_finished_tx, task.id, TaskStatus::Completed).await;
                tracing::info!(
                    result = %task_result,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Task completed successfully"
                );
                return Ok(());
            }
            Ok(Err(e)) => e,
            Err(_) => {
                tracing::error!(
                    timeout_seconds = timeout_duration.as_secs(),
                    "Task execution timed out"
                );
                anyhow::anyhow!("Task execution timed out after {}s", timeout_duration.as_secs())
            }
        };

        let is_unrecoverable = error
            .downcast_ref::<TaskError>()
            .map(|te| !te.is_recoverable())
            .unwrap_or(false);

        tracing::error!(
            error = %error,
            retry_count = task.retry_count,
            max_retries = task.max_retries,
            unrecoverable = is_unrecoverable,
            "Task execution failed"
        );

        if !is_unrecoverable && task.can_retry() {
            let backoff = config
                .backoff_unit
                .saturating_mul(compute_retry_backoff_seconds(task.retry_count) as u32);
            task.retry_count += 1;
            task.status = TaskStatus::Scheduled;
            task.scheduled_at = chrono_now_plus(backoff);
            tracing::info!(
                retry_count = task.retry_count,
                backoff_ms = backoff.as_millis() as u64,
                "Scheduling task retry"
            );

            tokio::spawn(async move {
                tokio::time::sleep(backoff).await;
                let task_id = task.id;
                if retry_tx.send(task).await.is_err() {
                    tracing::warn!(task_id = %task_id, "Task queue shut down before retry");
                }
            });
            return Ok(());
        }

        Self::notify(&task_finished_tx, task.id, TaskStatus::Failed).await;
        if is_unrecoverable {
            tracing::error!("Task failed with unrecoverable error, will not retry");
        } else {
            tracing::error!("Task failed after max retries");
        }
        Err(error)
    }

    async fn notify(tx: &Option<TaskFinishedSender>, task_id: Uuid, status: TaskStatus) {
        if let Some(tx) = tx {
            let _ = tx.send((task_id, status)).await;
        }
    }

    /// Signals the worker pool to stop taking new tasks.
    ///
    /// Returns immediately; already-spawned task handlers keep running until they
    /// complete or time out, and pending retries are dropped.
    pub async fn shutdown(&self) {
        tracing::info!("Initiating task queue shutdown");
        let _ = self.shutdown_tx.send(()).await;
    }
}

fn chrono_now_plus(delay: Duration) -> chrono::DateTime<chrono::Utc> {
    chrono::Utc::now() + chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::zero())
}
