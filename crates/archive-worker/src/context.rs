//! Task dispatch
//!
//! The worker calls [`TaskHandlerContext::dispatch_task`] for every task it
//! runs. [`HandlerRegistry`] implements it by routing each task type to its
//! [`TaskHandler`].

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use archive_core::models::{Task, TaskType};
use archive_core::TaskError;

/// Context for task dispatch.
#[async_trait]
pub trait TaskHandlerContext: Send + Sync {
    /// Dispatch a task to the appropriate handler and return the result.
    ///
    /// A failed task's error may wrap a [`TaskError`]; unrecoverable ones are
    /// not retried.
    async fn dispatch_task(self: Arc<Self>, task: &Task) -> Result<serde_json::Value>;
}

/// Handles one task type.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    fn task_type(&self) -> TaskType;

    async fn handle(&self, task: &Task) -> Result<serde_json::Value, TaskError>;
}

#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<TaskType, Arc<dyn TaskHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any previous one for the same type.
    pub fn register(mut self, handler: Arc<dyn TaskHandler>) -> Self {
        self.handlers.insert(handler.task_type(), handler);
        self
    }
}

#[async_trait]
impl TaskHandlerContext for HandlerRegistry {
    async fn dispatch_task(self: Arc<Self>, task: &Task) -> Result<serde_json::Value> {
        let handler = self.handlers.get(&task.task_type).ok_or_else(|| {
            anyhow::Error::new(TaskError::unrecoverable(anyhow!(
                "No handler registered for task type {}",
                task.task_type
            )))
        })?;

        handler.handle(task).await.map_err(anyhow::Error::new)
    }
}
