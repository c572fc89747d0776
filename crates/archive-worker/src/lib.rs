//! Archive worker
//!
//! An in-process task queue with a bounded worker pool, retries with capped
//! exponential backoff and per-task timeouts, plus the handler that runs
//! derivative jobs.

pub mod context;
pub mod handlers;
pub mod locks;
pub mod queue;

pub use context::{HandlerRegistry, TaskHandler, TaskHandlerContext};
pub use handlers::DerivativeTaskHandler;
pub use locks::KeyedLocks;
pub use queue::{TaskFinishedSender, TaskQueue, TaskQueueConfig, MAX_RETRY_BACKOFF_SECS};
