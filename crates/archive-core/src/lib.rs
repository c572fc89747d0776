//! Archive Core Library
//!
//! Domain models, error types, configuration and the content-type classifier
//! shared by every archive component.

pub mod config;
pub mod constants;
pub mod content_type;
pub mod error;
pub mod models;
pub mod task_error;

// Re-export commonly used types
pub use config::ArchiveConfig;
pub use content_type::classify;
pub use error::AppError;
pub use task_error::{TaskError, TaskResultExt};
