//! Data models shared by the pipeline, the persistence layer and the worker.

mod derivative;
mod record_file;
mod task;

pub use derivative::*;
pub use record_file::*;
pub use task::*;
