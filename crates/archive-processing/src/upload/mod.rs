//! Storing new originals

pub mod pipeline;

pub use pipeline::{sanitize_filename, upload_pipeline};
