//! Archive processing library
//!
//! Turns an uploaded original into its derivatives: a square JPEG thumbnail and a
//! preview (bounded JPEG for images, 720p H.264 for video). PDFs get a thumbnail
//! of their first page and no preview.

pub mod document;
pub mod error;
pub mod image;
pub mod orchestrator;
pub mod outcome;
pub mod upload;
pub mod video;

pub use document::{DocumentRasterizer, RasterizeError};
pub use error::DerivativeError;
pub use self::image::ImageNormalizer;
pub use orchestrator::{DerivativeOrchestrator, DerivativeReport};
pub use outcome::{PassOutcome, SkipReason};
pub use upload::{sanitize_filename, upload_pipeline};
pub use video::{TranscodeError, VideoTranscoder};
