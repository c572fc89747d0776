//! Video previews

pub mod transcoder;

pub use transcoder::{TranscodeError, VideoTranscoder};
