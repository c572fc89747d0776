//! VideoTranscoder - 720p H.264 baseline previews through ffmpeg.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use archive_core::constants::VIDEO_PREVIEW_HEIGHT;
use archive_core::ArchiveConfig;
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("Failed to execute ffmpeg ({path}): {source}")]
    Spawn {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("FFmpeg timed out after {0}s")]
    Timeout(u64),

    #[error("FFmpeg failed ({status}): {stderr}")]
    Failed { status: String, stderr: String },

    #[error("FFmpeg exited successfully but wrote no output at {0}")]
    MissingOutput(PathBuf),
}

pub struct VideoTranscoder {
    ffmpeg_path: String,
    working_dir: PathBuf,
    timeout: Duration,
}

impl VideoTranscoder {
    pub fn new(ffmpeg_path: impl Into<String>, working_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            working_dir: working_dir.into(),
            timeout,
        }
    }

    pub fn from_config(config: &ArchiveConfig) -> Self {
        Self::new(
            config.ffmpeg_path.clone(),
            config.base_dir.clone(),
            Duration::from_secs(config.transcode_timeout_secs),
        )
    }

    /// ffmpeg arguments for a preview of `input` written to `output`.
    ///
    /// `scale=-2:720` keeps the aspect ratio with an even width, which libx264
    /// requires.
    pub fn build_args(input: &Path, output: &Path) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-vf".to_string(),
            format!("scale=-2:{}", VIDEO_PREVIEW_HEIGHT),
            "-vcodec".to_string(),
            "libx264".to_string(),
            "-profile:v".to_string(),
            "baseline".to_string(),
            "-level".to_string(),
            "3".to_string(),
            output.to_string_lossy().to_string(),
        ]
    }

    /// Transcode `input` into an MP4 preview at `output`.
    ///
    /// The process runs in the configured working directory and is killed when
    /// the timeout elapses.
    #[tracing::instrument(skip(self, input, output), fields(input = %input.display()))]
    pub async fn make_preview(&self, input: &Path, output: &Path) -> Result<(), TranscodeError> {
        let args = Self::build_args(input, output);
        let start = std::time::Instant::now();

        let mut command = Command::new(&self.ffmpeg_path);
        command
            .args(&args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let result = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| TranscodeError::Timeout(self.timeout.as_secs()))?;
        let output_status = result.map_err(|source| TranscodeError::Spawn {
            path: self.ffmpeg_path.clone(),
            source,
        })?;

        if !output_status.status.success() {
            let stderr = String::from_utf8_lossy(&output_status.stderr);
            return Err(TranscodeError::Failed {
                status: output_status.status.to_string(),
                stderr: tail(&stderr, 2000).to_string(),
            });
        }

        if !tokio::fs::try_exists(output).await.unwrap_or(false) {
            return Err(TranscodeError::MissingOutput(output.to_path_buf()));
        }

        tracing::info!(
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Video preview transcoded"
        );

        Ok(())
    }
}

/// Last `max` bytes of ffmpeg's stderr, where the actual error is.
fn tail(text: &str, max: usize) -> &str {
    let text = text.trim();
    if text.len() <= max {
        return text;
    }
    let mut start = text.len() - max;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}
