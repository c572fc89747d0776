//! First-page rasterization of PDFs through poppler's `pdftoppm`.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use archive_core::ArchiveConfig;
use image::DynamicImage;
use tempfile::TempDir;
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum RasterizeError {
    #[error("Failed to execute {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Rendering timed out after {0}s")]
    Timeout(u64),

    #[error("Failed to prepare render directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("Rendered page could not be decoded: {0}")]
    Decode(#[from] image::ImageError),
}

/// Renders page 1 of a PDF to a raster image.
#[derive(Debug, Clone)]
pub struct DocumentRasterizer {
    pdftoppm_path: String,
    dpi: u32,
    timeout: Duration,
}

impl DocumentRasterizer {
    pub fn new(pdftoppm_path: impl Into<String>, dpi: u32, timeout: Duration) -> Self {
        Self {
            pdftoppm_path: pdftoppm_path.into(),
            dpi,
            timeout,
        }
    }

    pub fn from_config(config: &ArchiveConfig) -> Self {
        Self::new(
            config.pdftoppm_path.clone(),
            config.pdf_render_dpi,
            Duration::from_secs(config.pdf_render_timeout_secs),
        )
    }

    fn build_args(&self, input: &Path, output_prefix: &Path) -> Vec<String> {
        vec![
            "-png".to_string(),
            "-f".to_string(),
            "1".to_string(),
            "-l".to_string(),
            "1".to_string(),
            "-r".to_string(),
            self.dpi.to_string(),
            "-singlefile".to_string(),
            input.to_string_lossy().to_string(),
            output_prefix.to_string_lossy().to_string(),
        ]
    }

    /// Render the first page.
    ///
    /// Returns `Ok(None)` when the document yields no page: it is empty, corrupt,
    /// or the renderer exits unsuccessfully without output. Only a renderer that
    /// cannot be started or runs past the timeout is an error.
    #[tracing::instrument(skip(self, input), fields(input = %input.display()))]
    pub async fn rasterize_first_page(
        &self,
        input: &Path,
    ) -> Result<Option<DynamicImage>, RasterizeError> {
        let work_dir = TempDir::new()?;
        let prefix = work_dir.path().join("page");
        let args = self.build_args(input, &prefix);

        let start = std::time::Instant::now();
        let mut command = Command::new(&self.pdftoppm_path);
        command
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| RasterizeError::Timeout(self.timeout.as_secs()))?
            .map_err(|source| RasterizeError::Spawn {
                tool: self.pdftoppm_path.clone(),
                source,
            })?;

        if !output.status.success() {
            tracing::warn!(
                status = %output.status,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "Document rendered no pages"
            );
            return Ok(None);
        }

        let Some(page) = find_rendered_page(work_dir.path()).await? else {
            tracing::debug!("Renderer produced no page");
            return Ok(None);
        };

        let data = tokio::fs::read(&page).await?;
        let image = tokio::task::spawn_blocking(move || {
            crate::image::ImageNormalizer::decode(&data)
        })
        .await
        .map_err(|e| RasterizeError::Io(std::io::Error::other(e)))??;

        tracing::debug!(
            width = image.width(),
            height = image.height(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Rendered first page"
        );

        Ok(Some(image))
    }
}

/// The rendered PNG, if any. `-singlefile` names it `page.png`, but older
/// poppler releases ignore the flag and append a page number.
async fn find_rendered_page(dir: &Path) -> Result<Option<PathBuf>, std::io::Error> {
    let mut pages = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("png") {
            pages.push(path);
        }
    }
    pages.sort();
    Ok(pages.into_iter().next())
}
