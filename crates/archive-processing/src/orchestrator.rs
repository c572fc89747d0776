//! Derivative orchestration: picks a generator per file type, stores the result
//! under a fresh key and records the key on the file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use archive_core::constants::VIDEO_PREVIEW_HEIGHT;
use archive_core::content_type;
use archive_core::models::{Derivative, DerivativeFormat, DerivativeKind, DerivativeTarget};
use archive_core::ArchiveConfig;
use archive_db::RecordFileStore;
use archive_storage::{keys, Storage, StorageError};
use futures::StreamExt;
use image::DynamicImage;
use serde::Serialize;
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::document::DocumentRasterizer;
use crate::error::DerivativeError;
use crate::image::{is_supported_raster, ImageNormalizer};
use crate::outcome::{PassOutcome, SkipReason};
use crate::video::VideoTranscoder;

/// Outcome of both passes for one file.
#[derive(Debug, Clone, Serialize)]
pub struct DerivativeReport {
    pub file_id: Uuid,
    pub thumbnail: PassOutcome,
    pub preview: PassOutcome,
}

impl DerivativeReport {
    pub fn outcome(&self, kind: DerivativeKind) -> &PassOutcome {
        match kind {
            DerivativeKind::Thumbnail => &self.thumbnail,
            DerivativeKind::Preview => &self.preview,
        }
    }
}

/// A source blob available on the local filesystem, possibly staged into a
/// temporary directory that lives as long as this value.
struct StagedSource {
    path: PathBuf,
    _dir: Option<TempDir>,
}

pub struct DerivativeOrchestrator {
    storage: Arc<dyn Storage>,
    store: Arc<dyn RecordFileStore>,
    normalizer: ImageNormalizer,
    rasterizer: DocumentRasterizer,
    transcoder: VideoTranscoder,
    thumbnail_size: u32,
    preview_size: u32,
}

impl DerivativeOrchestrator {
    pub fn new(
        storage: Arc<dyn Storage>,
        store: Arc<dyn RecordFileStore>,
        config: &ArchiveConfig,
    ) -> Self {
        Self {
            storage,
            store,
            normalizer: ImageNormalizer::new(config.jpeg_quality),
            rasterizer: DocumentRasterizer::from_config(config),
            transcoder: VideoTranscoder::from_config(config),
            thumbnail_size: config.thumbnail_size,
            preview_size: config.preview_size,
        }
    }

    pub fn store(&self) -> &Arc<dyn RecordFileStore> {
        &self.store
    }

    /// Run both passes.
    pub async fn process<T: DerivativeTarget>(
        &self,
        target: &mut T,
    ) -> Result<DerivativeReport, DerivativeError> {
        self.run_passes(target, &[DerivativeKind::Thumbnail, DerivativeKind::Preview])
            .await
    }

    /// Run the requested passes, thumbnail first. Passes not listed are reported
    /// as skipped.
    ///
    /// Errors are returned only when a retry could help (source blob missing,
    /// storage or database unavailable); generator failures become
    /// [`PassOutcome::Failed`].
    #[tracing::instrument(skip(self, target), fields(file_id = %target.file_id(), key = %target.original_path()))]
    pub async fn run_passes<T: DerivativeTarget>(
        &self,
        target: &mut T,
        passes: &[DerivativeKind],
    ) -> Result<DerivativeReport, DerivativeError> {
        let original = target.original_path().to_string();
        if !self.storage.exists(&original).await? {
            tracing::warn!("Source blob missing");
            return Err(DerivativeError::SourceMissing(original));
        }

        let thumbnail = if passes.contains(&DerivativeKind::Thumbnail) {
            self.thumbnail_pass(target).await?
        } else {
            PassOutcome::skipped(SkipReason::NotRequested)
        };

        let preview = if passes.contains(&DerivativeKind::Preview) {
            self.preview_pass(target).await?
        } else {
            PassOutcome::skipped(SkipReason::NotRequested)
        };

        tracing::info!(thumbnail = %thumbnail, preview = %preview, "Derivative passes finished");

        Ok(DerivativeReport {
            file_id: target.file_id(),
            thumbnail,
            preview,
        })
    }

    /// Thumbnail by extension: PDFs are rendered first, allow-listed rasters are
    /// decoded directly, anything else is skipped.
    pub async fn thumbnail_pass<T: DerivativeTarget>(
        &self,
        target: &mut T,
    ) -> Result<PassOutcome, DerivativeError> {
        let original = target.original_path().to_string();
        let is_pdf = content_type::extension(&original).as_deref() == Some("pdf");

        let result = if is_pdf {
            self.pdf_thumbnail(&original).await
        } else if is_supported_raster(&original) {
            self.raster_derivative(&original, DerivativeKind::Thumbnail).await
        } else {
            return Ok(PassOutcome::skipped(SkipReason::UnsupportedType));
        };

        self.settle(target, DerivativeKind::Thumbnail, result).await
    }

    /// Preview by content-type family: video is transcoded, images are bounded
    /// without cropping, everything else (PDF included) gets none.
    pub async fn preview_pass<T: DerivativeTarget>(
        &self,
        target: &mut T,
    ) -> Result<PassOutcome, DerivativeError> {
        let original = target.original_path().to_string();
        let content_type = target.content_type().to_string();

        let result = if content_type.starts_with("video/") {
            self.video_preview(&original).await
        } else if content_type.starts_with("image/") && is_supported_raster(&original) {
            self.raster_derivative(&original, DerivativeKind::Preview).await
        } else {
            return Ok(PassOutcome::skipped(SkipReason::UnsupportedType));
        };

        self.settle(target, DerivativeKind::Preview, result).await
    }

    /// Record a generated derivative on the row and the target, or turn a final
    /// generator error into a failed pass.
    async fn settle<T: DerivativeTarget>(
        &self,
        target: &mut T,
        kind: DerivativeKind,
        result: Result<Option<Derivative>, DerivativeError>,
    ) -> Result<PassOutcome, DerivativeError> {
        match result {
            Ok(Some(derivative)) => {
                self.store
                    .set_derivative(target.file_id(), kind, &derivative.path)
                    .await?;
                match kind {
                    DerivativeKind::Thumbnail => target.set_thumbnail(derivative.path.clone()),
                    DerivativeKind::Preview => target.set_preview(derivative.path.clone()),
                }
                tracing::info!(kind = %kind, key = %derivative.path, "Derivative stored");
                Ok(PassOutcome::Generated(derivative))
            }
            Ok(None) => Ok(PassOutcome::skipped(SkipReason::NoPages)),
            Err(e) if e.is_retryable() => Err(e),
            Err(e) => {
                tracing::warn!(kind = %kind, error = %e, "Derivative generation failed");
                Ok(PassOutcome::failed(e.to_string()))
            }
        }
    }

    async fn pdf_thumbnail(&self, original: &str) -> Result<Option<Derivative>, DerivativeError> {
        let source = self.stage_source(original).await?;
        let Some(page) = self.rasterizer.rasterize_first_page(&source.path).await? else {
            return Ok(None);
        };
        self.store_jpeg(original, page, DerivativeKind::Thumbnail)
            .await
            .map(Some)
    }

    async fn raster_derivative(
        &self,
        original: &str,
        kind: DerivativeKind,
    ) -> Result<Option<Derivative>, DerivativeError> {
        let data = self.download_source(original).await?;
        let image = tokio::task::spawn_blocking(move || ImageNormalizer::decode(&data)).await??;
        self.store_jpeg(original, image, kind).await.map(Some)
    }

    /// Encode off the async runtime and upload under a fresh key.
    async fn store_jpeg(
        &self,
        original: &str,
        image: DynamicImage,
        kind: DerivativeKind,
    ) -> Result<Derivative, DerivativeError> {
        let normalizer = self.normalizer;
        let (max_size, key) = match kind {
            DerivativeKind::Thumbnail => (self.thumbnail_size, keys::thumbnail_key(original)),
            DerivativeKind::Preview => (self.preview_size, keys::image_preview_key(original)),
        };

        let jpeg = tokio::task::spawn_blocking(move || match kind {
            DerivativeKind::Thumbnail => normalizer.make_square_thumbnail(&image, max_size),
            DerivativeKind::Preview => normalizer.make_preview(&image, max_size),
        })
        .await??;

        let format = DerivativeFormat::Jpeg;
        self.storage
            .upload_with_key(&key, jpeg, format.content_type())
            .await?;

        Ok(Derivative {
            kind,
            path: key,
            format,
        })
    }

    async fn video_preview(&self, original: &str) -> Result<Option<Derivative>, DerivativeError> {
        let source = self.stage_source(original).await?;
        let work_dir = TempDir::new()?;
        let output = work_dir.path().join(format!("preview_{}p.mp4", VIDEO_PREVIEW_HEIGHT));

        self.transcoder.make_preview(&source.path, &output).await?;

        let format = DerivativeFormat::Mp4;
        let key = keys::video_preview_key(original);
        self.storage
            .upload_file(&key, &output, format.content_type())
            .await?;

        Ok(Some(Derivative {
            kind: DerivativeKind::Preview,
            path: key,
            format,
        }))
    }

    async fn download_source(&self, original: &str) -> Result<Vec<u8>, DerivativeError> {
        self.storage.download(original).await.map_err(|e| match e {
            StorageError::NotFound(key) => DerivativeError::SourceMissing(key),
            other => DerivativeError::Storage(other),
        })
    }

    /// A filesystem path for external tools: the blob itself when the backend
    /// exposes one, otherwise a streamed copy in a temporary directory. The copy
    /// keeps the original file name so tools can sniff the extension.
    async fn stage_source(&self, original: &str) -> Result<StagedSource, DerivativeError> {
        if let Some(path) = self.storage.local_path(original) {
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                return Ok(StagedSource {
                    path: absolute(&path)?,
                    _dir: None,
                });
            }
        }

        let dir = TempDir::new()?;
        let file_name = Path::new(original)
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "source".into());
        let path = dir.path().join(file_name);

        let mut stream = self.storage.download_stream(original).await.map_err(|e| match e {
            StorageError::NotFound(key) => DerivativeError::SourceMissing(key),
            other => DerivativeError::Storage(other),
        })?;
        let mut file = tokio::fs::File::create(&path).await?;
        while let Some(chunk) = stream.next().await {
            file.write_all(&chunk?).await?;
        }
        file.flush().await?;

        Ok(StagedSource {
            path,
            _dir: Some(dir),
        })
    }
}

/// External tools run in the configured base directory, so relative paths must
/// not leak into their arguments.
fn absolute(path: &Path) -> Result<PathBuf, std::io::Error> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
