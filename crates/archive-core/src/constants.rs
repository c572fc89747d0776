//! Application-wide constants.

/// Directory (key prefix) under which uploaded record files are stored.
pub const RECORD_FILE_DIR: &str = "record_files";

/// Maximum side of a square thumbnail, in pixels.
pub const THUMBNAIL_SIZE: u32 = 400;

/// Maximum side of an image preview, in pixels.
pub const PREVIEW_SIZE: u32 = 2000;

/// Vertical resolution of transcoded video previews.
pub const VIDEO_PREVIEW_HEIGHT: u32 = 720;

/// Suffix replacing the extension of a video to name its preview.
pub const VIDEO_PREVIEW_SUFFIX: &str = "_preview.mp4";

/// Fallback content type for unknown extensions.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Custom content type for web archive captures (WACZ).
pub const WACZ_CONTENT_TYPE: &str = "application/wacz";

/// Raster formats the image normalizer accepts, by lowercase extension.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tif", "tiff"];
