//! Content-type classification by filename extension.
//!
//! The extension table is built once per process and never mutated. Web archive
//! captures (`.wacz`) are not part of the standard table and are layered on top.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use crate::constants::{OCTET_STREAM, WACZ_CONTENT_TYPE};

static STANDARD_TYPES: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        // Images
        ("jpg", "image/jpeg"),
        ("jpeg", "image/jpeg"),
        ("jpe", "image/jpeg"),
        ("png", "image/png"),
        ("gif", "image/gif"),
        ("bmp", "image/bmp"),
        ("tif", "image/tiff"),
        ("tiff", "image/tiff"),
        ("webp", "image/webp"),
        ("avif", "image/avif"),
        ("heic", "image/heic"),
        ("svg", "image/svg+xml"),
        ("ico", "image/vnd.microsoft.icon"),
        // Video
        ("mp4", "video/mp4"),
        ("m4v", "video/x-m4v"),
        ("mov", "video/quicktime"),
        ("qt", "video/quicktime"),
        ("avi", "video/x-msvideo"),
        ("mkv", "video/x-matroska"),
        ("webm", "video/webm"),
        ("mpeg", "video/mpeg"),
        ("mpg", "video/mpeg"),
        ("3gp", "video/3gpp"),
        ("ogv", "video/ogg"),
        // Audio
        ("mp3", "audio/mpeg"),
        ("wav", "audio/x-wav"),
        ("ogg", "audio/ogg"),
        ("oga", "audio/ogg"),
        ("flac", "audio/flac"),
        ("m4a", "audio/mp4"),
        ("aac", "audio/aac"),
        ("opus", "audio/opus"),
        // Documents
        ("pdf", "application/pdf"),
        ("doc", "application/msword"),
        (
            "docx",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        ),
        ("xls", "application/vnd.ms-excel"),
        (
            "xlsx",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        ),
        ("ppt", "application/vnd.ms-powerpoint"),
        (
            "pptx",
            "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        ),
        ("odt", "application/vnd.oasis.opendocument.text"),
        ("ods", "application/vnd.oasis.opendocument.spreadsheet"),
        ("rtf", "application/rtf"),
        ("epub", "application/epub+zip"),
        // Text
        ("txt", "text/plain"),
        ("text", "text/plain"),
        ("csv", "text/csv"),
        ("md", "text/markdown"),
        ("html", "text/html"),
        ("htm", "text/html"),
        ("css", "text/css"),
        ("js", "text/javascript"),
        ("xml", "text/xml"),
        ("json", "application/json"),
        // Archives
        ("zip", "application/zip"),
        ("tar", "application/x-tar"),
        ("gz", "application/gzip"),
        ("warc", "application/warc"),
    ])
});

/// Lowercase extension of `filename` without the leading dot, if any.
pub fn extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// Map a filename to its MIME type.
///
/// Never fails: unknown or missing extensions yield `application/octet-stream`.
pub fn classify(filename: &str) -> &'static str {
    let Some(ext) = extension(filename) else {
        return OCTET_STREAM;
    };

    if let Some(content_type) = STANDARD_TYPES.get(ext.as_str()) {
        return content_type;
    }

    if ext == "wacz" {
        return WACZ_CONTENT_TYPE;
    }

    OCTET_STREAM
}
