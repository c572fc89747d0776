//! Key generation for originals and derivatives.

use archive_core::constants::{RECORD_FILE_DIR, VIDEO_PREVIEW_SUFFIX};
use uuid::Uuid;

use crate::traits::{StorageError, StorageResult};

/// Reject keys that could escape the store root.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }
    if key.contains("..") || key.starts_with('/') || key.contains('\\') {
        return Err(StorageError::InvalidKey(format!(
            "Storage key contains invalid characters: {}",
            key
        )));
    }
    Ok(())
}

/// Key of a freshly uploaded original: one uuid directory per upload so that
/// identical filenames never collide.
pub fn original_key(filename: &str) -> String {
    format!("{}/{}/{}", RECORD_FILE_DIR, Uuid::new_v4(), filename)
}

/// The key without its extension (`a/b/photo.jpg` -> `a/b/photo`).
///
/// A dot inside a directory name is not an extension.
pub fn key_stem(key: &str) -> &str {
    let file_start = key.rfind('/').map(|i| i + 1).unwrap_or(0);
    match key[file_start..].rfind('.') {
        Some(dot) if dot > 0 => &key[..file_start + dot],
        _ => key,
    }
}

fn unique_token() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Fresh key for a JPEG thumbnail of `original_key`.
pub fn thumbnail_key(original_key: &str) -> String {
    format!("{}_thumb_{}.jpg", key_stem(original_key), unique_token())
}

/// Fresh key for a JPEG preview of an image.
pub fn image_preview_key(original_key: &str) -> String {
    format!("{}_preview_{}.jpg", key_stem(original_key), unique_token())
}

/// Deterministic key of a video's transcoded preview.
pub fn video_preview_key(original_key: &str) -> String {
    format!("{}{}", key_stem(original_key), VIDEO_PREVIEW_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stem_strips_only_the_file_extension() {
        assert_eq!(key_stem("record_files/abc/photo.jpg"), "record_files/abc/photo");
        assert_eq!(key_stem("record_files/v1.2/readme"), "record_files/v1.2/readme");
        assert_eq!(key_stem("record_files/abc/.hidden"), "record_files/abc/.hidden");
        assert_eq!(key_stem("a.tar.gz"), "a.tar");
    }

    #[test]
    fn video_preview_key_replaces_extension() {
        assert_eq!(
            video_preview_key("record_files/abc/clip.mov"),
            "record_files/abc/clip_preview.mp4"
        );
    }

    #[test]
    fn thumbnail_keys_are_fresh_and_sit_next_to_original() {
        let a = thumbnail_key("record_files/abc/photo.png");
        let b = thumbnail_key("record_files/abc/photo.png");
        assert_ne!(a, b);
        assert!(a.starts_with("record_files/abc/photo_thumb_"));
        assert!(a.ends_with(".jpg"));
    }

    #[test]
    fn image_preview_keys_are_fresh() {
        let a = image_preview_key("record_files/abc/photo.tif");
        assert!(a.starts_with("record_files/abc/photo_preview_"));
        assert_ne!(a, image_preview_key("record_files/abc/photo.tif"));
    }

    #[test]
    fn original_keys_live_under_record_files() {
        let key = original_key("scan.pdf");
        assert!(key.starts_with("record_files/"));
        assert!(key.ends_with("/scan.pdf"));
        assert_eq!(key.split('/').count(), 3);
    }

    #[test]
    fn rejects_traversal() {
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("/etc/passwd").is_err());
        assert!(validate_key("").is_err());
        assert!(validate_key("record_files/a/b.jpg").is_ok());
    }
}
