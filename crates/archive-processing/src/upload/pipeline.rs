//! Upload pipeline: sanitize → classify → store → record.
//!
//! Derivatives are not generated here; the caller enqueues a derivative job for
//! the returned file once this returns.

use anyhow::{Context, Result};
use archive_core::models::ArchivedFile;
use archive_core::{classify, AppError};
use archive_db::RecordFileStore;
use archive_storage::{keys, Storage};
use uuid::Uuid;

const MAX_FILENAME_LENGTH: usize = 255;

/// Reduce a client-supplied name to a safe final path component.
pub fn sanitize_filename(filename: &str) -> Result<String, AppError> {
    let path = std::path::Path::new(filename);
    let filename_only = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);

    if filename_only.contains("..") {
        return Err(AppError::InvalidInput(
            "Filename contains invalid path traversal".to_string(),
        ));
    }

    let sanitized: String = filename_only
        .chars()
        .take(MAX_FILENAME_LENGTH)
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.trim_matches(|c| c == '_' || c == '.').is_empty() {
        return Ok("file".to_string());
    }

    Ok(sanitized)
}

/// Store `data` as a new original of `record_id` and create its file row.
///
/// The content type comes from the sanitized name's extension. If the row
/// cannot be created the stored blob is removed again.
#[tracing::instrument(skip(storage, store, data), fields(size_bytes = data.len()))]
pub async fn upload_pipeline(
    storage: &dyn Storage,
    store: &dyn RecordFileStore,
    record_id: Uuid,
    original_filename: &str,
    data: Vec<u8>,
) -> Result<ArchivedFile> {
    if data.is_empty() {
        return Err(AppError::InvalidInput("Uploaded file is empty".to_string()).into());
    }

    let safe_name = sanitize_filename(original_filename)?;
    let content_type = classify(&safe_name);
    let key = keys::original_key(&safe_name);

    storage
        .upload_with_key(&key, data, content_type)
        .await
        .context("Storage upload failed")?;

    let file = ArchivedFile::new(record_id, key.clone(), content_type);
    let created = match store.create(&file).await {
        Ok(created) => created,
        Err(e) => {
            if let Err(cleanup) = storage.delete(&key).await {
                tracing::warn!(key = %key, error = %cleanup, "Failed to remove orphaned upload");
            }
            return Err(anyhow::Error::new(e).context("Failed to create file record"));
        }
    };

    tracing::info!(
        file_id = %created.id,
        record_id = %record_id,
        key = %created.file,
        content_type = %created.content_type,
        "File uploaded"
    );

    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use archive_db::MemoryRecordFileStore;
    use archive_storage::LocalStorage;

    #[test]
    fn sanitize_filename_rejects_path_traversal() {
        assert!(sanitize_filename("..").is_err());
        assert!(sanitize_filename("foo/..bar").is_err());
        assert!(sanitize_filename("....").is_err());
    }

    #[test]
    fn sanitize_filename_keeps_final_component() {
        assert_eq!(sanitize_filename("image.png").unwrap(), "image.png");
        assert_eq!(sanitize_filename("my-file_1.jpg").unwrap(), "my-file_1.jpg");
        assert_eq!(sanitize_filename("/tmp/uploads/scan 01.tif").unwrap(), "scan_01.tif");
        assert_eq!(sanitize_filename("???").unwrap(), "file");
    }

    #[tokio::test]
    async fn upload_classifies_and_records_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        let store = MemoryRecordFileStore::new();
        let record_id = Uuid::new_v4();

        let file = upload_pipeline(&storage, &store, record_id, "Report.PDF", b"%PDF-1.4".to_vec())
            .await
            .unwrap();

        assert_eq!(file.content_type, "application/pdf");
        assert_eq!(file.record_id, record_id);
        assert!(file.file.starts_with("record_files/"));
        assert!(file.file.ends_with("/Report.PDF"));
        assert!(file.thumbnail.is_none() && file.preview.is_none());
        assert_eq!(storage.download(&file.file).await.unwrap(), b"%PDF-1.4");
        assert_eq!(store.get(file.id).await.unwrap(), Some(file));
    }

    #[tokio::test]
    async fn identical_names_get_distinct_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        let store = MemoryRecordFileStore::new();
        let record_id = Uuid::new_v4();

        let a = upload_pipeline(&storage, &store, record_id, "a.txt", b"one".to_vec())
            .await
            .unwrap();
        let b = upload_pipeline(&storage, &store, record_id, "a.txt", b"two".to_vec())
            .await
            .unwrap();

        assert_ne!(a.file, b.file);
        assert_eq!(storage.download(&a.file).await.unwrap(), b"one");
    }

    #[tokio::test]
    async fn empty_upload_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        let store = MemoryRecordFileStore::new();

        let err = upload_pipeline(&storage, &store, Uuid::new_v4(), "a.jpg", Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<AppError>(), Some(AppError::InvalidInput(_))));
        assert!(store.list_all().await.unwrap().is_empty());
    }
}
