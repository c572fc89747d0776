use std::collections::{HashMap, HashSet};

use archive_core::models::{ArchivedFile, DerivativeKind};
use archive_core::AppError;
use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::store::RecordFileStore;

/// Process-local store used by tests and by the command-line tools when no
/// database is configured.
#[derive(Default)]
pub struct MemoryRecordFileStore {
    files: RwLock<HashMap<Uuid, ArchivedFile>>,
}

impl MemoryRecordFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn ordered<'a>(files: impl Iterator<Item = &'a ArchivedFile>) -> Vec<ArchivedFile> {
        let mut files: Vec<ArchivedFile> = files.cloned().collect();
        files.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at).then(a.id.cmp(&b.id)));
        files
    }
}

#[async_trait]
impl RecordFileStore for MemoryRecordFileStore {
    async fn create(&self, file: &ArchivedFile) -> Result<ArchivedFile, AppError> {
        let mut files = self.files.write().await;
        if files.contains_key(&file.id) {
            return Err(AppError::InvalidInput(format!(
                "record file {} already exists",
                file.id
            )));
        }
        files.insert(file.id, file.clone());
        Ok(file.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<ArchivedFile>, AppError> {
        Ok(self.files.read().await.get(&id).cloned())
    }

    async fn list_for_record(&self, record_id: Uuid) -> Result<Vec<ArchivedFile>, AppError> {
        let files = self.files.read().await;
        Ok(Self::ordered(
            files.values().filter(|f| f.record_id == record_id),
        ))
    }

    async fn list_all(&self) -> Result<Vec<ArchivedFile>, AppError> {
        Ok(Self::ordered(self.files.read().await.values()))
    }

    async fn list_missing(&self, kind: DerivativeKind) -> Result<Vec<ArchivedFile>, AppError> {
        let files = self.files.read().await;
        Ok(Self::ordered(files.values().filter(|f| match kind {
            DerivativeKind::Thumbnail => f.thumbnail.is_none(),
            DerivativeKind::Preview => f.preview.is_none(),
        })))
    }

    async fn set_derivative(
        &self,
        id: Uuid,
        kind: DerivativeKind,
        path: &str,
    ) -> Result<(), AppError> {
        let mut files = self.files.write().await;
        let file = files
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("record file {}", id)))?;
        match kind {
            DerivativeKind::Thumbnail => file.thumbnail = Some(path.to_string()),
            DerivativeKind::Preview => file.preview = Some(path.to_string()),
        }
        Ok(())
    }

    async fn referenced_paths(&self) -> Result<HashSet<String>, AppError> {
        let files = self.files.read().await;
        let mut paths = HashSet::new();
        for file in files.values() {
            paths.insert(file.file.clone());
            paths.extend(file.thumbnail.clone());
            paths.extend(file.preview.clone());
        }
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn file(record_id: Uuid, name: &str, content_type: &str, age_minutes: i64) -> ArchivedFile {
        let mut file = ArchivedFile::new(record_id, format!("record_files/x/{}", name), content_type);
        file.uploaded_at = Utc::now() - Duration::minutes(age_minutes);
        file
    }

    #[tokio::test]
    async fn create_and_get() {
        let store = MemoryRecordFileStore::new();
        let created = store
            .create(&file(Uuid::new_v4(), "a.jpg", "image/jpeg", 0))
            .await
            .unwrap();

        assert_eq!(store.get(created.id).await.unwrap(), Some(created.clone()));
        assert!(store.create(&created).await.is_err());
        assert!(store.get(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_missing_filters_by_column() {
        let store = MemoryRecordFileStore::new();
        let record = Uuid::new_v4();
        let a = store.create(&file(record, "a.jpg", "image/jpeg", 2)).await.unwrap();
        let b = store.create(&file(record, "b.jpg", "image/jpeg", 1)).await.unwrap();

        store
            .set_derivative(a.id, DerivativeKind::Thumbnail, "record_files/x/a_thumb_1.jpg")
            .await
            .unwrap();

        let missing_thumbs = store.list_missing(DerivativeKind::Thumbnail).await.unwrap();
        assert_eq!(missing_thumbs.iter().map(|f| f.id).collect::<Vec<_>>(), vec![b.id]);

        let missing_previews = store.list_missing(DerivativeKind::Preview).await.unwrap();
        assert_eq!(
            missing_previews.iter().map(|f| f.id).collect::<Vec<_>>(),
            vec![a.id, b.id]
        );
    }

    #[tokio::test]
    async fn set_derivative_on_missing_row_is_not_found() {
        let store = MemoryRecordFileStore::new();
        let err = store
            .set_derivative(Uuid::new_v4(), DerivativeKind::Preview, "x.mp4")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn referenced_paths_cover_all_columns() {
        let store = MemoryRecordFileStore::new();
        let created = store
            .create(&file(Uuid::new_v4(), "clip.mov", "video/quicktime", 0))
            .await
            .unwrap();
        store
            .set_derivative(created.id, DerivativeKind::Preview, "record_files/x/clip_preview.mp4")
            .await
            .unwrap();

        let paths = store.referenced_paths().await.unwrap();
        assert!(paths.contains("record_files/x/clip.mov"));
        assert!(paths.contains("record_files/x/clip_preview.mp4"));
        assert_eq!(paths.len(), 2);
    }

    #[tokio::test]
    async fn list_for_record_is_in_upload_order() {
        let store = MemoryRecordFileStore::new();
        let record = Uuid::new_v4();
        let newer = store.create(&file(record, "n.jpg", "image/jpeg", 1)).await.unwrap();
        let older = store.create(&file(record, "o.jpg", "image/jpeg", 5)).await.unwrap();
        store
            .create(&file(Uuid::new_v4(), "other.jpg", "image/jpeg", 9))
            .await
            .unwrap();

        let files = store.list_for_record(record).await.unwrap();
        assert_eq!(files.iter().map(|f| f.id).collect::<Vec<_>>(), vec![older.id, newer.id]);
    }
}
