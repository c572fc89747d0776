use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::WACZ_CONTENT_TYPE;

/// An uploaded blob attached to a record.
///
/// `file` is the blob-store key of the original. `thumbnail` and `preview` stay
/// `None` until the corresponding derivative pass succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ArchivedFile {
    pub id: Uuid,
    pub record_id: Uuid,
    pub file: String,
    pub content_type: String,
    pub thumbnail: Option<String>,
    pub preview: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

impl ArchivedFile {
    pub fn new(record_id: Uuid, file: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            record_id,
            file: file.into(),
            content_type: content_type.into(),
            thumbnail: None,
            preview: None,
            uploaded_at: Utc::now(),
        }
    }

    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }

    pub fn is_video(&self) -> bool {
        self.content_type.starts_with("video/")
    }

    pub fn is_pdf(&self) -> bool {
        self.content_type == "application/pdf"
    }

    pub fn is_wacz(&self) -> bool {
        self.content_type == WACZ_CONTENT_TYPE
    }

    /// Whether the presentation layer can show something richer than a download link.
    pub fn is_previewable(&self) -> bool {
        self.preview.is_some() || self.is_pdf() || self.is_wacz()
    }
}

/// Capability contract for anything the derivative pipeline can process.
///
/// The pipeline reads the original's key and content type and writes derivative
/// keys back; it never inspects other fields.
pub trait DerivativeTarget: Send + Sync {
    fn file_id(&self) -> Uuid;
    fn original_path(&self) -> &str;
    fn content_type(&self) -> &str;
    fn set_thumbnail(&mut self, path: String);
    fn set_preview(&mut self, path: String);
}

impl DerivativeTarget for ArchivedFile {
    fn file_id(&self) -> Uuid {
        self.id
    }

    fn original_path(&self) -> &str {
        &self.file
    }

    fn content_type(&self) -> &str {
        &self.content_type
    }

    fn set_thumbnail(&mut self, path: String) {
        self.thumbnail = Some(path);
    }

    fn set_preview(&mut self, path: String) {
        self.preview = Some(path);
    }
}

/// The display thumbnail of a record: the first file, in upload order, that has one.
pub fn select_record_thumbnail(files: &[ArchivedFile]) -> Option<&ArchivedFile> {
    let mut ordered: Vec<&ArchivedFile> = files.iter().collect();
    ordered.sort_by_key(|f| f.uploaded_at);
    ordered.into_iter().find(|f| f.thumbnail.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn content_type_predicates() {
        let record = Uuid::new_v4();
        assert!(ArchivedFile::new(record, "a.jpg", "image/jpeg").is_image());
        assert!(ArchivedFile::new(record, "a.mp4", "video/mp4").is_video());
        assert!(ArchivedFile::new(record, "a.pdf", "application/pdf").is_pdf());
        assert!(ArchivedFile::new(record, "a.wacz", "application/wacz").is_wacz());
    }

    #[test]
    fn previewable_when_pdf_wacz_or_preview_present() {
        let record = Uuid::new_v4();
        assert!(ArchivedFile::new(record, "a.pdf", "application/pdf").is_previewable());
        assert!(ArchivedFile::new(record, "a.wacz", "application/wacz").is_previewable());

        let mut image = ArchivedFile::new(record, "a.png", "image/png");
        assert!(!image.is_previewable());
        image.set_preview("a_preview.jpg".to_string());
        assert!(image.is_previewable());
    }

    #[test]
    fn record_thumbnail_is_first_uploaded_with_thumbnail() {
        let record = Uuid::new_v4();
        let now = Utc::now();

        let mut first = ArchivedFile::new(record, "first.txt", "text/plain");
        first.uploaded_at = now - Duration::minutes(3);

        let mut second = ArchivedFile::new(record, "second.jpg", "image/jpeg");
        second.uploaded_at = now - Duration::minutes(2);
        second.thumbnail = Some("second_thumb.jpg".to_string());

        let mut third = ArchivedFile::new(record, "third.jpg", "image/jpeg");
        third.uploaded_at = now - Duration::minutes(1);
        third.thumbnail = Some("third_thumb.jpg".to_string());

        let files = vec![third, first, second.clone()];
        assert_eq!(select_record_thumbnail(&files).map(|f| f.id), Some(second.id));
    }

    #[test]
    fn record_without_thumbnails_has_none() {
        let files = vec![ArchivedFile::new(Uuid::new_v4(), "doc.txt", "text/plain")];
        assert!(select_record_thumbnail(&files).is_none());
    }
}
