use crate::{LocalStorage, Storage, StorageResult};
use archive_core::ArchiveConfig;
use std::sync::Arc;

/// Create the blob store described by the configuration.
pub async fn create_storage(config: &ArchiveConfig) -> StorageResult<Arc<dyn Storage>> {
    let storage = LocalStorage::new(&config.media_root).await?;
    tracing::info!(
        backend = storage.backend_name(),
        media_root = %config.media_root.display(),
        "Storage initialized"
    );
    Ok(Arc::new(storage))
}
