//! Removal of blobs no file row references.

use anyhow::{Context, Result};
use archive_core::constants::RECORD_FILE_DIR;
use archive_db::RecordFileStore;
use archive_storage::Storage;
use serde::Serialize;

#[derive(Debug, Default, Serialize)]
pub struct CleanReport {
    pub scanned: usize,
    pub unreferenced: Vec<String>,
    pub deleted: usize,
    pub directories_removed: usize,
    pub dry_run: bool,
}

/// Delete every blob under the record file prefix that is neither an original,
/// a thumbnail nor a preview of some file row, then prune empty directories.
///
/// With `dry_run` nothing is deleted; the report lists what would be.
#[tracing::instrument(skip(storage, store))]
pub async fn clean_files(
    storage: &dyn Storage,
    store: &dyn RecordFileStore,
    dry_run: bool,
) -> Result<CleanReport> {
    let prefix = format!("{}/", RECORD_FILE_DIR);
    let keys = storage
        .list_keys(&prefix)
        .await
        .context("Failed to list stored blobs")?;
    let referenced = store
        .referenced_paths()
        .await
        .context("Failed to load referenced paths")?;

    let mut report = CleanReport {
        scanned: keys.len(),
        dry_run,
        ..CleanReport::default()
    };

    for key in keys {
        if referenced.contains(&key) {
            continue;
        }
        if !dry_run {
            storage
                .delete(&key)
                .await
                .with_context(|| format!("Failed to delete {}", key))?;
            report.deleted += 1;
            tracing::info!(key = %key, "Deleted unreferenced blob");
        }
        report.unreferenced.push(key);
    }

    if !dry_run {
        report.directories_removed = storage
            .prune_empty_dirs(&prefix)
            .await
            .context("Failed to prune empty directories")?;
    }

    tracing::info!(
        scanned = report.scanned,
        unreferenced = report.unreferenced.len(),
        deleted = report.deleted,
        directories_removed = report.directories_removed,
        "File cleanup finished"
    );

    Ok(report)
}
