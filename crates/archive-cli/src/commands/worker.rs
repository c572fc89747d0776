//! The long-running worker: feeds files missing derivatives into the queue.

use std::collections::HashSet;
use std::time::Duration;

use anyhow::{Context, Result};
use archive_core::models::{DerivativeJobPayload, DerivativeKind};
use archive_db::RecordFileStore;
use archive_worker::TaskQueue;
use uuid::Uuid;

/// Submit one job per file that lacks a thumbnail or preview and has not been
/// submitted by this process before. Returns the number of jobs submitted.
///
/// Ids whose derivatives have since been filled are dropped from `seen`, so a
/// file whose derivative is cleared later is picked up again. A file that stays
/// missing (unsupported type, failed pass) is not resubmitted.
pub async fn enqueue_missing(
    store: &dyn RecordFileStore,
    queue: &TaskQueue,
    seen: &mut HashSet<Uuid>,
) -> Result<usize> {
    let missing_thumbs = store.list_missing(DerivativeKind::Thumbnail).await?;
    let missing_previews = store.list_missing(DerivativeKind::Preview).await?;
    let thumb_ids: HashSet<Uuid> = missing_thumbs.iter().map(|f| f.id).collect();
    let preview_ids: HashSet<Uuid> = missing_previews.iter().map(|f| f.id).collect();

    seen.retain(|id| thumb_ids.contains(id) || preview_ids.contains(id));

    let mut submitted = 0;
    for file in missing_thumbs.iter().chain(missing_previews.iter()) {
        if !seen.insert(file.id) {
            continue;
        }

        let payload = match (thumb_ids.contains(&file.id), preview_ids.contains(&file.id)) {
            (true, true) => DerivativeJobPayload::all(file.id),
            (true, false) => DerivativeJobPayload::only(file.id, DerivativeKind::Thumbnail),
            _ => DerivativeJobPayload::only(file.id, DerivativeKind::Preview),
        };
        queue.submit_derivative_job(&payload).await?;
        submitted += 1;
    }

    Ok(submitted)
}

/// Poll for new work until Ctrl-C.
pub async fn run_worker(
    store: &dyn RecordFileStore,
    queue: &TaskQueue,
    poll_interval: Duration,
) -> Result<()> {
    let mut seen = HashSet::new();
    let mut interval = tokio::time::interval(poll_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    tracing::info!(poll_interval_secs = poll_interval.as_secs(), "Worker started");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match enqueue_missing(store, queue, &mut seen).await {
                    Ok(0) => tracing::trace!("No new files to process"),
                    Ok(submitted) => tracing::info!(submitted, "Derivative jobs submitted"),
                    Err(e) => tracing::error!(error = %e, "Failed to scan for files"),
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for shutdown signal")?;
                tracing::info!("Shutdown signal received");
                break;
            }
        }
    }

    queue.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use archive_core::models::ArchivedFile;
    use archive_db::MemoryRecordFileStore;
    use archive_worker::{HandlerRegistry, TaskQueueConfig};

    #[tokio::test]
    async fn submits_each_file_once() {
        let store = MemoryRecordFileStore::new();
        let record_id = Uuid::new_v4();
        let bare = ArchivedFile::new(record_id, "record_files/a/scan.pdf", "application/pdf");
        let mut thumbed = ArchivedFile::new(record_id, "record_files/b/photo.png", "image/png");
        thumbed.thumbnail = Some("record_files/b/photo_thumb_0badc0de.jpg".to_string());
        let mut complete = ArchivedFile::new(record_id, "record_files/c/clip.mp4", "video/mp4");
        complete.thumbnail = Some("record_files/c/clip_thumb_12345678.jpg".to_string());
        complete.preview = Some("record_files/c/clip_preview.mp4".to_string());
        for file in [&bare, &thumbed, &complete] {
            store.create(file).await.unwrap();
        }

        let queue = TaskQueue::new(
            TaskQueueConfig::default(),
            Arc::new(HandlerRegistry::new()),
            None,
        );
        let mut seen = HashSet::new();

        assert_eq!(enqueue_missing(&store, &queue, &mut seen).await.unwrap(), 2);
        assert!(seen.contains(&bare.id));
        assert!(seen.contains(&thumbed.id));
        assert!(!seen.contains(&complete.id));

        assert_eq!(enqueue_missing(&store, &queue, &mut seen).await.unwrap(), 0);
        queue.shutdown().await;
    }

    #[tokio::test]
    async fn forgets_files_once_their_derivatives_are_filled() {
        let store = MemoryRecordFileStore::new();
        let file = ArchivedFile::new(Uuid::new_v4(), "record_files/a/photo.png", "image/png");
        store.create(&file).await.unwrap();

        let queue = TaskQueue::new(
            TaskQueueConfig::default(),
            Arc::new(HandlerRegistry::new()),
            None,
        );
        let mut seen = HashSet::new();
        assert_eq!(enqueue_missing(&store, &queue, &mut seen).await.unwrap(), 1);

        for kind in [DerivativeKind::Thumbnail, DerivativeKind::Preview] {
            store
                .set_derivative(file.id, kind, "record_files/a/photo_derived.jpg")
                .await
                .unwrap();
        }
        assert_eq!(enqueue_missing(&store, &queue, &mut seen).await.unwrap(), 0);
        assert!(seen.is_empty());

        queue.shutdown().await;
    }
}
