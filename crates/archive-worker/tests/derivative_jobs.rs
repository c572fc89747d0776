use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use archive_core::models::{ArchivedFile, DerivativeJobPayload, DerivativeKind, TaskStatus};
use archive_core::ArchiveConfig;
use archive_db::{MemoryRecordFileStore, RecordFileStore};
use archive_processing::{upload_pipeline, DerivativeOrchestrator};
use archive_storage::{LocalStorage, Storage};
use archive_worker::{DerivativeTaskHandler, HandlerRegistry, TaskQueue, TaskQueueConfig};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use tempfile::TempDir;
use tokio::sync::mpsc;
use uuid::Uuid;

struct Fixture {
    _dir: TempDir,
    storage: Arc<LocalStorage>,
    store: Arc<MemoryRecordFileStore>,
    queue: TaskQueue,
    finished: mpsc::Receiver<(Uuid, TaskStatus)>,
}

async fn fixture(max_retries: i32) -> Fixture {
    let dir = TempDir::new().unwrap();
    let media_root = dir.path().join("media");
    let env = HashMap::from([
        ("MEDIA_ROOT", media_root.to_string_lossy().to_string()),
        ("BASE_DIR", dir.path().to_string_lossy().to_string()),
        ("FFMPEG_PATH", "/nonexistent/ffmpeg".to_string()),
        ("PDFTOPPM_PATH", "/nonexistent/pdftoppm".to_string()),
    ]);
    let config = ArchiveConfig::from_source(|key| env.get(key).cloned()).unwrap();

    let storage = Arc::new(LocalStorage::new(&media_root).await.unwrap());
    let store = Arc::new(MemoryRecordFileStore::new());
    let orchestrator = Arc::new(DerivativeOrchestrator::new(
        storage.clone(),
        store.clone(),
        &config,
    ));

    let registry =
        HandlerRegistry::new().register(Arc::new(DerivativeTaskHandler::new(orchestrator)));
    let (finished_tx, finished) = mpsc::channel(16);
    let queue_config = TaskQueueConfig {
        max_retries,
        backoff_unit: Duration::from_millis(5),
        ..TaskQueueConfig::from_config(&config)
    };
    let queue = TaskQueue::new(queue_config, Arc::new(registry), Some(finished_tx));

    Fixture {
        _dir: dir,
        storage,
        store,
        queue,
        finished,
    }
}

impl Fixture {
    async fn wait_for(&mut self, task_id: Uuid) -> TaskStatus {
        loop {
            let (id, status) = tokio::time::timeout(Duration::from_secs(10), self.finished.recv())
                .await
                .expect("task did not finish in time")
                .expect("queue closed");
            if id == task_id {
                return status;
            }
        }
    }
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([20, 120, 220])));
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png).unwrap();
    out
}

#[tokio::test]
async fn upload_then_job_fills_both_derivatives() {
    let mut f = fixture(3).await;
    let file = upload_pipeline(
        f.storage.as_ref(),
        f.store.as_ref(),
        Uuid::new_v4(),
        "poster.png",
        png(900, 600),
    )
    .await
    .unwrap();

    let task_id = f
        .queue
        .submit_derivative_job(&DerivativeJobPayload::all(file.id))
        .await
        .unwrap();
    assert_eq!(f.wait_for(task_id).await, TaskStatus::Completed);

    let row = f.store.get(file.id).await.unwrap().unwrap();
    let thumbnail = row.thumbnail.expect("thumbnail recorded");
    let preview = row.preview.expect("preview recorded");
    assert!(f.storage.exists(&thumbnail).await.unwrap());
    assert!(f.storage.exists(&preview).await.unwrap());
}

#[tokio::test]
async fn concurrent_jobs_for_one_file_all_complete() {
    let mut f = fixture(3).await;
    let file = upload_pipeline(
        f.storage.as_ref(),
        f.store.as_ref(),
        Uuid::new_v4(),
        "scan.jpg",
        png(500, 500),
    )
    .await
    .unwrap();

    let mut ids = Vec::new();
    for _ in 0..3 {
        ids.push(
            f.queue
                .submit_derivative_job(&DerivativeJobPayload::only(file.id, DerivativeKind::Thumbnail))
                .await
                .unwrap(),
        );
    }
    for id in ids {
        assert_eq!(f.wait_for(id).await, TaskStatus::Completed);
    }

    let keys = f.storage.list_keys("record_files/").await.unwrap();
    let thumbs: Vec<_> = keys.iter().filter(|k| k.contains("_thumb_")).collect();
    assert_eq!(thumbs.len(), 3);

    let row = f.store.get(file.id).await.unwrap().unwrap();
    assert!(thumbs.iter().any(|k| Some(k.as_str()) == row.thumbnail.as_deref()));
    assert!(row.preview.is_none());
}

#[tokio::test]
async fn unknown_file_fails_without_retry() {
    let mut f = fixture(3).await;
    let task_id = f
        .queue
        .submit_derivative_job(&DerivativeJobPayload::all(Uuid::new_v4()))
        .await
        .unwrap();
    assert_eq!(f.wait_for(task_id).await, TaskStatus::Failed);
}

#[tokio::test]
async fn missing_source_is_retried_until_it_appears() {
    let mut f = fixture(8).await;
    let file = ArchivedFile::new(Uuid::new_v4(), "record_files/late/photo.png", "image/png");
    f.store.create(&file).await.unwrap();

    let task_id = f
        .queue
        .submit_derivative_job(&DerivativeJobPayload::all(file.id))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(20)).await;
    f.storage
        .upload_with_key(&file.file, png(64, 32), "image/png")
        .await
        .unwrap();

    assert_eq!(f.wait_for(task_id).await, TaskStatus::Completed);
    let row = f.store.get(file.id).await.unwrap().unwrap();
    assert!(row.thumbnail.is_some());
}

#[tokio::test]
async fn missing_source_fails_once_retries_run_out() {
    let mut f = fixture(1).await;
    let file = ArchivedFile::new(Uuid::new_v4(), "record_files/never/photo.png", "image/png");
    f.store.create(&file).await.unwrap();

    let task_id = f
        .queue
        .submit_derivative_job(&DerivativeJobPayload::all(file.id))
        .await
        .unwrap();
    assert_eq!(f.wait_for(task_id).await, TaskStatus::Failed);
}
