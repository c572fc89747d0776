//! archive-cli: ingest files, run the derivative worker and do housekeeping.
//!
//! Configuration comes from the environment (see `.env.example`). Without
//! DATABASE_URL only `ingest` and `classify` run, against an in-memory record
//! store; every other command needs the database.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use archive_cli::commands::{clean_files, generate_derivatives, ingest_file, run_worker};
use archive_cli::{init_tracing, print_json};
use archive_core::content_type::classify;
use archive_core::models::{select_record_thumbnail, DerivativeKind};
use archive_core::ArchiveConfig;
use archive_db::connect_store;
use archive_processing::DerivativeOrchestrator;
use archive_storage::create_storage;
use archive_worker::{DerivativeTaskHandler, HandlerRegistry, TaskQueue, TaskQueueConfig};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "archive-cli", about = "Archive derivative pipeline tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a local file to a record and generate its derivatives
    Ingest {
        /// Path to the file to upload
        path: PathBuf,
        /// Record UUID the file belongs to
        #[arg(long)]
        record: Uuid,
        /// Store the file without running the derivative job
        #[arg(long)]
        no_derivatives: bool,
        /// Seconds to wait for the derivative job
        #[arg(long, default_value = "600")]
        wait_secs: u64,
    },
    /// Run the worker pool, polling for files missing derivatives
    Worker {
        #[arg(long, default_value = "30")]
        poll_interval_secs: u64,
    },
    /// Generate thumbnails for files that lack one
    GenThumbs {
        /// Regenerate for every file, replacing existing thumbnails
        #[arg(long)]
        regen: bool,
    },
    /// Generate previews for files that lack one
    GenPreviews {
        /// Regenerate for every file, replacing existing previews
        #[arg(long)]
        regen: bool,
    },
    /// Delete stored blobs that no file row references
    CleanFiles {
        /// List what would be deleted without deleting it
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the content type assigned to each filename
    Classify {
        #[arg(required = true)]
        filenames: Vec<String>,
    },
    /// Show the file whose thumbnail represents a record
    RecordThumbnail {
        /// Record UUID
        record: Uuid,
    },
}

impl Commands {
    /// Whether the command can run against an empty in-memory record store.
    /// Commands that read existing rows cannot: `clean-files` would see every
    /// blob as unreferenced.
    fn accepts_memory_store(&self) -> bool {
        matches!(self, Commands::Ingest { .. } | Commands::Classify { .. })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ArchiveConfig::from_env().context("Failed to load configuration")?;
    init_tracing(&config);

    let cli = Cli::parse();

    if let Commands::Classify { filenames } = &cli.command {
        let types: serde_json::Map<String, serde_json::Value> = filenames
            .iter()
            .map(|name| (name.clone(), classify(name).into()))
            .collect();
        return print_json(&types);
    }

    let storage = create_storage(&config)
        .await
        .context("Failed to initialize storage")?;
    let store = connect_store(&config, cli.command.accepts_memory_store()).await?;
    let orchestrator = Arc::new(DerivativeOrchestrator::new(
        storage.clone(),
        store.clone(),
        &config,
    ));
    let registry = Arc::new(
        HandlerRegistry::new().register(Arc::new(DerivativeTaskHandler::new(orchestrator.clone()))),
    );
    let queue_config = TaskQueueConfig::from_config(&config);

    match cli.command {
        Commands::Ingest {
            path,
            record,
            no_derivatives,
            wait_secs,
        } => {
            let report = if no_derivatives {
                ingest_file(
                    storage.as_ref(),
                    store.as_ref(),
                    None,
                    record,
                    &path,
                    Duration::ZERO,
                )
                .await?
            } else {
                let (finished_tx, mut finished) = mpsc::channel(16);
                let queue = TaskQueue::new(queue_config, registry, Some(finished_tx));
                let report = ingest_file(
                    storage.as_ref(),
                    store.as_ref(),
                    Some((&queue, &mut finished)),
                    record,
                    &path,
                    Duration::from_secs(wait_secs),
                )
                .await?;
                queue.shutdown().await;
                report
            };
            print_json(&report)?;
        }
        Commands::Worker { poll_interval_secs } => {
            let queue = TaskQueue::new(queue_config, registry, None);
            run_worker(
                store.as_ref(),
                &queue,
                Duration::from_secs(poll_interval_secs.max(1)),
            )
            .await?;
        }
        Commands::GenThumbs { regen } => {
            let summary =
                generate_derivatives(&orchestrator, DerivativeKind::Thumbnail, regen).await?;
            print_json(&summary)?;
        }
        Commands::GenPreviews { regen } => {
            let summary =
                generate_derivatives(&orchestrator, DerivativeKind::Preview, regen).await?;
            print_json(&summary)?;
        }
        Commands::CleanFiles { dry_run } => {
            let report = clean_files(storage.as_ref(), store.as_ref(), dry_run).await?;
            print_json(&report)?;
        }
        Commands::RecordThumbnail { record } => {
            let files = store.list_for_record(record).await?;
            match select_record_thumbnail(&files) {
                Some(file) => print_json(file)?,
                None => print_json(&serde_json::json!({ "record_id": record, "thumbnail": null }))?,
            }
        }
        Commands::Classify { .. } => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use archive_storage::{LocalStorage, Storage};

    fn parse(args: &[&str]) -> Commands {
        Cli::try_parse_from(std::iter::once("archive-cli").chain(args.iter().copied()))
            .unwrap()
            .command
    }

    #[test]
    fn only_ingest_and_classify_accept_memory_store() {
        let record = Uuid::new_v4().to_string();
        assert!(parse(&["ingest", "scan.pdf", "--record", record.as_str()]).accepts_memory_store());
        assert!(parse(&["classify", "a.jpg"]).accepts_memory_store());

        for args in [
            vec!["clean-files"],
            vec!["clean-files", "--dry-run"],
            vec!["gen-thumbs"],
            vec!["gen-previews", "--regen"],
            vec!["worker"],
            vec!["record-thumbnail", record.as_str()],
        ] {
            assert!(!parse(&args).accepts_memory_store(), "{:?}", args);
        }
    }

    #[tokio::test]
    async fn clean_files_refuses_to_run_without_database() {
        let dir = tempfile::tempdir().unwrap();
        let media_root = dir.path().to_string_lossy().to_string();
        let config = ArchiveConfig::from_source(|key| match key {
            "MEDIA_ROOT" => Some(media_root.clone()),
            _ => None,
        })
        .unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        storage
            .upload_with_key("record_files/u1/original.jpg", b"jpeg".to_vec(), "image/jpeg")
            .await
            .unwrap();

        let command = parse(&["clean-files"]);
        let err = connect_store(&config, command.accepts_memory_store())
            .await
            .err()
            .unwrap();

        assert!(err.to_string().contains("DATABASE_URL"));
        assert!(storage.exists("record_files/u1/original.jpg").await.unwrap());
    }
}
