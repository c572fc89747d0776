//! Database setup and initialization

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use archive_core::ArchiveConfig;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::{MemoryRecordFileStore, RecordFileRepository, RecordFileStore};

/// Connect to Postgres and apply the embedded migrations.
pub async fn setup_database(database_url: &str, config: &ArchiveConfig) -> Result<PgPool> {
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_timeout_seconds))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(database_url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!(
        max_connections = config.db_max_connections,
        "Database connected successfully"
    );

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    Ok(pool)
}

/// The Postgres repository when `DATABASE_URL` is set.
///
/// Without it, an empty in-memory store is returned only when `allow_memory`
/// is set. Callers that read existing rows must pass `false`: an empty store
/// makes every stored blob look unreferenced.
pub async fn connect_store(
    config: &ArchiveConfig,
    allow_memory: bool,
) -> Result<Arc<dyn RecordFileStore>> {
    match &config.database_url {
        Some(url) => {
            let pool = setup_database(url, config).await?;
            Ok(Arc::new(RecordFileRepository::new(pool)))
        }
        None if allow_memory => {
            tracing::warn!("DATABASE_URL not set; using an in-memory record store");
            Ok(Arc::new(MemoryRecordFileStore::new()))
        }
        None => bail!("DATABASE_URL is not set; this command needs the record database"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_without_database() -> ArchiveConfig {
        ArchiveConfig::from_source(|_| None).unwrap()
    }

    #[tokio::test]
    async fn refuses_memory_store_unless_allowed() {
        let err = connect_store(&config_without_database(), false)
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[tokio::test]
    async fn memory_store_when_allowed() {
        let store = connect_store(&config_without_database(), true).await.unwrap();
        assert!(store.list_all().await.unwrap().is_empty());
    }
}
