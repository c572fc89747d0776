//! Configuration module
//!
//! All settings come from environment variables (optionally loaded from a `.env`
//! file). Every value has a default except the database URL, which is optional:
//! without it only the commands that create new rows can run, against an
//! in-memory record store.

use std::env;
use std::path::PathBuf;

const DB_MAX_CONNECTIONS: u32 = 10;
const DB_TIMEOUT_SECS: u64 = 30;
const JPEG_QUALITY: u8 = 75;
const PDF_RENDER_DPI: u32 = 100;
const TRANSCODE_TIMEOUT_SECS: u64 = 1800;
const PDF_RENDER_TIMEOUT_SECS: u64 = 120;
const TASK_QUEUE_MAX_WORKERS: usize = 4;
const TASK_QUEUE_MAX_RETRIES: i32 = 3;
const TASK_QUEUE_DEFAULT_TIMEOUT_SECS: u64 = 3600;
const TASK_QUEUE_CAPACITY: usize = 1024;

/// Characters rejected in external tool paths; they are never run through a
/// shell, but a path containing them is almost certainly a misconfiguration.
const DANGEROUS_PATH_CHARS: [char; 11] = [';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r'];

#[derive(Clone, Debug)]
pub struct ArchiveConfig {
    pub environment: String,
    pub log_format: String,
    // Database
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    // Storage
    pub media_root: PathBuf,
    pub base_dir: PathBuf,
    // Derivative generation
    pub ffmpeg_path: String,
    pub pdftoppm_path: String,
    pub thumbnail_size: u32,
    pub preview_size: u32,
    pub jpeg_quality: u8,
    pub pdf_render_dpi: u32,
    pub transcode_timeout_secs: u64,
    pub pdf_render_timeout_secs: u64,
    // Task queue
    pub task_queue_max_workers: usize,
    pub task_queue_max_retries: i32,
    pub task_queue_default_timeout_seconds: u64,
    pub task_queue_capacity: usize,
}

impl ArchiveConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_source(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_source<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let parse_or = |key: &str, default: String| get(key).unwrap_or(default);

        let environment = get("ENVIRONMENT")
            .or_else(|| get("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let config = ArchiveConfig {
            environment,
            log_format: parse_or("LOG_FORMAT", "text".to_string()).to_lowercase(),
            database_url: get("DATABASE_URL"),
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", DB_MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(DB_MAX_CONNECTIONS),
            db_timeout_seconds: parse_or("DB_TIMEOUT_SECONDS", DB_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(DB_TIMEOUT_SECS),
            media_root: PathBuf::from(parse_or("MEDIA_ROOT", "./media".to_string())),
            base_dir: PathBuf::from(parse_or("BASE_DIR", ".".to_string())),
            ffmpeg_path: parse_or("FFMPEG_PATH", "ffmpeg".to_string()),
            pdftoppm_path: parse_or("PDFTOPPM_PATH", "pdftoppm".to_string()),
            thumbnail_size: parse_or(
                "THUMBNAIL_SIZE",
                crate::constants::THUMBNAIL_SIZE.to_string(),
            )
            .parse()
            .map_err(|_| anyhow::anyhow!("THUMBNAIL_SIZE must be a positive integer"))?,
            preview_size: parse_or("PREVIEW_SIZE", crate::constants::PREVIEW_SIZE.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PREVIEW_SIZE must be a positive integer"))?,
            jpeg_quality: parse_or("JPEG_QUALITY", JPEG_QUALITY.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("JPEG_QUALITY must be between 1 and 100"))?,
            pdf_render_dpi: parse_or("PDF_RENDER_DPI", PDF_RENDER_DPI.to_string())
                .parse()
                .unwrap_or(PDF_RENDER_DPI),
            transcode_timeout_secs: parse_or(
                "TRANSCODE_TIMEOUT_SECS",
                TRANSCODE_TIMEOUT_SECS.to_string(),
            )
            .parse()
            .unwrap_or(TRANSCODE_TIMEOUT_SECS),
            pdf_render_timeout_secs: parse_or(
                "PDF_RENDER_TIMEOUT_SECS",
                PDF_RENDER_TIMEOUT_SECS.to_string(),
            )
            .parse()
            .unwrap_or(PDF_RENDER_TIMEOUT_SECS),
            task_queue_max_workers: parse_or(
                "TASK_QUEUE_MAX_WORKERS",
                TASK_QUEUE_MAX_WORKERS.to_string(),
            )
            .parse()
            .unwrap_or(TASK_QUEUE_MAX_WORKERS),
            task_queue_max_retries: parse_or(
                "TASK_QUEUE_MAX_RETRIES",
                TASK_QUEUE_MAX_RETRIES.to_string(),
            )
            .parse()
            .unwrap_or(TASK_QUEUE_MAX_RETRIES),
            task_queue_default_timeout_seconds: parse_or(
                "TASK_QUEUE_DEFAULT_TIMEOUT_SECONDS",
                TASK_QUEUE_DEFAULT_TIMEOUT_SECS.to_string(),
            )
            .parse()
            .unwrap_or(TASK_QUEUE_DEFAULT_TIMEOUT_SECS),
            task_queue_capacity: parse_or("TASK_QUEUE_CAPACITY", TASK_QUEUE_CAPACITY.to_string())
                .parse()
                .unwrap_or(TASK_QUEUE_CAPACITY),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.thumbnail_size == 0 || self.preview_size == 0 {
            return Err(anyhow::anyhow!(
                "THUMBNAIL_SIZE and PREVIEW_SIZE must be greater than zero"
            ));
        }

        if self.preview_size < self.thumbnail_size {
            return Err(anyhow::anyhow!(
                "PREVIEW_SIZE ({}) must not be smaller than THUMBNAIL_SIZE ({})",
                self.preview_size,
                self.thumbnail_size
            ));
        }

        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(anyhow::anyhow!("JPEG_QUALITY must be between 1 and 100"));
        }

        if self.task_queue_max_workers == 0 {
            return Err(anyhow::anyhow!("TASK_QUEUE_MAX_WORKERS must be at least 1"));
        }

        for (name, path) in [
            ("FFMPEG_PATH", &self.ffmpeg_path),
            ("PDFTOPPM_PATH", &self.pdftoppm_path),
        ] {
            if path.chars().any(|c| DANGEROUS_PATH_CHARS.contains(&c)) {
                return Err(anyhow::anyhow!("{} contains invalid characters", name));
            }
        }

        if let Some(url) = &self.database_url {
            if !(url.starts_with("postgres://") || url.starts_with("postgresql://")) {
                return Err(anyhow::anyhow!(
                    "DATABASE_URL must be a valid PostgreSQL connection string"
                ));
            }
        }

        Ok(())
    }

    pub fn json_logs(&self) -> bool {
        self.log_format == "json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<ArchiveConfig, anyhow::Error> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ArchiveConfig::from_source(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_without_environment() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.thumbnail_size, 400);
        assert_eq!(config.preview_size, 2000);
        assert_eq!(config.jpeg_quality, 75);
        assert_eq!(config.ffmpeg_path, "ffmpeg");
        assert_eq!(config.task_queue_max_workers, 4);
        assert_eq!(config.transcode_timeout_secs, 1800);
        assert_eq!(config.pdf_render_timeout_secs, 120);
        assert!(config.database_url.is_none());
        assert_eq!(config.environment, "development");
    }

    #[test]
    fn overrides_are_read() {
        let config = config_from(&[
            ("THUMBNAIL_SIZE", "256"),
            ("MEDIA_ROOT", "/srv/archive/media"),
            ("DATABASE_URL", "postgresql://archive@localhost/archive"),
            ("ENVIRONMENT", "Production"),
            ("LOG_FORMAT", "JSON"),
            ("PDF_RENDER_TIMEOUT_SECS", "15"),
        ])
        .unwrap();
        assert_eq!(config.thumbnail_size, 256);
        assert_eq!(config.media_root, PathBuf::from("/srv/archive/media"));
        assert_eq!(config.environment, "Production");
        assert!(config.json_logs());
        assert_eq!(config.pdf_render_timeout_secs, 15);
        assert_eq!(config.transcode_timeout_secs, 1800);
    }

    #[test]
    fn rejects_preview_smaller_than_thumbnail() {
        let err = config_from(&[("THUMBNAIL_SIZE", "500"), ("PREVIEW_SIZE", "100")]).unwrap_err();
        assert!(err.to_string().contains("PREVIEW_SIZE"));
    }

    #[test]
    fn rejects_non_postgres_database_url() {
        assert!(config_from(&[("DATABASE_URL", "mysql://localhost/db")]).is_err());
    }

    #[test]
    fn rejects_shell_metacharacters_in_tool_paths() {
        assert!(config_from(&[("FFMPEG_PATH", "ffmpeg; rm -rf /")]).is_err());
    }

    #[test]
    fn rejects_out_of_range_quality() {
        assert!(config_from(&[("JPEG_QUALITY", "0")]).is_err());
        assert!(config_from(&[("JPEG_QUALITY", "300")]).is_err());
    }
}
