//! Configuration
//!
//! Locations and tuning knobs, read from the environment (and `.env.local` / `.env`).

use std::env;
use std::path::{Path, PathBuf};

use crate::error::BackupError;

const DEFAULT_DB_FILE: &str = "workoutlog.db";
const APP_DIR_NAME: &str = "workoutlog";
const SQLITE_SUBDIR: &str = "SQLite";
const DEFAULT_BACKFILL_BATCH: usize = 500;
const MAX_BACKFILL_BATCH: usize = 10_000;
const DEFAULT_LOG_FILTER: &str = "workoutlog=info";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory that holds the live database
    pub data_dir: PathBuf,
    /// Writable, reclaimable area for export snapshots and import copies
    pub cache_dir: PathBuf,
    pub db_file_name: String,
    pub backfill_batch_size: usize,
    pub log_filter: String,
}

impl AppConfig {
    /// Load configuration from env files and variables.
    pub fn load() -> Result<Self, BackupError> {
        load_env_files();

        let data_dir = match env::var_os("WORKOUTLOG_DATA_DIR") {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs::data_dir()
                .map(|dir| dir.join(APP_DIR_NAME).join(SQLITE_SUBDIR))
                .ok_or_else(|| {
                    BackupError::EnvironmentUnavailable(
                        "no application data directory on this platform".to_string(),
                    )
                })?,
        };

        let cache_dir = match env::var_os("WORKOUTLOG_CACHE_DIR") {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs::cache_dir()
                .unwrap_or_else(env::temp_dir)
                .join(APP_DIR_NAME),
        };

        let db_file_name = env::var("WORKOUTLOG_DB_FILE")
            .ok()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DB_FILE.to_string());

        let backfill_batch_size =
            parse_batch_size(env::var("WORKOUTLOG_BACKFILL_BATCH").ok().as_deref());

        let log_filter = env::var("WORKOUTLOG_LOG")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        Ok(Self {
            data_dir,
            cache_dir,
            db_file_name,
            backfill_batch_size,
            log_filter,
        })
    }

    /// Configuration rooted at one directory. Used by tests and the `--database` flag.
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            data_dir: root.to_path_buf(),
            cache_dir: root.join("cache"),
            db_file_name: DEFAULT_DB_FILE.to_string(),
            backfill_batch_size: DEFAULT_BACKFILL_BATCH,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.db_file_name)
    }
}

fn parse_batch_size(raw: Option<&str>) -> usize {
    raw.and_then(|value| value.trim().parse::<usize>().ok())
        .filter(|value| *value > 0)
        .map(|value| value.min(MAX_BACKFILL_BATCH))
        .unwrap_or(DEFAULT_BACKFILL_BATCH)
}

/// Load `.env.local` first, then `.env`. Variables that are already set win.
fn load_env_files() {
    for name in [".env.local", ".env"] {
        match dotenvy::from_filename(name) {
            Ok(path) => tracing::debug!(path = %path.display(), "loaded env file"),
            Err(err) if err.not_found() => {}
            Err(err) => tracing::warn!(file = name, error = %err, "ignoring unreadable env file"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_size_falls_back_and_clamps() {
        assert_eq!(parse_batch_size(None), DEFAULT_BACKFILL_BATCH);
        assert_eq!(parse_batch_size(Some("abc")), DEFAULT_BACKFILL_BATCH);
        assert_eq!(parse_batch_size(Some("0")), DEFAULT_BACKFILL_BATCH);
        assert_eq!(parse_batch_size(Some(" 25 ")), 25);
        assert_eq!(parse_batch_size(Some("999999")), MAX_BACKFILL_BATCH);
    }

    #[test]
    fn rooted_config_keeps_everything_under_root() {
        let root = Path::new("/tmp/workoutlog-test");
        let config = AppConfig::rooted_at(root);

        assert_eq!(config.database_path(), root.join("workoutlog.db"));
        assert!(config.cache_dir.starts_with(root));
    }
}
