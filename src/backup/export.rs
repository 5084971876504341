//! Backup Export
//!
//! Snapshot the live database into the cache area, then hand the snapshot to
//! one of the two save paths.

use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Local;
use rusqlite::backup::Backup;
use rusqlite::Connection;

use crate::db::Database;
use crate::error::BackupError;
use crate::models::{ExportResult, SaveMethod};
use crate::platform::{BackupSaver, DirectoryAccess};
use crate::utils::backup_file_name;

pub const BACKUP_MIME_TYPE: &str = "application/x-sqlite3";

/// Copy the live database to a timestamp-named file under `cache_dir`.
///
/// Uses the SQLite online backup API so the copy is consistent even while the
/// live connection is open. The snapshot holds the same pages and rows as the
/// live file but is not a byte-for-byte copy: header fields such as the change
/// counter may differ. The snapshot is left behind in the cache area.
pub fn snapshot_to_cache(db: &Database, cache_dir: &Path) -> Result<PathBuf, BackupError> {
    let live_path = db.path().ok_or_else(|| {
        BackupError::EnvironmentUnavailable("live database has no on-disk location".into())
    })?;
    if !live_path.is_file() {
        return Err(BackupError::EnvironmentUnavailable(format!(
            "live database not found at {}",
            live_path.display()
        )));
    }

    std::fs::create_dir_all(cache_dir)?;
    let out_path = cache_dir.join(backup_file_name(&Local::now()));

    let mut out_conn = Connection::open(&out_path)?;
    let backup = Backup::new(db.conn(), &mut out_conn)?;
    backup.run_to_completion(5, Duration::from_millis(10), None)?;

    tracing::info!(
        source = %live_path.display(),
        snapshot = %out_path.display(),
        "database snapshot written"
    );
    Ok(out_path)
}

/// Save path A: write the snapshot into a directory the user grants
pub struct DirectorySaver<A> {
    access: A,
}

impl<A: DirectoryAccess> DirectorySaver<A> {
    pub fn new(access: A) -> Self {
        Self { access }
    }
}

impl<A: DirectoryAccess> BackupSaver for DirectorySaver<A> {
    fn is_available(&self) -> bool {
        self.access.is_available()
    }

    async fn save(&self, snapshot: &Path) -> Result<ExportResult, BackupError> {
        if !self.access.is_available() {
            return Err(BackupError::EnvironmentUnavailable(
                "directory access is not supported here".into(),
            ));
        }

        let Some(directory) = self.access.request_directory().await? else {
            tracing::info!("export cancelled: no directory granted");
            return Err(BackupError::Cancelled);
        };

        let file_name = snapshot
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                BackupError::InvalidOperation(format!(
                    "snapshot has no file name: {}",
                    snapshot.display()
                ))
            })?;

        let location = self
            .access
            .create_file(&directory, &file_name, BACKUP_MIME_TYPE)
            .await?;
        let contents = tokio::fs::read(snapshot).await?;
        self.access
            .write_base64(&location, &STANDARD.encode(contents))
            .await?;

        tracing::info!(location = %location, "backup saved to granted directory");
        Ok(ExportResult {
            location,
            method: SaveMethod::Directory,
        })
    }
}

/// Save path B: leave the snapshot where it is for a share sheet
#[derive(Debug, Clone, Copy, Default)]
pub struct ShareSaver;

impl BackupSaver for ShareSaver {
    async fn save(&self, snapshot: &Path) -> Result<ExportResult, BackupError> {
        Ok(ExportResult {
            location: snapshot.to_string_lossy().into_owned(),
            method: SaveMethod::Share,
        })
    }
}
