use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};

use crate::error::BackupError;

/// Resolve a picked backup file; a missing file is invalid input, not an internal error
pub fn resolve_backup_path(path: &Path) -> Result<PathBuf, BackupError> {
    if !path.is_file() {
        return Err(BackupError::InvalidBackup(format!(
            "backup file not found: {}",
            path.display()
        )));
    }
    Ok(path.canonicalize()?)
}

/// Timestamped export file name, e.g. `workoutlog-backup-20260116-183400.db`
pub fn backup_file_name<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("workoutlog-backup-{}.db", now.format("%Y%m%d-%H%M%S"))
}
