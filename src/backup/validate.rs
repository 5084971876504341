//! Backup Validation
//!
//! Header check run on a picked file before it is ever opened as a database.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use crate::error::BackupError;

/// First 16 bytes of every SQLite 3 database file
pub const SQLITE_HEADER: &[u8; 16] = b"SQLite format 3\0";

/// True when the file starts with the SQLite 3 magic header
pub fn is_sqlite_file(path: &Path) -> Result<bool, BackupError> {
    let mut file = File::open(path)?;
    let mut header = [0u8; 16];

    match file.read_exact(&mut header) {
        Ok(()) => Ok(&header == SQLITE_HEADER),
        Err(err) if err.kind() == ErrorKind::UnexpectedEof => Ok(false),
        Err(err) => Err(err.into()),
    }
}

/// Header gate used by the import flow
pub fn ensure_sqlite_file(path: &Path) -> Result<(), BackupError> {
    let valid = is_sqlite_file(path).map_err(|err| match err {
        BackupError::Io(io) => {
            BackupError::InvalidBackup(format!("cannot read {}: {io}", path.display()))
        }
        other => other,
    })?;

    if valid {
        Ok(())
    } else {
        tracing::warn!(path = %path.display(), "rejected file without SQLite header");
        Err(BackupError::InvalidBackup(format!(
            "{} is not a SQLite database",
            path.display()
        )))
    }
}
