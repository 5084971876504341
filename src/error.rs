//! WorkoutLog Error Types
//!
//! Error types shared by the backup engine and the command layer.

use serde::Serialize;
use thiserror::Error;

/// Failure inside one table's merger. Always aborts the surrounding transaction.
#[derive(Error, Debug)]
#[error("failed to merge {table}: {source}")]
pub struct MergeError {
    pub table: &'static str,
    #[source]
    pub source: rusqlite::Error,
}

impl MergeError {
    pub fn new(table: &'static str, source: rusqlite::Error) -> Self {
        Self { table, source }
    }
}

/// Backup engine error
#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Operation cancelled by user")]
    Cancelled,

    #[error("File system unavailable: {0}")]
    EnvironmentUnavailable(String),

    #[error("Invalid backup: {0}")]
    InvalidBackup(String),

    #[error("Merge failed: {0}")]
    Merge(#[from] MergeError),

    #[error("Another backup operation is already running")]
    Busy,

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

/// Categories the UI distinguishes when reporting a failed export or import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    Cancelled,
    EnvironmentUnavailable,
    InvalidInput,
    MergeFailure,
    Busy,
    Internal,
}

impl BackupError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BackupError::Cancelled => ErrorKind::Cancelled,
            BackupError::EnvironmentUnavailable(_) => ErrorKind::EnvironmentUnavailable,
            BackupError::InvalidBackup(_) | BackupError::Csv(_) => ErrorKind::InvalidInput,
            BackupError::Merge(_) => ErrorKind::MergeFailure,
            BackupError::Busy => ErrorKind::Busy,
            BackupError::Database(_)
            | BackupError::Io(_)
            | BackupError::InvalidOperation(_) => ErrorKind::Internal,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, BackupError::Cancelled)
    }
}

/// Serializable error returned by command handlers
#[derive(Debug, Serialize)]
pub struct CommandError {
    pub code: String,
    pub kind: ErrorKind,
    pub message: String,
    pub details: Option<String>,
}

impl From<BackupError> for CommandError {
    fn from(error: BackupError) -> Self {
        let code = match &error {
            BackupError::Database(_) => "DB_ERROR",
            BackupError::Io(_) => "IO_ERROR",
            BackupError::Csv(_) => "CSV_ERROR",
            BackupError::Cancelled => "CANCELLED",
            BackupError::EnvironmentUnavailable(_) => "FS_UNAVAILABLE",
            BackupError::InvalidBackup(_) => "INVALID_BACKUP",
            BackupError::Merge(_) => "MERGE_FAILED",
            BackupError::Busy => "BUSY",
            BackupError::InvalidOperation(_) => "INVALID_OPERATION",
        };

        let details = match &error {
            BackupError::Merge(merge) => Some(format!("table: {}", merge.table)),
            _ => None,
        };

        CommandError {
            code: code.to_string(),
            kind: error.kind(),
            message: error.to_string(),
            details,
        }
    }
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// Command handler result type
pub type CommandResult<T> = Result<T, CommandError>;
