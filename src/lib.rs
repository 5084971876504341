//! WorkoutLog Core - backup engine library
//!
//! Exports the on-device SQLite database and merge-imports backups without
//! destroying or duplicating local data.

pub mod backup;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod platform;
pub mod utils;

#[cfg(test)]
mod test_support;

use config::AppConfig;
use db::{Database, DbState};
use error::BackupError;

/// Open the live database described by `config` and bring it up to date:
/// schema, legacy `uid` columns, and the identity backfill.
pub fn open_state(config: &AppConfig) -> Result<DbState, BackupError> {
    let db_path = config.database_path();
    let mut db = Database::new(&db_path)?;

    let reports = db.initialize(config.backfill_batch_size)?;
    let assigned: u64 = reports.iter().map(|report| report.assigned).sum();
    tracing::info!(path = %db_path.display(), backfilled = assigned, "database ready");

    Ok(DbState::new(db))
}
