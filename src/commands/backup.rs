//! Backup Commands
//!
//! Entry points for the export, import, identity backfill, and CSV conversion flows.

use std::path::Path;

use serde::Serialize;

use crate::backup::{
    convert_csv_to_backup, merge_backup_file, snapshot_to_cache, CsvConversionSummary,
    BACKUP_MIME_TYPES,
};
use crate::config::AppConfig;
use crate::db::identity::{self, BackfillReport};
use crate::db::DbState;
use crate::error::{BackupError, CommandResult};
use crate::models::{ExportResult, MergeResult};
use crate::platform::{BackupSaver, DocumentPicker};
use crate::utils::resolve_backup_path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ExportOutcome {
    Saved { result: ExportResult },
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ImportOutcome {
    Completed { result: MergeResult },
    Cancelled,
}

/// Snapshot the live database and hand it to `saver`.
/// A declined save dialog is a `Cancelled` outcome, not an error.
pub async fn export_database<S: BackupSaver>(
    db_state: &DbState,
    config: &AppConfig,
    saver: &S,
) -> CommandResult<ExportOutcome> {
    if !saver.is_available() {
        return Err(BackupError::EnvironmentUnavailable(
            "no save capability on this platform".into(),
        )
        .into());
    }

    let snapshot = {
        let db = db_state.try_acquire()?;
        snapshot_to_cache(&db, &config.cache_dir)?
    };

    match saver.save(&snapshot).await {
        Ok(result) => Ok(ExportOutcome::Saved { result }),
        Err(BackupError::Cancelled) => Ok(ExportOutcome::Cancelled),
        Err(err) => {
            tracing::error!(error = %err, "export failed");
            Err(err.into())
        }
    }
}

/// Let the user pick a backup and merge it into the live database.
pub async fn import_database<P: DocumentPicker>(
    db_state: &DbState,
    config: &AppConfig,
    picker: &P,
) -> CommandResult<ImportOutcome> {
    if !picker.is_available() {
        return Err(BackupError::EnvironmentUnavailable(
            "no document picker on this platform".into(),
        )
        .into());
    }

    let picked = match picker.pick_document(&BACKUP_MIME_TYPES).await {
        Ok(Some(path)) => path,
        Ok(None) | Err(BackupError::Cancelled) => {
            tracing::info!("import cancelled: no file picked");
            return Ok(ImportOutcome::Cancelled);
        }
        Err(err) => return Err(err.into()),
    };
    let path = resolve_backup_path(&picked)?;

    let mut db = db_state.try_acquire()?;
    let result = merge_backup_file(&mut db, &path, &config.cache_dir).map_err(|err| {
        tracing::error!(error = %err, path = %path.display(), "import failed");
        err
    })?;

    Ok(ImportOutcome::Completed { result })
}

/// Assign UIDs to any rows still missing one and (re)build the uid indexes
pub fn backfill_identities(
    db_state: &DbState,
    config: &AppConfig,
) -> CommandResult<Vec<BackfillReport>> {
    let mut db = db_state.try_acquire()?;
    let reports = identity::backfill_all(db.conn_mut(), config.backfill_batch_size)
        .map_err(BackupError::from)?;
    Ok(reports)
}

pub fn convert_csv(csv_path: &Path, output: &Path) -> CommandResult<CsvConversionSummary> {
    Ok(convert_csv_to_backup(csv_path, output)?)
}
