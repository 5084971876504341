//! Merge Engine
//!
//! Reconciles every synced table of a backup into the live database, parents
//! before children. Rows are matched by UID (exercises also by name), matched
//! rows only have their null fields filled, and unmatched rows are inserted
//! with foreign keys translated through the id maps of earlier tables.

mod exercises;
mod id_map;
mod pr_events;
mod session_exercises;
mod sessions;
mod sets;
mod source;

#[cfg(test)]
mod tests;

use rusqlite::Connection;
use serde::Serialize;

pub use id_map::{IdMap, IdMaps};
pub use source::BackupSource;

use crate::db::identity::{existing_uid, legacy_uid, IdentityTable};
use crate::error::MergeError;
use crate::models::TableCounts;

/// Run all five table mergers in dependency order.
///
/// The caller owns the transaction: any error leaves partial writes behind
/// that must be rolled back.
pub fn merge_all(live: &Connection, backup: &Connection) -> Result<TableCounts, MergeError> {
    let source = BackupSource::new(backup);
    let mut maps = IdMaps::default();

    let exercises = exercises::merge(live, &source, &mut maps)?;
    let sessions = sessions::merge(live, &source, &mut maps)?;
    let session_exercises = session_exercises::merge(live, &source, &mut maps)?;
    let sets = sets::merge(live, &source, &mut maps)?;
    let pr_events = pr_events::merge(live, &source, &mut maps)?;

    Ok(TableCounts {
        exercises,
        sessions,
        session_exercises,
        sets,
        pr_events,
    })
}

/// The row's own UID, or a deterministic one for rows from a legacy backup
pub(crate) fn resolve_uid<R: Serialize>(
    table: IdentityTable,
    backup_id: i64,
    uid: Option<&str>,
    row: &R,
) -> String {
    match existing_uid(uid) {
        Some(uid) => uid.to_string(),
        None => {
            let fingerprint = serde_json::to_string(row).unwrap_or_default();
            legacy_uid(table, backup_id, &fingerprint)
        }
    }
}

/// Fill-missing-only field reconciliation for one matched row
#[derive(Debug, Default)]
pub(crate) struct FillMissing {
    filled: bool,
    diverged: bool,
}

impl FillMissing {
    /// `live = live ?? backup`. A differing populated value is kept and noted.
    pub fn field<T: PartialEq>(&mut self, live: &mut Option<T>, backup: Option<T>) {
        let Some(value) = backup else {
            return;
        };

        match live {
            None => {
                *live = Some(value);
                self.filled = true;
            }
            Some(current) if *current != value => self.diverged = true,
            Some(_) => {}
        }
    }

    /// Adopt the backup's UID when the live row has none
    pub fn identity(&mut self, live: &mut Option<String>, uid: &str) {
        if existing_uid(live.as_deref()).is_none() {
            *live = Some(uid.to_string());
            self.filled = true;
        }
    }

    /// True when the live row needs writing back
    pub fn filled(&self) -> bool {
        self.filled
    }

    /// True when the row counts as updated
    pub fn changed(&self) -> bool {
        self.filled || self.diverged
    }
}
