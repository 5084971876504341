//! Row Identity
//!
//! Portable row identifiers (UIDs) for the five synced tables: generation,
//! legacy backfill, and the per-table uniqueness index.

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Tables whose rows carry a portable UID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityTable {
    Exercises,
    Sessions,
    SessionExercises,
    Sets,
    PrEvents,
}

impl IdentityTable {
    /// Dependency order: parents before children.
    pub const ALL: [IdentityTable; 5] = [
        IdentityTable::Exercises,
        IdentityTable::Sessions,
        IdentityTable::SessionExercises,
        IdentityTable::Sets,
        IdentityTable::PrEvents,
    ];

    pub fn table_name(self) -> &'static str {
        match self {
            IdentityTable::Exercises => "exercises",
            IdentityTable::Sessions => "workouts",
            IdentityTable::SessionExercises => "workout_exercises",
            IdentityTable::Sets => "sets",
            IdentityTable::PrEvents => "pr_events",
        }
    }

    fn index_name(self) -> &'static str {
        match self {
            IdentityTable::Exercises => "idx_exercises_uid",
            IdentityTable::Sessions => "idx_workouts_uid",
            IdentityTable::SessionExercises => "idx_workout_exercises_uid",
            IdentityTable::Sets => "idx_sets_uid",
            IdentityTable::PrEvents => "idx_pr_events_uid",
        }
    }
}

/// Outcome of one backfill run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillReport {
    pub table: IdentityTable,
    pub assigned: u64,
    pub batches: u64,
    pub index_created: bool,
}

/// Fresh random UID
pub fn new_uid() -> String {
    Uuid::new_v4().to_string()
}

/// The usable UID in `uid`, if any. Blank values count as missing.
pub fn existing_uid(uid: Option<&str>) -> Option<&str> {
    uid.map(str::trim).filter(|uid| !uid.is_empty())
}

/// Return the existing UID, or generate one when it is missing or blank.
pub fn ensure_uid(existing: Option<&str>) -> String {
    existing_uid(existing).map_or_else(new_uid, str::to_string)
}

/// Deterministic UID for a backup row that predates UIDs.
///
/// Derived from the table, the row's id inside that backup, and its content, so
/// importing the same legacy backup twice resolves to the same identities.
pub fn legacy_uid(table: IdentityTable, backup_id: i64, fingerprint: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(table.table_name().as_bytes());
    hasher.update([0u8]);
    hasher.update(backup_id.to_le_bytes());
    hasher.update([0u8]);
    hasher.update(fingerprint.as_bytes());
    let digest = hasher.finalize();

    let hex: String = digest.iter().take(16).map(|byte| format!("{byte:02x}")).collect();
    format!("legacy-{hex}")
}

/// Add the `uid` column to a table created before UIDs existed.
/// Returns true when the column had to be added.
pub fn ensure_uid_column(conn: &Connection, table: IdentityTable) -> rusqlite::Result<bool> {
    let present = conn
        .query_row(
            "SELECT 1 FROM pragma_table_info(?1) WHERE name = 'uid'",
            [table.table_name()],
            |_| Ok(()),
        )
        .optional()?
        .is_some();

    if present {
        return Ok(false);
    }

    conn.execute_batch(&format!(
        "ALTER TABLE {} ADD COLUMN uid TEXT",
        table.table_name()
    ))?;
    tracing::info!(table = table.table_name(), "added uid column to legacy table");
    Ok(true)
}

/// Assign UIDs to rows that have none, `batch_size` rows per transaction, then
/// build the unique index. Running it again once every row has a UID does nothing.
pub fn backfill(
    conn: &mut Connection,
    table: IdentityTable,
    batch_size: usize,
) -> rusqlite::Result<BackfillReport> {
    let batch_size = batch_size.max(1);
    let name = table.table_name();
    let select_sql = format!(
        "SELECT id, uid FROM {name} WHERE uid IS NULL OR TRIM(uid) = '' ORDER BY id LIMIT ?1"
    );
    let update_sql = format!("UPDATE {name} SET uid = ?1 WHERE id = ?2");

    let mut assigned = 0u64;
    let mut batches = 0u64;

    loop {
        let tx = conn.transaction()?;
        let missing = {
            let mut stmt = tx.prepare(&select_sql)?;
            let rows = stmt.query_map([batch_size as i64], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, Option<String>>(1)?))
            })?;
            let missing: Vec<(i64, Option<String>)> = rows.collect::<Result<_, _>>()?;
            missing
        };

        if missing.is_empty() {
            break;
        }

        {
            let mut update = tx.prepare(&update_sql)?;
            for (id, uid) in &missing {
                update.execute(params![ensure_uid(uid.as_deref()), id])?;
            }
        }
        tx.commit()?;

        assigned += missing.len() as u64;
        batches += 1;
        tracing::debug!(table = name, batch = batches, rows = missing.len(), "uid backfill batch");

        if missing.len() < batch_size {
            break;
        }
    }

    let index_created = create_uid_index(conn, table);

    if assigned > 0 {
        tracing::info!(table = name, assigned, batches, index_created, "uid backfill complete");
    }

    Ok(BackfillReport {
        table,
        assigned,
        batches,
        index_created,
    })
}

/// Backfill every synced table in dependency order.
pub fn backfill_all(
    conn: &mut Connection,
    batch_size: usize,
) -> rusqlite::Result<Vec<BackfillReport>> {
    IdentityTable::ALL
        .iter()
        .map(|table| backfill(conn, *table, batch_size))
        .collect()
}

/// Look up the live row id holding `uid`.
pub fn find_by_uid(
    conn: &Connection,
    table: IdentityTable,
    uid: &str,
) -> rusqlite::Result<Option<i64>> {
    let sql = format!("SELECT id FROM {} WHERE uid = ?1 ORDER BY id LIMIT 1", table.table_name());
    conn.query_row(&sql, [uid], |row| row.get(0)).optional()
}

fn create_uid_index(conn: &Connection, table: IdentityTable) -> bool {
    let sql = format!(
        "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {}(uid)",
        table.index_name(),
        table.table_name()
    );

    match conn.execute_batch(&sql) {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(
                table = table.table_name(),
                error = %err,
                "could not create uid index; merges fall back to unindexed lookups"
            );
            false
        }
    }
}
