use rusqlite::{params, Connection, Row};
use serde::Serialize;

use super::{resolve_uid, BackupSource, FillMissing, IdMaps};
use crate::db::identity::{find_by_uid, IdentityTable};
use crate::error::MergeError;
use crate::models::UpsertCounts;

const TABLE: IdentityTable = IdentityTable::Sessions;

const COLUMNS: &[&str] = &["id", "uid", "started_at", "completed_at", "note"];

#[derive(Debug, Serialize)]
struct BackupSession {
    id: i64,
    uid: Option<String>,
    started_at: Option<i64>,
    completed_at: Option<i64>,
    note: Option<String>,
}

impl BackupSession {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            uid: row.get("uid")?,
            started_at: row.get("started_at")?,
            completed_at: row.get("completed_at")?,
            note: row.get("note")?,
        })
    }
}

pub(super) fn merge(
    live: &Connection,
    source: &BackupSource<'_>,
    maps: &mut IdMaps,
) -> Result<UpsertCounts, MergeError> {
    run(live, source, maps).map_err(|err| MergeError::new(TABLE.table_name(), err))
}

fn run(
    live: &Connection,
    source: &BackupSource<'_>,
    maps: &mut IdMaps,
) -> rusqlite::Result<UpsertCounts> {
    let rows = source.load(TABLE, COLUMNS, BackupSession::from_row)?;
    let mut counts = UpsertCounts::default();

    for row in rows {
        let uid = resolve_uid(TABLE, row.id, row.uid.as_deref(), &row);

        if let Some(live_id) = find_by_uid(live, TABLE, &uid)? {
            let (mut completed_at, mut note) = live.query_row(
                "SELECT completed_at, note FROM workouts WHERE id = ?1",
                [live_id],
                |r| Ok((r.get::<_, Option<i64>>(0)?, r.get::<_, Option<String>>(1)?)),
            )?;

            let mut fill = FillMissing::default();
            fill.field(&mut completed_at, row.completed_at);
            fill.field(&mut note, row.note.clone());

            if fill.filled() {
                live.execute(
                    "UPDATE workouts SET completed_at = ?1, note = ?2 WHERE id = ?3",
                    params![completed_at, note, live_id],
                )?;
            }
            if fill.changed() {
                counts.updated += 1;
            }
            maps.sessions.record(row.id, live_id);
            continue;
        }

        let Some(started_at) = row.started_at else {
            tracing::warn!(backup_id = row.id, "skipping workout without a start time");
            counts.skipped += 1;
            continue;
        };

        live.execute(
            "INSERT INTO workouts (uid, started_at, completed_at, note) VALUES (?1, ?2, ?3, ?4)",
            params![uid, started_at, row.completed_at, row.note],
        )?;
        maps.sessions.record(row.id, live.last_insert_rowid());
        counts.inserted += 1;
    }

    tracing::debug!(
        table = TABLE.table_name(),
        inserted = counts.inserted,
        updated = counts.updated,
        skipped = counts.skipped,
        "merged"
    );
    Ok(counts)
}
