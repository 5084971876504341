use rusqlite::{params, Connection, Row};
use serde::Serialize;

use super::{resolve_uid, BackupSource, IdMaps};
use crate::db::identity::{find_by_uid, IdentityTable};
use crate::error::MergeError;
use crate::models::InsertCounts;

const TABLE: IdentityTable = IdentityTable::PrEvents;

const COLUMNS: &[&str] = &[
    "id",
    "uid",
    "set_id",
    "exercise_id",
    "type",
    "metric_value",
    "occurred_at",
];

#[derive(Debug, Serialize)]
struct BackupPrEvent {
    id: i64,
    uid: Option<String>,
    set_id: Option<i64>,
    exercise_id: Option<i64>,
    record_type: Option<String>,
    metric_value: Option<f64>,
    occurred_at: Option<i64>,
}

impl BackupPrEvent {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            uid: row.get("uid")?,
            set_id: row.get("set_id")?,
            exercise_id: row.get("exercise_id")?,
            record_type: row.get("type")?,
            metric_value: row.get("metric_value")?,
            occurred_at: row.get("occurred_at")?,
        })
    }
}

pub(super) fn merge(
    live: &Connection,
    source: &BackupSource<'_>,
    maps: &mut IdMaps,
) -> Result<InsertCounts, MergeError> {
    run(live, source, maps).map_err(|err| MergeError::new(TABLE.table_name(), err))
}

fn run(
    live: &Connection,
    source: &BackupSource<'_>,
    maps: &mut IdMaps,
) -> rusqlite::Result<InsertCounts> {
    let rows = source.load(TABLE, COLUMNS, BackupPrEvent::from_row)?;
    let mut counts = InsertCounts::default();

    for row in rows {
        let uid = resolve_uid(TABLE, row.id, row.uid.as_deref(), &row);

        if let Some(live_id) = find_by_uid(live, TABLE, &uid)? {
            maps.pr_events.record(row.id, live_id);
            continue;
        }

        let set_id = maps.sets.resolve_optional(row.set_id);
        let exercise_id = maps.exercises.resolve_optional(row.exercise_id);
        let (Some(set_id), Some(exercise_id)) = (set_id, exercise_id) else {
            tracing::warn!(
                backup_id = row.id,
                set_id = ?row.set_id,
                exercise_id = ?row.exercise_id,
                "skipping PR event with unresolved parent"
            );
            counts.skipped += 1;
            continue;
        };

        let (Some(record_type), Some(metric_value), Some(occurred_at)) =
            (row.record_type.as_deref(), row.metric_value, row.occurred_at)
        else {
            tracing::warn!(backup_id = row.id, "skipping incomplete PR event");
            counts.skipped += 1;
            continue;
        };

        live.execute(
            "INSERT INTO pr_events (uid, set_id, exercise_id, type, metric_value, occurred_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![uid, set_id, exercise_id, record_type, metric_value, occurred_at],
        )?;
        maps.pr_events.record(row.id, live.last_insert_rowid());
        counts.inserted += 1;
    }

    tracing::debug!(
        table = TABLE.table_name(),
        inserted = counts.inserted,
        skipped = counts.skipped,
        "merged"
    );
    Ok(counts)
}
