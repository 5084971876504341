use rusqlite::{params, Connection, Row};
use serde::Serialize;

use super::{resolve_uid, BackupSource, IdMaps};
use crate::db::identity::{find_by_uid, IdentityTable};
use crate::error::MergeError;
use crate::models::InsertCounts;

const TABLE: IdentityTable = IdentityTable::Sets;

const COLUMNS: &[&str] = &[
    "id",
    "uid",
    "workout_id",
    "exercise_id",
    "workout_exercise_id",
    "set_group_id",
    "set_index",
    "weight_kg",
    "reps",
    "rpe",
    "rir",
    "is_warmup",
    "note",
    "superset_group_id",
    "performed_at",
];

#[derive(Debug, Serialize)]
struct BackupSet {
    id: i64,
    uid: Option<String>,
    workout_id: Option<i64>,
    exercise_id: Option<i64>,
    workout_exercise_id: Option<i64>,
    set_group_id: Option<String>,
    set_index: Option<i64>,
    weight_kg: Option<f64>,
    reps: Option<i64>,
    rpe: Option<f64>,
    rir: Option<f64>,
    is_warmup: bool,
    note: Option<String>,
    superset_group_id: Option<String>,
    performed_at: Option<i64>,
}

impl BackupSet {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            uid: row.get("uid")?,
            workout_id: row.get("workout_id")?,
            exercise_id: row.get("exercise_id")?,
            workout_exercise_id: row.get("workout_exercise_id")?,
            set_group_id: row.get("set_group_id")?,
            set_index: row.get("set_index")?,
            weight_kg: row.get("weight_kg")?,
            reps: row.get("reps")?,
            rpe: row.get("rpe")?,
            rir: row.get("rir")?,
            is_warmup: row.get::<_, Option<bool>>("is_warmup")?.unwrap_or(false),
            note: row.get("note")?,
            superset_group_id: row.get("superset_group_id")?,
            performed_at: row.get("performed_at")?,
        })
    }
}

/// Logged sets are historical facts: a matched set is only mapped, never updated.
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
    let rows = source.load(TABLE, COLUMNS, BackupSet::from_row)?;
    let mut counts = InsertCounts::default();

    for row in rows {
        let uid = resolve_uid(TABLE, row.id, row.uid.as_deref(), &row);

        if let Some(live_id) = find_by_uid(live, TABLE, &uid)? {
            maps.sets.record(row.id, live_id);
            continue;
        }

        let workout_id = maps.sessions.resolve_optional(row.workout_id);
        let exercise_id = maps.exercises.resolve_optional(row.exercise_id);
        let (Some(workout_id), Some(exercise_id)) = (workout_id, exercise_id) else {
            tracing::warn!(
                backup_id = row.id,
                workout_id = ?row.workout_id,
                exercise_id = ?row.exercise_id,
                "skipping set with unresolved parent"
            );
            counts.skipped += 1;
            continue;
        };
        let workout_exercise_id = maps
            .session_exercises
            .resolve_optional(row.workout_exercise_id);

        live.execute(
            "INSERT INTO sets (uid, workout_id, exercise_id, workout_exercise_id, set_group_id,
                 set_index, weight_kg, reps, rpe, rir, is_warmup, note, superset_group_id,
                 performed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                uid,
                workout_id,
                exercise_id,
                workout_exercise_id,
                row.set_group_id,
                row.set_index,
                row.weight_kg,
                row.reps,
                row.rpe,
                row.rir,
                row.is_warmup,
                row.note,
                row.superset_group_id,
                row.performed_at,
            ],
        )?;
        maps.sets.record(row.id, live.last_insert_rowid());
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
