use rusqlite::{params, Connection, Row};
use serde::Serialize;

use super::{resolve_uid, BackupSource, FillMissing, IdMaps};
use crate::db::identity::{find_by_uid, IdentityTable};
use crate::error::MergeError;
use crate::models::UpsertCounts;

const TABLE: IdentityTable = IdentityTable::SessionExercises;

const COLUMNS: &[&str] = &[
    "id",
    "uid",
    "workout_id",
    "exercise_id",
    "order_index",
    "note",
    "current_weight",
    "current_reps",
    "completed_at",
    "performed_at",
];

#[derive(Debug, Serialize)]
struct BackupSessionExercise {
    id: i64,
    uid: Option<String>,
    workout_id: Option<i64>,
    exercise_id: Option<i64>,
    order_index: Option<i64>,
    note: Option<String>,
    current_weight: Option<f64>,
    current_reps: Option<i64>,
    completed_at: Option<i64>,
    performed_at: Option<i64>,
}

impl BackupSessionExercise {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            uid: row.get("uid")?,
            workout_id: row.get("workout_id")?,
            exercise_id: row.get("exercise_id")?,
            order_index: row.get("order_index")?,
            note: row.get("note")?,
            current_weight: row.get("current_weight")?,
            current_reps: row.get("current_reps")?,
            completed_at: row.get("completed_at")?,
            performed_at: row.get("performed_at")?,
        })
    }
}

struct LiveSessionExercise {
    order_index: Option<i64>,
    note: Option<String>,
    current_weight: Option<f64>,
    current_reps: Option<i64>,
    completed_at: Option<i64>,
    performed_at: Option<i64>,
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
    let rows = source.load(TABLE, COLUMNS, BackupSessionExercise::from_row)?;
    let mut counts = UpsertCounts::default();

    for row in rows {
        let uid = resolve_uid(TABLE, row.id, row.uid.as_deref(), &row);

        if let Some(live_id) = find_by_uid(live, TABLE, &uid)? {
            if fill_missing(live, live_id, &row)? {
                counts.updated += 1;
            }
            maps.session_exercises.record(row.id, live_id);
            continue;
        }

        let workout_id = maps.sessions.resolve_optional(row.workout_id);
        let exercise_id = maps.exercises.resolve_optional(row.exercise_id);
        let (Some(workout_id), Some(exercise_id)) = (workout_id, exercise_id) else {
            tracing::warn!(
                backup_id = row.id,
                workout_id = ?row.workout_id,
                exercise_id = ?row.exercise_id,
                "skipping workout exercise with unresolved parent"
            );
            counts.skipped += 1;
            continue;
        };

        live.execute(
            "INSERT INTO workout_exercises (uid, workout_id, exercise_id, order_index, note,
                 current_weight, current_reps, completed_at, performed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                uid,
                workout_id,
                exercise_id,
                row.order_index,
                row.note,
                row.current_weight,
                row.current_reps,
                row.completed_at,
                row.performed_at,
            ],
        )?;
        maps.session_exercises.record(row.id, live.last_insert_rowid());
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

fn fill_missing(
    live: &Connection,
    live_id: i64,
    row: &BackupSessionExercise,
) -> rusqlite::Result<bool> {
    let mut current = live.query_row(
        "SELECT order_index, note, current_weight, current_reps, completed_at, performed_at
         FROM workout_exercises WHERE id = ?1",
        [live_id],
        |r| {
            Ok(LiveSessionExercise {
                order_index: r.get(0)?,
                note: r.get(1)?,
                current_weight: r.get(2)?,
                current_reps: r.get(3)?,
                completed_at: r.get(4)?,
                performed_at: r.get(5)?,
            })
        },
    )?;

    let mut fill = FillMissing::default();
    fill.field(&mut current.order_index, row.order_index);
    fill.field(&mut current.note, row.note.clone());
    fill.field(&mut current.current_weight, row.current_weight);
    fill.field(&mut current.current_reps, row.current_reps);
    fill.field(&mut current.completed_at, row.completed_at);
    fill.field(&mut current.performed_at, row.performed_at);

    if fill.filled() {
        live.execute(
            "UPDATE workout_exercises
             SET order_index = ?1, note = ?2, current_weight = ?3, current_reps = ?4,
                 completed_at = ?5, performed_at = ?6
             WHERE id = ?7",
            params![
                current.order_index,
                current.note,
                current.current_weight,
                current.current_reps,
                current.completed_at,
                current.performed_at,
                live_id,
            ],
        )?;
    }

    Ok(fill.changed())
}
