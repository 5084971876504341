//! Entity Writes
//!
//! Row creation used by normal app flows. Every row gets its UID at creation time.

use rusqlite::{params, Connection, OptionalExtension};

use super::identity::new_uid;
use crate::error::BackupError;
use crate::models::{Exercise, LoggedSet, NewExercise, NewSet, PrEvent, Session, SessionExercise};

pub fn create_exercise(
    conn: &Connection,
    exercise: &NewExercise,
    created_at: i64,
) -> Result<Exercise, BackupError> {
    let uid = new_uid();
    conn.execute(
        "INSERT INTO exercises (uid, name, description, muscle_group, equipment,
             is_bodyweight, created_at, last_rest_seconds, is_pinned)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            uid,
            exercise.name,
            exercise.description,
            exercise.muscle_group,
            exercise.equipment,
            exercise.is_bodyweight,
            created_at,
            exercise.last_rest_seconds,
            exercise.is_pinned,
        ],
    )?;

    Ok(Exercise {
        id: conn.last_insert_rowid(),
        uid: Some(uid),
        name: exercise.name.clone(),
        description: exercise.description.clone(),
        muscle_group: exercise.muscle_group.clone(),
        equipment: exercise.equipment.clone(),
        is_bodyweight: exercise.is_bodyweight,
        created_at: Some(created_at),
        last_rest_seconds: exercise.last_rest_seconds,
        is_pinned: exercise.is_pinned,
    })
}

pub fn find_exercise_by_name(
    conn: &Connection,
    name: &str,
) -> Result<Option<Exercise>, BackupError> {
    let exercise = conn
        .query_row(
            "SELECT id, uid, name, description, muscle_group, equipment, is_bodyweight,
                    created_at, last_rest_seconds, is_pinned
             FROM exercises WHERE name = ?1",
            [name],
            |row| {
                Ok(Exercise {
                    id: row.get(0)?,
                    uid: row.get(1)?,
                    name: row.get(2)?,
                    description: row.get(3)?,
                    muscle_group: row.get(4)?,
                    equipment: row.get(5)?,
                    is_bodyweight: row.get(6)?,
                    created_at: row.get(7)?,
                    last_rest_seconds: row.get(8)?,
                    is_pinned: row.get(9)?,
                })
            },
        )
        .optional()?;
    Ok(exercise)
}

/// Start a workout
pub fn start_session(
    conn: &Connection,
    started_at: i64,
    note: Option<&str>,
) -> Result<Session, BackupError> {
    let uid = new_uid();
    conn.execute(
        "INSERT INTO workouts (uid, started_at, note) VALUES (?1, ?2, ?3)",
        params![uid, started_at, note],
    )?;

    Ok(Session {
        id: conn.last_insert_rowid(),
        uid: Some(uid),
        started_at,
        completed_at: None,
        note: note.map(str::to_string),
    })
}

/// Finish a workout. Returns false when the workout does not exist.
pub fn complete_session(
    conn: &Connection,
    session_id: i64,
    completed_at: i64,
) -> Result<bool, BackupError> {
    let updated = conn.execute(
        "UPDATE workouts SET completed_at = ?1 WHERE id = ?2",
        params![completed_at, session_id],
    )?;
    Ok(updated > 0)
}

/// Add an exercise to a workout at the next order position
pub fn add_session_exercise(
    conn: &Connection,
    session_id: i64,
    exercise_id: i64,
) -> Result<SessionExercise, BackupError> {
    let next_order: i64 = conn.query_row(
        "SELECT COALESCE(MAX(order_index) + 1, 0) FROM workout_exercises WHERE workout_id = ?1",
        [session_id],
        |row| row.get(0),
    )?;

    let uid = new_uid();
    conn.execute(
        "INSERT INTO workout_exercises (uid, workout_id, exercise_id, order_index)
         VALUES (?1, ?2, ?3, ?4)",
        params![uid, session_id, exercise_id, next_order],
    )?;

    Ok(SessionExercise {
        id: conn.last_insert_rowid(),
        uid: Some(uid),
        workout_id: session_id,
        exercise_id,
        order_index: Some(next_order),
        note: None,
        current_weight: None,
        current_reps: None,
        completed_at: None,
        performed_at: None,
    })
}

pub fn log_set(conn: &Connection, set: &NewSet) -> Result<LoggedSet, BackupError> {
    let uid = new_uid();
    conn.execute(
        "INSERT INTO sets (uid, workout_id, exercise_id, workout_exercise_id, set_index,
             weight_kg, reps, rpe, rir, is_warmup, note, performed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            uid,
            set.workout_id,
            set.exercise_id,
            set.workout_exercise_id,
            set.set_index,
            set.weight_kg,
            set.reps,
            set.rpe,
            set.rir,
            set.is_warmup,
            set.note,
            set.performed_at,
        ],
    )?;

    Ok(LoggedSet {
        id: conn.last_insert_rowid(),
        uid: Some(uid),
        workout_id: set.workout_id,
        exercise_id: set.exercise_id,
        workout_exercise_id: set.workout_exercise_id,
        set_group_id: None,
        set_index: set.set_index,
        weight_kg: set.weight_kg,
        reps: set.reps,
        rpe: set.rpe,
        rir: set.rir,
        is_warmup: set.is_warmup,
        note: set.note.clone(),
        superset_group_id: None,
        performed_at: set.performed_at,
    })
}

/// Record a personal-record event for a logged set (e.g. `record_type = "5rm"`)
pub fn record_pr_event(
    conn: &Connection,
    set: &LoggedSet,
    record_type: &str,
    metric_value: f64,
    occurred_at: i64,
) -> Result<PrEvent, BackupError> {
    let uid = new_uid();
    conn.execute(
        "INSERT INTO pr_events (uid, set_id, exercise_id, type, metric_value, occurred_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![uid, set.id, set.exercise_id, record_type, metric_value, occurred_at],
    )?;

    Ok(PrEvent {
        id: conn.last_insert_rowid(),
        uid: Some(uid),
        set_id: set.id,
        exercise_id: set.exercise_id,
        record_type: record_type.to_string(),
        metric_value,
        occurred_at,
    })
}
