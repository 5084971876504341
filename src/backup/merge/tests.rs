use rusqlite::Connection;

use super::merge_all;
use crate::db::entities::find_exercise_by_name;
use crate::db::Database;
use crate::models::{InsertCounts, TableCounts, UpsertCounts};
use crate::test_support::{backup_conn, count, foreign_key_violations, SAMPLE_BACKUP};

fn live() -> Database {
    Database::open_in_memory().unwrap()
}

#[test]
fn fresh_import_inserts_every_row() {
    let db = live();
    let backup = backup_conn(SAMPLE_BACKUP);

    let counts = merge_all(db.conn(), &backup).unwrap();

    assert_eq!(counts.exercises, UpsertCounts { inserted: 3, updated: 0, skipped: 0 });
    assert_eq!(counts.sessions, UpsertCounts { inserted: 2, updated: 0, skipped: 0 });
    assert_eq!(counts.session_exercises.inserted, 3);
    assert_eq!(counts.sets, InsertCounts { inserted: 5, skipped: 0 });
    assert_eq!(counts.pr_events, InsertCounts { inserted: 1, skipped: 0 });
    assert_eq!(foreign_key_violations(db.conn()), 0);

    let (set_workout, pr_exercise): (String, String) = db
        .conn()
        .query_row(
            "SELECT w.uid, e.uid
             FROM pr_events p
             JOIN sets s ON s.id = p.set_id
             JOIN workouts w ON w.id = s.workout_id
             JOIN exercises e ON e.id = p.exercise_id
             WHERE p.uid = 'pr-1'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(set_workout, "wo-2");
    assert_eq!(pr_exercise, "ex-squat");
}

#[test]
fn foreign_keys_follow_live_ids_not_backup_ids() {
    let db = live();
    db.conn()
        .execute_batch(
            "INSERT INTO exercises (uid, name) VALUES ('local-1', 'Curl'), ('local-2', 'Dip');
             INSERT INTO workouts (uid, started_at) VALUES ('local-wo', 1);",
        )
        .unwrap();
    let backup = backup_conn(SAMPLE_BACKUP);

    merge_all(db.conn(), &backup).unwrap();

    let exercise_uid: String = db
        .conn()
        .query_row(
            "SELECT e.uid FROM sets s JOIN exercises e ON e.id = s.exercise_id
             WHERE s.uid = 'set-4'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exercise_uid, "ex-pullup");
}

#[test]
fn second_import_changes_nothing() {
    let db = live();
    let backup = backup_conn(SAMPLE_BACKUP);

    merge_all(db.conn(), &backup).unwrap();
    let second = merge_all(db.conn(), &backup).unwrap();

    assert_eq!(second, TableCounts::default());
    assert_eq!(count(db.conn(), "exercises"), 3);
    assert_eq!(count(db.conn(), "sets"), 5);
    assert_eq!(count(db.conn(), "pr_events"), 1);
}

#[test]
fn populated_fields_are_never_overwritten() {
    let db = live();
    db.conn()
        .execute(
            "INSERT INTO exercises (uid, name, description) VALUES ('U1', 'Bench Press', 'Keep elbows tucked')",
            [],
        )
        .unwrap();
    let backup = backup_conn(
        "INSERT INTO exercises (id, uid, name, description) VALUES
            (1, 'U1', 'Bench Press', 'Something else entirely'),
            (2, 'U2', 'Squat', NULL);",
    );

    let counts = merge_all(db.conn(), &backup).unwrap();

    assert_eq!(counts.exercises, UpsertCounts { inserted: 1, updated: 1, skipped: 0 });
    let bench = find_exercise_by_name(db.conn(), "Bench Press").unwrap().unwrap();
    assert_eq!(bench.description.as_deref(), Some("Keep elbows tucked"));
    assert!(find_exercise_by_name(db.conn(), "Squat").unwrap().is_some());
}

#[test]
fn null_fields_are_filled_once() {
    let db = live();
    db.conn()
        .execute(
            "INSERT INTO workouts (uid, started_at) VALUES ('W1', 1700000000000)",
            [],
        )
        .unwrap();
    let backup = backup_conn(
        "INSERT INTO workouts (id, uid, started_at, completed_at, note)
         VALUES (5, 'W1', 1700000000000, 1700003600000, 'legs');",
    );

    let first = merge_all(db.conn(), &backup).unwrap();
    assert_eq!(first.sessions, UpsertCounts { inserted: 0, updated: 1, skipped: 0 });

    let (completed_at, note): (Option<i64>, Option<String>) = db
        .conn()
        .query_row(
            "SELECT completed_at, note FROM workouts WHERE uid = 'W1'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(completed_at, Some(1_700_003_600_000));
    assert_eq!(note.as_deref(), Some("legs"));

    let second = merge_all(db.conn(), &backup).unwrap();
    assert_eq!(second.sessions, UpsertCounts::default());
}

#[test]
fn orphaned_children_are_skipped() {
    let db = live();
    let backup = backup_conn(
        "INSERT INTO exercises (id, uid, name) VALUES (1, 'ex-row', 'Row');
         INSERT INTO workouts (id, uid, started_at) VALUES (1, 'wo-ok', 1);
         INSERT INTO workout_exercises (id, uid, workout_id, exercise_id, order_index)
             VALUES (1, 'we-orphan', 99, 1, 0),
                    (2, 'we-ok', 1, 1, 1);
         INSERT INTO sets (id, uid, workout_id, exercise_id, workout_exercise_id, reps)
             VALUES (1, 'set-detached', 1, 1, 1, 10),
                    (2, 'set-orphan', 42, 1, 2, 8);
         INSERT INTO pr_events (id, uid, set_id, exercise_id, type, metric_value, occurred_at)
             VALUES (1, 'pr-orphan', 2, 1, '8rm', 60.0, 1);",
    );

    let counts = merge_all(db.conn(), &backup).unwrap();

    assert_eq!(counts.session_exercises, UpsertCounts { inserted: 1, updated: 0, skipped: 1 });
    assert_eq!(counts.sets, InsertCounts { inserted: 1, skipped: 1 });
    assert_eq!(counts.pr_events, InsertCounts { inserted: 0, skipped: 1 });
    assert_eq!(foreign_key_violations(db.conn()), 0);

    let detached: Option<i64> = db
        .conn()
        .query_row(
            "SELECT workout_exercise_id FROM sets WHERE uid = 'set-detached'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(detached, None);
}

#[test]
fn legacy_backup_matches_by_name_and_stays_idempotent() {
    let db = live();
    db.conn()
        .execute(
            "INSERT INTO exercises (uid, name) VALUES ('live-dl', 'Deadlift')",
            [],
        )
        .unwrap();

    let backup = Connection::open_in_memory().unwrap();
    backup
        .execute_batch(
            "CREATE TABLE exercises (id INTEGER PRIMARY KEY, name TEXT NOT NULL UNIQUE,
                 description TEXT, muscle_group TEXT, equipment TEXT,
                 is_bodyweight INTEGER NOT NULL DEFAULT 0);
             CREATE TABLE workouts (id INTEGER PRIMARY KEY, started_at INTEGER NOT NULL,
                 completed_at INTEGER, note TEXT);
             CREATE TABLE workout_exercises (id INTEGER PRIMARY KEY, workout_id INTEGER,
                 exercise_id INTEGER, order_index INTEGER);
             CREATE TABLE sets (id INTEGER PRIMARY KEY, workout_id INTEGER, exercise_id INTEGER,
                 workout_exercise_id INTEGER, set_index INTEGER, weight_kg REAL, reps INTEGER);
             INSERT INTO exercises (id, name, description) VALUES
                 (1, 'Deadlift', 'Hip hinge'),
                 (2, 'Lunge', NULL);
             INSERT INTO workouts (id, started_at) VALUES (1, 1690000000000);
             INSERT INTO workout_exercises (id, workout_id, exercise_id, order_index)
                 VALUES (1, 1, 1, 0);
             INSERT INTO sets (id, workout_id, exercise_id, workout_exercise_id, set_index, weight_kg, reps)
                 VALUES (1, 1, 1, 1, 0, 180.0, 3),
                        (2, 1, 2, NULL, 0, 20.0, 12);",
        )
        .unwrap();

    let first = merge_all(db.conn(), &backup).unwrap();
    assert_eq!(first.exercises, UpsertCounts { inserted: 1, updated: 1, skipped: 0 });
    assert_eq!(first.sets.inserted, 2);
    assert_eq!(first.pr_events, InsertCounts::default());

    let deadlift = find_exercise_by_name(db.conn(), "Deadlift").unwrap().unwrap();
    assert_eq!(deadlift.uid.as_deref(), Some("live-dl"));
    assert_eq!(deadlift.description.as_deref(), Some("Hip hinge"));

    let lunge = find_exercise_by_name(db.conn(), "Lunge").unwrap().unwrap();
    assert!(lunge.uid.unwrap().starts_with("legacy-"));

    let second = merge_all(db.conn(), &backup).unwrap();
    assert_eq!(second, TableCounts::default());
    assert_eq!(count(db.conn(), "sets"), 2);
}

#[test]
fn quotes_and_non_ascii_text_survive() {
    let db = live();
    let backup = backup_conn(
        "INSERT INTO exercises (id, uid, name, description) VALUES
            (1, 'ex-farmer', 'Farmer''s Walk', 'Don''t drop it'),
            (2, 'ex-ohp', 'Überkopfdrücken 💪', 'Schulterdrücken');",
    );

    let counts = merge_all(db.conn(), &backup).unwrap();
    assert_eq!(counts.exercises.inserted, 2);

    let farmer = find_exercise_by_name(db.conn(), "Farmer's Walk").unwrap().unwrap();
    assert_eq!(farmer.description.as_deref(), Some("Don't drop it"));
    assert!(find_exercise_by_name(db.conn(), "Überkopfdrücken 💪")
        .unwrap()
        .is_some());
}

#[test]
fn unreadable_value_names_the_failing_table() {
    let db = live();
    let backup = backup_conn(
        "INSERT INTO exercises (id, uid, name) VALUES (1, 'ex-1', 'Press');
         INSERT INTO workouts (id, uid, started_at) VALUES (1, 'wo-1', 1);
         INSERT INTO sets (id, uid, workout_id, exercise_id, weight_kg) VALUES (1, 'set-1', 1, 1, 'heavy');",
    );

    let err = merge_all(db.conn(), &backup).unwrap_err();
    assert_eq!(err.table, "sets");
}

#[test]
fn workout_without_start_time_is_skipped() {
    let db = live();
    let backup = Connection::open_in_memory().unwrap();
    backup
        .execute_batch(
            "CREATE TABLE workouts (id INTEGER PRIMARY KEY, uid TEXT, started_at INTEGER, note TEXT);
             INSERT INTO workouts (id, uid, started_at, note) VALUES (1, 'wo-broken', NULL, 'x');",
        )
        .unwrap();

    let counts = merge_all(db.conn(), &backup).unwrap();
    assert_eq!(counts.sessions, UpsertCounts { inserted: 0, updated: 0, skipped: 1 });
}
