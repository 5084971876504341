//! Shared fixtures for backup tests

use std::path::{Path, PathBuf};

use rusqlite::Connection;

use crate::db::schema::CREATE_SCHEMA;

/// Three exercises, two workouts, three workout exercises, five sets, one PR
pub const SAMPLE_BACKUP: &str = r#"
INSERT INTO exercises (id, uid, name, description, muscle_group, equipment,
    is_bodyweight, created_at, last_rest_seconds, is_pinned) VALUES
    (1, 'ex-bench', 'Bench Press', 'Flat barbell press', 'chest', 'barbell', 0, 1700000000000, 180, 1),
    (2, 'ex-squat', 'Squat', NULL, 'legs', 'barbell', 0, 1700000000000, 240, 0),
    (3, 'ex-pullup', 'Pull Up', NULL, 'back', NULL, 1, 1700000000000, NULL, 0);
INSERT INTO workouts (id, uid, started_at, completed_at, note) VALUES
    (1, 'wo-1', 1700000100000, 1700003700000, 'push'),
    (2, 'wo-2', 1700086500000, NULL, NULL);
INSERT INTO workout_exercises (id, uid, workout_id, exercise_id, order_index,
    current_weight, current_reps, performed_at) VALUES
    (1, 'we-1', 1, 1, 0, 100.0, 5, 1700000200000),
    (2, 'we-2', 2, 2, 0, 140.0, 3, 1700086600000),
    (3, 'we-3', 2, 3, 1, NULL, 8, 1700087000000);
INSERT INTO sets (id, uid, workout_id, exercise_id, workout_exercise_id, set_index,
    weight_kg, reps, is_warmup, performed_at) VALUES
    (1, 'set-1', 1, 1, 1, 0, 60.0, 10, 1, 1700000200000),
    (2, 'set-2', 1, 1, 1, 1, 100.0, 5, 0, 1700000400000),
    (3, 'set-3', 2, 2, 2, 0, 140.0, 3, 0, 1700086600000),
    (4, 'set-4', 2, 3, 3, 0, NULL, 8, 0, 1700087000000),
    (5, 'set-5', 2, 3, 3, 1, NULL, 7, 0, 1700087200000);
INSERT INTO pr_events (id, uid, set_id, exercise_id, type, metric_value, occurred_at) VALUES
    (1, 'pr-1', 3, 2, '3rm', 140.0, 1700086600000);
"#;

/// In-memory backup with the current schema and `data`
pub fn backup_conn(data: &str) -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    // Bundled SQLite enforces foreign keys by default; backups may hold orphans
    conn.execute_batch("PRAGMA foreign_keys = OFF;").unwrap();
    conn.execute_batch(CREATE_SCHEMA).unwrap();
    conn.execute_batch(data).unwrap();
    conn
}

/// Backup file with the current schema and `data`
pub fn backup_file(dir: &Path, name: &str, data: &str) -> PathBuf {
    let mut sql = String::from(CREATE_SCHEMA);
    sql.push_str(data);
    raw_backup_file(dir, name, &sql)
}

/// Backup file built from arbitrary SQL, for legacy layouts
pub fn raw_backup_file(dir: &Path, name: &str, sql: &str) -> PathBuf {
    let path = dir.join(name);
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(sql).unwrap();
    path
}

pub fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .unwrap()
}

/// Number of foreign-key violations across the whole database
pub fn foreign_key_violations(conn: &Connection) -> usize {
    let mut stmt = conn.prepare("PRAGMA foreign_key_check").unwrap();
    let rows = stmt.query_map([], |_| Ok(())).unwrap();
    rows.count()
}
