//! Backup Import
//!
//! Header gate, staging copy, and the single live transaction wrapped around
//! all five table mergers.

use std::path::{Path, PathBuf};
use std::time::Instant;

use rusqlite::{Connection, OpenFlags, TransactionBehavior};
use tempfile::TempDir;

use super::merge::merge_all;
use super::validate::ensure_sqlite_file;
use crate::db::Database;
use crate::error::BackupError;
use crate::models::MergeResult;

/// MIME types offered to the document picker
pub const BACKUP_MIME_TYPES: [&str; 3] = [
    "application/x-sqlite3",
    "application/vnd.sqlite3",
    "application/octet-stream",
];

/// Staged copy of a picked backup plus its read-only connection.
///
/// The copy lives in its own directory under the cache so SQLite sidecar files
/// (`-wal`, `-shm`, `-journal`) go with it. Dropping the guard closes the
/// connection and removes the whole directory.
pub struct TempBackup {
    dir: Option<TempDir>,
    path: PathBuf,
    conn: Option<Connection>,
}

impl TempBackup {
    /// Copy `source` into a fresh staging directory under `cache_dir`
    pub fn stage(source: &Path, cache_dir: &Path) -> Result<Self, BackupError> {
        std::fs::create_dir_all(cache_dir)?;
        let dir = TempDir::new_in(cache_dir)?;
        let path = dir.path().join("import.db");
        std::fs::copy(source, &path)?;

        Ok(Self {
            dir: Some(dir),
            path,
            conn: None,
        })
    }

    /// Open the staged copy read-only and make sure SQLite can parse it
    pub fn open(&mut self) -> Result<&Connection, BackupError> {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|err| BackupError::InvalidBackup(format!("cannot open backup: {err}")))?;

        conn.query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| row.get::<_, i64>(0))
            .map_err(|err| BackupError::InvalidBackup(format!("unreadable backup: {err}")))?;

        let conn = self.conn.insert(conn);
        Ok(&*conn)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempBackup {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err((_, err)) = conn.close() {
                tracing::warn!(error = %err, "failed to close backup connection");
            }
        }

        if let Some(dir) = self.dir.take() {
            let dir_path = dir.path().to_path_buf();
            if let Err(err) = dir.close() {
                tracing::warn!(
                    path = %dir_path.display(),
                    error = %err,
                    "failed to remove staged backup"
                );
            }
        }
    }
}

/// Merge the backup at `path` into the live database.
///
/// All-or-nothing: on any merge failure the live transaction is rolled back and
/// the error is returned. The staged copy is removed on every path.
pub fn merge_backup_file(
    db: &mut Database,
    path: &Path,
    cache_dir: &Path,
) -> Result<MergeResult, BackupError> {
    ensure_sqlite_file(path)?;

    let started = Instant::now();
    let mut staged = TempBackup::stage(path, cache_dir)?;
    let backup = staged.open()?;

    let tx = db
        .conn_mut()
        .transaction_with_behavior(TransactionBehavior::Immediate)?;

    let counts = match merge_all(&tx, backup) {
        Ok(counts) => counts,
        Err(err) => {
            tracing::error!(table = err.table, error = %err.source, "merge failed; rolling back");
            if let Err(rollback_err) = tx.rollback() {
                tracing::error!(error = %rollback_err, "rollback failed");
            }
            return Err(err.into());
        }
    };
    tx.commit()?;

    let result = MergeResult::aggregate(counts, started.elapsed());
    tracing::info!(
        source = %path.display(),
        inserted = result.total_inserted(),
        updated = result.total_updated(),
        duration_ms = result.duration_ms,
        "backup merged"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UpsertCounts;
    use crate::test_support::{backup_file, count, raw_backup_file, SAMPLE_BACKUP};
    use tempfile::tempdir;

    fn cache_is_empty(cache: &Path) -> bool {
        !cache.exists() || std::fs::read_dir(cache).unwrap().next().is_none()
    }

    #[test]
    fn imports_backup_file_and_cleans_up() {
        let dir = tempdir().unwrap();
        let cache = dir.path().join("cache");
        let path = backup_file(dir.path(), "backup.db", SAMPLE_BACKUP);
        let mut db = Database::open_in_memory().unwrap();

        let result = merge_backup_file(&mut db, &path, &cache).unwrap();

        assert_eq!(result.exercises, UpsertCounts { inserted: 3, updated: 0, skipped: 0 });
        assert_eq!(result.sessions.inserted, 2);
        assert_eq!(result.sets.inserted, 5);
        assert!(result.summary().starts_with("Imported: 3 exercises, 2 workouts"));
        assert!(cache_is_empty(&cache));
        assert!(path.exists());
    }

    #[test]
    fn failed_merge_rolls_back_everything() {
        let dir = tempdir().unwrap();
        let cache = dir.path().join("cache");
        let path = backup_file(
            dir.path(),
            "broken.db",
            "INSERT INTO exercises (id, uid, name) VALUES (1, 'ex-1', 'Press'), (2, 'ex-2', 'Row');
             INSERT INTO workouts (id, uid, started_at) VALUES (1, 'wo-1', 1);
             INSERT INTO workout_exercises (id, uid, workout_id, exercise_id) VALUES (1, 'we-1', 1, 1);
             INSERT INTO sets (id, uid, workout_id, exercise_id, weight_kg) VALUES
                 (1, 'set-1', 1, 1, 60.0),
                 (2, 'set-2', 1, 1, 'heavy');",
        );
        let mut db = Database::open_in_memory().unwrap();
        db.conn()
            .execute("INSERT INTO exercises (uid, name) VALUES ('keep', 'Curl')", [])
            .unwrap();

        let err = merge_backup_file(&mut db, &path, &cache).unwrap_err();

        match err {
            BackupError::Merge(merge) => assert_eq!(merge.table, "sets"),
            other => panic!("expected merge failure, got {other:?}"),
        }
        assert_eq!(count(db.conn(), "exercises"), 1);
        assert_eq!(count(db.conn(), "workouts"), 0);
        assert_eq!(count(db.conn(), "workout_exercises"), 0);
        assert_eq!(count(db.conn(), "sets"), 0);
        assert!(cache_is_empty(&cache));
    }

    #[test]
    fn failure_after_some_sets_are_written_rolls_back_everything() {
        let dir = tempdir().unwrap();
        let cache = dir.path().join("cache");
        let path = backup_file(dir.path(), "backup.db", SAMPLE_BACKUP);
        let mut db = Database::open_in_memory().unwrap();
        db.conn()
            .execute_batch(
                "CREATE TRIGGER reject_second_set BEFORE INSERT ON sets
                 WHEN (SELECT COUNT(*) FROM sets) >= 1
                 BEGIN SELECT RAISE(ABORT, 'sets are full'); END;",
            )
            .unwrap();

        let err = merge_backup_file(&mut db, &path, &cache).unwrap_err();

        match err {
            BackupError::Merge(merge) => assert_eq!(merge.table, "sets"),
            other => panic!("expected merge failure, got {other:?}"),
        }
        assert_eq!(count(db.conn(), "exercises"), 0);
        assert_eq!(count(db.conn(), "workouts"), 0);
        assert_eq!(count(db.conn(), "workout_exercises"), 0);
        assert_eq!(count(db.conn(), "sets"), 0);
        assert!(cache_is_empty(&cache));
    }

    #[test]
    fn wal_mode_backup_leaves_no_sidecars_in_cache() {
        let dir = tempdir().unwrap();
        let cache = dir.path().join("cache");
        let path = backup_file(dir.path(), "wal.db", SAMPLE_BACKUP);
        {
            let conn = Connection::open(&path).unwrap();
            let mode: String = conn
                .query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))
                .unwrap();
            assert_eq!(mode, "wal");
        }
        let mut db = Database::open_in_memory().unwrap();

        let result = merge_backup_file(&mut db, &path, &cache).unwrap();

        assert_eq!(result.exercises.inserted, 3);
        assert!(cache_is_empty(&cache));
    }

    #[test]
    fn text_file_is_rejected_before_staging() {
        let dir = tempdir().unwrap();
        let cache = dir.path().join("cache");
        let path = dir.path().join("export.csv");
        std::fs::write(&path, "Date,Time,Exercise\n").unwrap();
        let mut db = Database::open_in_memory().unwrap();

        let err = merge_backup_file(&mut db, &path, &cache).unwrap_err();

        assert!(matches!(err, BackupError::InvalidBackup(_)));
        assert!(!cache.exists());
    }

    #[test]
    fn corrupt_body_after_valid_header_is_invalid_input() {
        let dir = tempdir().unwrap();
        let cache = dir.path().join("cache");
        let path = dir.path().join("corrupt.db");
        let mut bytes = b"SQLite format 3\0".to_vec();
        bytes.extend(std::iter::repeat(0xAB).take(4096));
        std::fs::write(&path, bytes).unwrap();
        let mut db = Database::open_in_memory().unwrap();

        let err = merge_backup_file(&mut db, &path, &cache).unwrap_err();

        assert!(matches!(err, BackupError::InvalidBackup(_)));
        assert!(cache_is_empty(&cache));
    }

    #[test]
    fn legacy_backup_file_imports_twice_cleanly() {
        let dir = tempdir().unwrap();
        let cache = dir.path().join("cache");
        let path = raw_backup_file(
            dir.path(),
            "legacy.db",
            "CREATE TABLE exercises (id INTEGER PRIMARY KEY, name TEXT NOT NULL UNIQUE);
             CREATE TABLE workouts (id INTEGER PRIMARY KEY, started_at INTEGER NOT NULL);
             CREATE TABLE sets (id INTEGER PRIMARY KEY, workout_id INTEGER, exercise_id INTEGER, reps INTEGER);
             INSERT INTO exercises (id, name) VALUES (1, 'Goblet Squat');
             INSERT INTO workouts (id, started_at) VALUES (1, 1680000000000);
             INSERT INTO sets (id, workout_id, exercise_id, reps) VALUES (1, 1, 1, 12), (2, 1, 1, 10);",
        );
        let mut db = Database::open_in_memory().unwrap();

        let first = merge_backup_file(&mut db, &path, &cache).unwrap();
        let second = merge_backup_file(&mut db, &path, &cache).unwrap();

        assert_eq!(first.total_inserted(), 4);
        assert_eq!(second.total_inserted(), 0);
        assert_eq!(second.total_updated(), 0);
    }

    #[test]
    fn guard_removes_staged_copy() {
        let dir = tempdir().unwrap();
        let path = backup_file(dir.path(), "b.db", "");

        let cache = dir.path().join("cache");

        let staged_path = {
            let mut staged = TempBackup::stage(&path, &cache).unwrap();
            staged.open().unwrap();
            staged.path().to_path_buf()
        };

        assert!(!staged_path.exists());
        assert!(staged_path.parent().map_or(true, |parent| !parent.exists()));
        assert!(cache_is_empty(&cache));
    }
}
