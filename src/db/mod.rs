//! Database Module
//!
//! SQLite connection handle for the live workout database

pub mod entities;
pub mod identity;
pub mod schema;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, TryLockError};

use rusqlite::Connection;

use crate::error::BackupError;
use identity::{BackfillReport, IdentityTable};

/// Process-wide shared database handle
pub struct DbState(pub Mutex<Database>);

impl DbState {
    pub fn new(db: Database) -> Self {
        Self(Mutex::new(db))
    }

    /// Take exclusive access for an export or import. A second concurrent
    /// operation is rejected instead of waiting behind the first.
    pub fn try_acquire(&self) -> Result<MutexGuard<'_, Database>, BackupError> {
        match self.0.try_lock() {
            Ok(guard) => Ok(guard),
            Err(TryLockError::WouldBlock) => Err(BackupError::Busy),
            Err(TryLockError::Poisoned(err)) => Err(BackupError::InvalidOperation(format!(
                "database lock poisoned: {err}"
            ))),
        }
    }
}

/// Live database wrapper
pub struct Database {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Database {
    /// Open (or create) the database file at `path`
    pub fn new(path: &Path) -> Result<Self, BackupError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        tracing::debug!(path = %path.display(), "opened live database");
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// In-memory database with the schema applied. Has no on-disk location.
    pub fn open_in_memory() -> Result<Self, BackupError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let mut db = Self { conn, path: None };
        db.initialize(500)?;
        Ok(db)
    }

    /// Create the schema, upgrade legacy tables, and backfill missing UIDs
    pub fn initialize(&mut self, batch_size: usize) -> Result<Vec<BackfillReport>, BackupError> {
        self.conn.execute_batch(schema::CREATE_SCHEMA)?;
        self.conn.execute(schema::INSERT_DEFAULT_SETTINGS, [])?;
        for table in IdentityTable::ALL {
            identity::ensure_uid_column(&self.conn, table)?;
        }
        let reports = identity::backfill_all(&mut self.conn, batch_size)?;
        Ok(reports)
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// On-disk location of the live database, if it has one
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Row count of a synced table
    pub fn count(&self, table: IdentityTable) -> Result<i64, BackupError> {
        let sql = format!("SELECT COUNT(*) FROM {}", table.table_name());
        let count = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count)
    }
}
