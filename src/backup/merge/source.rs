//! Backup Source
//!
//! Read side of a merge. Backups written by older app versions may lack whole
//! tables or individual columns; both read as empty / NULL.

use std::collections::HashSet;

use rusqlite::{Connection, Row};

use crate::db::identity::IdentityTable;

pub struct BackupSource<'a> {
    conn: &'a Connection,
}

impl<'a> BackupSource<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Column names of a backup table. Empty when the table does not exist.
    pub fn columns(&self, table: IdentityTable) -> rusqlite::Result<HashSet<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM pragma_table_info(?1)")?;
        let names = stmt.query_map([table.table_name()], |row| row.get::<_, String>(0))?;
        let columns = names.collect::<rusqlite::Result<HashSet<_>>>()?;
        Ok(columns)
    }

    /// SELECT over a fixed column list, substituting NULL for absent columns.
    /// `None` when the backup has no such table.
    pub fn select_sql(
        &self,
        table: IdentityTable,
        wanted: &[&str],
    ) -> rusqlite::Result<Option<String>> {
        let present = self.columns(table)?;
        if present.is_empty() {
            return Ok(None);
        }

        let select_list = wanted
            .iter()
            .map(|column| {
                if present.contains(*column) {
                    format!("\"{column}\"")
                } else {
                    format!("NULL AS \"{column}\"")
                }
            })
            .collect::<Vec<_>>()
            .join(", ");

        Ok(Some(format!(
            "SELECT {select_list} FROM {} ORDER BY id",
            table.table_name()
        )))
    }

    /// Load every row of `table`, mapping each with `map`
    pub fn load<T, F>(
        &self,
        table: IdentityTable,
        wanted: &[&str],
        map: F,
    ) -> rusqlite::Result<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let Some(sql) = self.select_sql(table, wanted)? else {
            tracing::debug!(table = table.table_name(), "backup has no such table");
            return Ok(Vec::new());
        };

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], map)?;
        let loaded = rows.collect::<rusqlite::Result<Vec<T>>>()?;
        Ok(loaded)
    }
}
