use std::collections::HashMap;

/// Backup-local id to live id for one table, scoped to a single import
#[derive(Debug, Default, Clone)]
pub struct IdMap {
    ids: HashMap<i64, i64>,
}

impl IdMap {
    pub fn record(&mut self, backup_id: i64, live_id: i64) {
        self.ids.insert(backup_id, live_id);
    }

    pub fn resolve(&self, backup_id: i64) -> Option<i64> {
        self.ids.get(&backup_id).copied()
    }

    /// Resolve a nullable foreign key. `None` in, `None` out.
    pub fn resolve_optional(&self, backup_id: Option<i64>) -> Option<i64> {
        backup_id.and_then(|id| self.resolve(id))
    }
}

/// One map per synced table, filled as each merger runs
#[derive(Debug, Default)]
pub struct IdMaps {
    pub exercises: IdMap,
    pub sessions: IdMap,
    pub session_exercises: IdMap,
    pub sets: IdMap,
    pub pr_events: IdMap,
}
