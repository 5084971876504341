//! WorkoutLog Data Models
//!
//! Rust data models shared with the app's UI layer

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Exercise library entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub id: i64,
    pub uid: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub muscle_group: Option<String>,
    pub equipment: Option<String>,
    pub is_bodyweight: bool,
    pub created_at: Option<i64>,
    pub last_rest_seconds: Option<i64>,
    pub is_pinned: bool,
}

/// Fields needed to create an exercise
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExercise {
    pub name: String,
    pub description: Option<String>,
    pub muscle_group: Option<String>,
    pub equipment: Option<String>,
    pub is_bodyweight: bool,
    pub last_rest_seconds: Option<i64>,
    pub is_pinned: bool,
}

/// A workout (stored in `workouts`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: i64,
    pub uid: Option<String>,
    pub started_at: i64,
    pub completed_at: Option<i64>,
    pub note: Option<String>,
}

/// An exercise logged within a workout (stored in `workout_exercises`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionExercise {
    pub id: i64,
    pub uid: Option<String>,
    pub workout_id: i64,
    pub exercise_id: i64,
    pub order_index: Option<i64>,
    pub note: Option<String>,
    pub current_weight: Option<f64>,
    pub current_reps: Option<i64>,
    pub completed_at: Option<i64>,
    pub performed_at: Option<i64>,
}

/// A single logged set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggedSet {
    pub id: i64,
    pub uid: Option<String>,
    pub workout_id: i64,
    pub exercise_id: i64,
    pub workout_exercise_id: Option<i64>,
    pub set_group_id: Option<String>,
    pub set_index: Option<i64>,
    pub weight_kg: Option<f64>,
    pub reps: Option<i64>,
    pub rpe: Option<f64>,
    pub rir: Option<f64>,
    pub is_warmup: bool,
    pub note: Option<String>,
    pub superset_group_id: Option<String>,
    pub performed_at: Option<i64>,
}

/// Fields needed to log a set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSet {
    pub workout_id: i64,
    pub exercise_id: i64,
    pub workout_exercise_id: Option<i64>,
    pub set_index: Option<i64>,
    pub weight_kg: Option<f64>,
    pub reps: Option<i64>,
    pub rpe: Option<f64>,
    pub rir: Option<f64>,
    pub is_warmup: bool,
    pub note: Option<String>,
    pub performed_at: Option<i64>,
}

/// Personal-record event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrEvent {
    pub id: i64,
    pub uid: Option<String>,
    pub set_id: i64,
    pub exercise_id: i64,
    #[serde(rename = "type")]
    pub record_type: String,
    pub metric_value: f64,
    pub occurred_at: i64,
}

/// Inserted/updated counts for tables that support fill-missing updates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertCounts {
    pub inserted: u64,
    pub updated: u64,
    pub skipped: u64,
}

/// Inserted counts for append-only history tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertCounts {
    pub inserted: u64,
    pub skipped: u64,
}

/// Per-table outcome of one merge, before timing is attached
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableCounts {
    pub exercises: UpsertCounts,
    pub sessions: UpsertCounts,
    pub session_exercises: UpsertCounts,
    pub sets: InsertCounts,
    pub pr_events: InsertCounts,
}

/// Report returned to the caller after a successful merge-import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeResult {
    pub exercises: UpsertCounts,
    pub sessions: UpsertCounts,
    pub session_exercises: UpsertCounts,
    pub sets: InsertCounts,
    pub pr_events: InsertCounts,
    pub duration_ms: u64,
}

impl MergeResult {
    pub fn aggregate(counts: TableCounts, elapsed: Duration) -> Self {
        Self {
            exercises: counts.exercises,
            sessions: counts.sessions,
            session_exercises: counts.session_exercises,
            sets: counts.sets,
            pr_events: counts.pr_events,
            duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn total_inserted(&self) -> u64 {
        self.exercises.inserted
            + self.sessions.inserted
            + self.session_exercises.inserted
            + self.sets.inserted
            + self.pr_events.inserted
    }

    pub fn total_updated(&self) -> u64 {
        self.exercises.updated + self.sessions.updated + self.session_exercises.updated
    }

    /// One-line summary shown after an import, e.g. "Imported: 12 exercises, 4 workouts, ..."
    pub fn summary(&self) -> String {
        let mut text = format!(
            "Imported: {} exercises, {} workouts, {} workout exercises, {} sets, {} PRs",
            self.exercises.inserted,
            self.sessions.inserted,
            self.session_exercises.inserted,
            self.sets.inserted,
            self.pr_events.inserted,
        );

        let updated = self.total_updated();
        if updated > 0 {
            text.push_str(&format!(". Updated: {updated}"));
        }

        let skipped = self.exercises.skipped
            + self.sessions.skipped
            + self.session_exercises.skipped
            + self.sets.skipped
            + self.pr_events.skipped;
        if skipped > 0 {
            text.push_str(&format!(". Skipped: {skipped}"));
        }

        text.push_str(&format!(" ({} ms)", self.duration_ms));
        text
    }
}

/// How an exported backup reached the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SaveMethod {
    /// Written into a directory the user granted access to
    Directory,
    /// Left in the cache area for a share sheet to pick up
    Share,
}

/// Where an exported backup ended up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResult {
    pub location: String,
    pub method: SaveMethod,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_lists_inserted_counts() {
        let counts = TableCounts {
            exercises: UpsertCounts { inserted: 12, updated: 0, skipped: 0 },
            sessions: UpsertCounts { inserted: 4, updated: 0, skipped: 0 },
            ..TableCounts::default()
        };
        let result = MergeResult::aggregate(counts, Duration::from_millis(35));

        assert_eq!(
            result.summary(),
            "Imported: 12 exercises, 4 workouts, 0 workout exercises, 0 sets, 0 PRs (35 ms)"
        );
        assert_eq!(result.total_inserted(), 16);
    }

    #[test]
    fn summary_mentions_updates_and_skips() {
        let counts = TableCounts {
            exercises: UpsertCounts { inserted: 1, updated: 2, skipped: 0 },
            sets: InsertCounts { inserted: 0, skipped: 3 },
            ..TableCounts::default()
        };
        let summary = MergeResult::aggregate(counts, Duration::ZERO).summary();

        assert!(summary.contains("Updated: 2"));
        assert!(summary.contains("Skipped: 3"));
    }

    #[test]
    fn merge_result_serializes_camel_case() {
        let result = MergeResult::aggregate(TableCounts::default(), Duration::from_millis(7));
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["durationMs"], 7);
        assert!(json["sessionExercises"]["updated"].is_number());
        assert!(json["prEvents"].get("updated").is_none());
    }
}
