use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use super::{resolve_uid, BackupSource, FillMissing, IdMaps};
use crate::db::identity::{find_by_uid, IdentityTable};
use crate::error::MergeError;
use crate::models::UpsertCounts;

const TABLE: IdentityTable = IdentityTable::Exercises;

const COLUMNS: &[&str] = &[
    "id",
    "uid",
    "name",
    "description",
    "muscle_group",
    "equipment",
    "is_bodyweight",
    "created_at",
    "last_rest_seconds",
    "is_pinned",
];

#[derive(Debug, Serialize)]
struct BackupExercise {
    id: i64,
    uid: Option<String>,
    name: String,
    description: Option<String>,
    muscle_group: Option<String>,
    equipment: Option<String>,
    is_bodyweight: bool,
    created_at: Option<i64>,
    last_rest_seconds: Option<i64>,
    is_pinned: bool,
}

impl BackupExercise {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            uid: row.get("uid")?,
            name: row.get("name")?,
            description: row.get("description")?,
            muscle_group: row.get("muscle_group")?,
            equipment: row.get("equipment")?,
            is_bodyweight: row.get::<_, Option<bool>>("is_bodyweight")?.unwrap_or(false),
            created_at: row.get("created_at")?,
            last_rest_seconds: row.get("last_rest_seconds")?,
            is_pinned: row.get::<_, Option<bool>>("is_pinned")?.unwrap_or(false),
        })
    }
}

/// Fillable columns of a live exercise
struct LiveExercise {
    uid: Option<String>,
    description: Option<String>,
    muscle_group: Option<String>,
    equipment: Option<String>,
    created_at: Option<i64>,
    last_rest_seconds: Option<i64>,
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
    let rows = source.load(TABLE, COLUMNS, BackupExercise::from_row)?;
    let mut counts = UpsertCounts::default();

    for row in rows {
        let uid = resolve_uid(TABLE, row.id, row.uid.as_deref(), &row);

        // Backups taken before UIDs existed still line up by name
        let matched = match find_by_uid(live, TABLE, &uid)? {
            Some(id) => Some(id),
            None => live
                .query_row(
                    "SELECT id FROM exercises WHERE name = ?1",
                    [&row.name],
                    |r| r.get::<_, i64>(0),
                )
                .optional()?,
        };

        match matched {
            Some(live_id) => {
                if fill_missing(live, live_id, &uid, &row)? {
                    counts.updated += 1;
                }
                maps.exercises.record(row.id, live_id);
            }
            None => {
                live.execute(
                    "INSERT INTO exercises (uid, name, description, muscle_group, equipment,
                         is_bodyweight, created_at, last_rest_seconds, is_pinned)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    params![
                        uid,
                        row.name,
                        row.description,
                        row.muscle_group,
                        row.equipment,
                        row.is_bodyweight,
                        row.created_at,
                        row.last_rest_seconds,
                        row.is_pinned,
                    ],
                )?;
                maps.exercises.record(row.id, live.last_insert_rowid());
                counts.inserted += 1;
            }
        }
    }

    tracing::debug!(
        table = TABLE.table_name(),
        inserted = counts.inserted,
        updated = counts.updated,
        "merged"
    );
    Ok(counts)
}

/// Returns true when the matched row counts as updated
fn fill_missing(
    live: &Connection,
    live_id: i64,
    uid: &str,
    row: &BackupExercise,
) -> rusqlite::Result<bool> {
    let mut current = live.query_row(
        "SELECT uid, description, muscle_group, equipment, created_at, last_rest_seconds
         FROM exercises WHERE id = ?1",
        [live_id],
        |r| {
            Ok(LiveExercise {
                uid: r.get(0)?,
                description: r.get(1)?,
                muscle_group: r.get(2)?,
                equipment: r.get(3)?,
                created_at: r.get(4)?,
                last_rest_seconds: r.get(5)?,
            })
        },
    )?;

    let mut fill = FillMissing::default();
    fill.identity(&mut current.uid, uid);
    fill.field(&mut current.description, row.description.clone());
    fill.field(&mut current.muscle_group, row.muscle_group.clone());
    fill.field(&mut current.equipment, row.equipment.clone());
    fill.field(&mut current.created_at, row.created_at);
    fill.field(&mut current.last_rest_seconds, row.last_rest_seconds);

    if fill.filled() {
        live.execute(
            "UPDATE exercises
             SET uid = ?1, description = ?2, muscle_group = ?3, equipment = ?4,
                 created_at = ?5, last_rest_seconds = ?6
             WHERE id = ?7",
            params![
                current.uid,
                current.description,
                current.muscle_group,
                current.equipment,
                current.created_at,
                current.last_rest_seconds,
                live_id,
            ],
        )?;
    }

    Ok(fill.changed())
}
