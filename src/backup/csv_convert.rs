//! CSV to Backup
//!
//! Turns a WorkoutLog CSV export (the `-----Strength-----` section) into a
//! backup database that the importer accepts.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use chrono::{Local, NaiveDateTime, TimeZone};
use csv::{ReaderBuilder, StringRecord, Trim};
use rusqlite::{params, Connection};
use serde::Serialize;

use crate::db::identity::{self, new_uid};
use crate::db::schema::{CREATE_SCHEMA, INSERT_DEFAULT_SETTINGS};
use crate::error::BackupError;

const SECTION_MARKER: &str = "-----";
const STRENGTH_SECTION: &str = "Strength";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvConversionSummary {
    pub exercises: u64,
    pub workouts: u64,
    pub workout_exercises: u64,
    pub sets: u64,
}

#[derive(Debug, Clone)]
struct StrengthRow {
    date: String,
    time: String,
    exercise: String,
    reps: String,
    weight: String,
    notes: String,
}

struct Columns {
    date: usize,
    time: Option<usize>,
    exercise: usize,
    reps: Option<usize>,
    weight: Option<usize>,
    notes: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self, BackupError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|header| header.trim().eq_ignore_ascii_case(name))
        };
        let required = |name: &str| {
            find(name).ok_or_else(|| {
                BackupError::InvalidBackup(format!("CSV is missing the '{name}' column"))
            })
        };

        Ok(Self {
            date: required("Date")?,
            time: find("Time"),
            exercise: required("Exercise")?,
            reps: find("# of Reps"),
            weight: find("Weight"),
            notes: find("Notes"),
        })
    }

    fn read(&self, record: &StringRecord) -> StrengthRow {
        let get = |index: Option<usize>| {
            index
                .and_then(|i| record.get(i))
                .unwrap_or_default()
                .trim()
                .to_string()
        };

        StrengthRow {
            date: get(Some(self.date)),
            time: get(self.time),
            exercise: get(Some(self.exercise)),
            reps: get(self.reps),
            weight: get(self.weight),
            notes: get(self.notes),
        }
    }
}

/// Keep only the strength section (header plus data lines). Falls back to the
/// whole file, minus a leading section marker, when there is no such section.
fn strength_section(content: &str) -> String {
    let mut in_section = false;
    let mut lines: Vec<&str> = Vec::new();

    for line in content.lines() {
        let stripped = line.trim();
        if stripped.starts_with(SECTION_MARKER) {
            if stripped.contains(STRENGTH_SECTION) {
                in_section = true;
                continue;
            }
            if in_section {
                break;
            }
        } else if in_section && !stripped.is_empty() {
            lines.push(stripped);
        }
    }

    if !lines.is_empty() {
        return lines.join("\n");
    }

    tracing::warn!("no Strength section found; reading the whole file");
    let mut all = content.lines();
    let mut fallback: Vec<&str> = Vec::new();
    if let Some(first) = all.next() {
        if !first.trim().starts_with(SECTION_MARKER) {
            fallback.push(first);
        }
    }
    fallback.extend(all);
    fallback.join("\n")
}

fn read_rows(csv_path: &Path) -> Result<Vec<StrengthRow>, BackupError> {
    let content = std::fs::read_to_string(csv_path)?;
    let content = content.trim_start_matches('\u{feff}');
    let section = strength_section(content);

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(section.as_bytes());
    let columns = Columns::from_headers(reader.headers()?)?;

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let row = columns.read(&record);
        if row.date.is_empty() || row.exercise.is_empty() {
            tracing::debug!(line = index + 2, "skipping CSV row without date or exercise");
            continue;
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Local date and time to epoch milliseconds. Unparseable input maps to now.
fn parse_timestamp(date: &str, time: &str) -> i64 {
    let text = format!("{date} {time}");
    let parsed = NaiveDateTime::parse_from_str(&text, "%d/%m/%Y %H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(&text, "%Y-%m-%d %H:%M"));

    match parsed {
        Ok(naive) => match Local.from_local_datetime(&naive).earliest() {
            Some(local) => local.timestamp_millis(),
            None => Local::now().timestamp_millis(),
        },
        Err(_) => {
            tracing::warn!(date, time, "unrecognized date; using current time");
            Local::now().timestamp_millis()
        }
    }
}

fn row_time(row: &StrengthRow) -> &str {
    if row.time.is_empty() {
        "00:00"
    } else {
        &row.time
    }
}

fn parse_optional<T: std::str::FromStr>(value: &str, field: &str) -> Option<T> {
    if value.is_empty() {
        return None;
    }
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!(field, value, "ignoring unparseable value");
            None
        }
    }
}

fn non_empty(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

/// Convert `csv_path` into a fresh backup at `db_path`, replacing any existing file
pub fn convert_csv_to_backup(
    csv_path: &Path,
    db_path: &Path,
) -> Result<CsvConversionSummary, BackupError> {
    let rows = read_rows(csv_path)?;
    if rows.is_empty() {
        return Err(BackupError::InvalidBackup(format!(
            "no data rows found in {}",
            csv_path.display()
        )));
    }

    let mut by_date: BTreeMap<&str, Vec<&StrengthRow>> = BTreeMap::new();
    for row in &rows {
        by_date.entry(row.date.as_str()).or_default().push(row);
    }
    tracing::info!(rows = rows.len(), days = by_date.len(), "parsed CSV export");

    if db_path.exists() {
        std::fs::remove_file(db_path)?;
    }
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut conn = Connection::open(db_path)?;
    conn.execute_batch(CREATE_SCHEMA)?;
    conn.execute(INSERT_DEFAULT_SETTINGS, [])?;

    let mut summary = CsvConversionSummary::default();
    let tx = conn.transaction()?;
    {
        let mut exercises: HashMap<&str, i64> = HashMap::new();

        for (date, day_rows) in by_date.iter().rev() {
            let earliest = day_rows.iter().map(|row| row_time(row)).min().unwrap_or("00:00");
            let latest = day_rows.iter().map(|row| row_time(row)).max().unwrap_or("00:00");
            let started_at = parse_timestamp(date, earliest);
            let completed_at = parse_timestamp(date, latest);

            tx.execute(
                "INSERT INTO workouts (uid, started_at, completed_at) VALUES (?1, ?2, ?3)",
                params![new_uid(), started_at, completed_at],
            )?;
            let workout_id = tx.last_insert_rowid();
            summary.workouts += 1;

            // Exercises in order of first appearance within the day
            let mut day_exercises: Vec<(&str, Vec<&StrengthRow>)> = Vec::new();
            for row in day_rows {
                match day_exercises
                    .iter_mut()
                    .find(|(name, _)| *name == row.exercise.as_str())
                {
                    Some((_, sets)) => sets.push(*row),
                    None => day_exercises.push((row.exercise.as_str(), vec![*row])),
                }
            }

            for (order_index, (name, sets)) in day_exercises.iter().enumerate() {
                let exercise_id = match exercises.get(name) {
                    Some(id) => *id,
                    None => {
                        tx.execute(
                            "INSERT INTO exercises (uid, name, created_at) VALUES (?1, ?2, ?3)",
                            params![new_uid(), name, started_at],
                        )?;
                        let id = tx.last_insert_rowid();
                        exercises.insert(*name, id);
                        summary.exercises += 1;
                        id
                    }
                };

                let Some(first) = sets.first() else {
                    continue;
                };
                let performed_at = parse_timestamp(&first.date, row_time(first));
                tx.execute(
                    "INSERT INTO workout_exercises (uid, workout_id, exercise_id, order_index,
                         note, performed_at, completed_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        new_uid(),
                        workout_id,
                        exercise_id,
                        order_index as i64,
                        non_empty(&first.notes),
                        performed_at,
                        performed_at,
                    ],
                )?;
                let workout_exercise_id = tx.last_insert_rowid();
                summary.workout_exercises += 1;

                for (set_index, row) in sets.iter().enumerate() {
                    tx.execute(
                        "INSERT INTO sets (uid, workout_id, exercise_id, workout_exercise_id,
                             set_index, weight_kg, reps, note, performed_at, is_warmup)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0)",
                        params![
                            new_uid(),
                            workout_id,
                            exercise_id,
                            workout_exercise_id,
                            set_index as i64,
                            parse_optional::<f64>(&row.weight, "weight"),
                            parse_optional::<i64>(&row.reps, "reps"),
                            non_empty(&row.notes),
                            parse_timestamp(&row.date, row_time(row)),
                        ],
                    )?;
                    summary.sets += 1;
                }
            }
        }
    }
    tx.commit()?;

    identity::backfill_all(&mut conn, 500)?;

    tracing::info!(
        output = %db_path.display(),
        exercises = summary.exercises,
        workouts = summary.workouts,
        workout_exercises = summary.workout_exercises,
        sets = summary.sets,
        "CSV converted to backup"
    );
    Ok(summary)
}
