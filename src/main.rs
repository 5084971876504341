use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;

use workoutlog::backup::{DirectorySaver, ShareSaver};
use workoutlog::commands::backup::{
    backfill_identities, convert_csv, export_database, import_database, ExportOutcome,
    ImportOutcome,
};
use workoutlog::config::AppConfig;
use workoutlog::db::identity::BackfillReport;
use workoutlog::error::{CommandError, CommandResult};
use workoutlog::platform::{FsDirectoryAccess, PathPicker};
use workoutlog::{logging, open_state};

#[derive(Parser)]
#[command(name = "workoutlog", about = "WorkoutLog backup export and merge-import")]
struct Cli {
    /// Live database file (overrides WORKOUTLOG_DATA_DIR / WORKOUTLOG_DB_FILE)
    #[arg(long, global = true, value_name = "PATH")]
    database: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Snapshot the live database. Without --to the snapshot stays in the cache for sharing.
    Export {
        /// Directory to save the backup into
        #[arg(long, value_name = "DIR")]
        to: Option<PathBuf>,
    },
    /// Merge a backup file into the live database
    Import {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Assign missing row UIDs and rebuild the uid indexes
    Backfill,
    /// Convert a WorkoutLog CSV export into an importable backup
    CsvToBackup {
        #[arg(value_name = "CSV")]
        csv: PathBuf,
        /// Output file (defaults to the CSV path with a .db extension)
        #[arg(value_name = "OUT")]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.database.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            logging::init("workoutlog=info");
            return report::<()>(Err(err));
        }
    };
    logging::init(&config.log_filter);

    match cli.cmd {
        Cmd::Export { to } => report(export(&config, to).await),
        Cmd::Import { file } => report(import(&config, file).await),
        Cmd::Backfill => report(backfill(&config)),
        Cmd::CsvToBackup { csv, out } => {
            let out = out.unwrap_or_else(|| csv.with_extension("db"));
            report(convert_csv(&csv, &out))
        }
    }
}

async fn export(config: &AppConfig, to: Option<PathBuf>) -> CommandResult<ExportOutcome> {
    let state = open_state(config)?;
    match to {
        Some(dir) => {
            let saver = DirectorySaver::new(FsDirectoryAccess::granted(dir));
            export_database(&state, config, &saver).await
        }
        None => export_database(&state, config, &ShareSaver).await,
    }
}

async fn import(config: &AppConfig, file: PathBuf) -> CommandResult<ImportOutcome> {
    let state = open_state(config)?;
    import_database(&state, config, &PathPicker::new(Some(file))).await
}

fn backfill(config: &AppConfig) -> CommandResult<Vec<BackfillReport>> {
    let state = open_state(config)?;
    backfill_identities(&state, config)
}

fn load_config(database: Option<&Path>) -> CommandResult<AppConfig> {
    let mut config = AppConfig::load()?;

    if let Some(path) = database {
        if let Some(name) = path.file_name() {
            config.db_file_name = name.to_string_lossy().into_owned();
        }
        config.data_dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
    }

    Ok(config)
}

/// Print the outcome as JSON: results on stdout, errors on stderr
fn report<T: Serialize>(result: CommandResult<T>) -> ExitCode {
    match result {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(err) => {
                eprintln!("failed to serialize result: {err}");
                ExitCode::FAILURE
            }
        },
        Err(err) => {
            print_error(&err);
            ExitCode::FAILURE
        }
    }
}

fn print_error(err: &CommandError) {
    match serde_json::to_string_pretty(err) {
        Ok(json) => eprintln!("{json}"),
        Err(_) => eprintln!("{err}"),
    }
}
