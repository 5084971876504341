//! Backup Engine
//!
//! Export of the live database, header validation, and the merge-import of a
//! previously exported (or foreign-device) backup.

pub mod csv_convert;
pub mod export;
pub mod import;
pub mod merge;
pub mod validate;

pub use csv_convert::{convert_csv_to_backup, CsvConversionSummary};
pub use export::{snapshot_to_cache, DirectorySaver, ShareSaver, BACKUP_MIME_TYPE};
pub use import::{merge_backup_file, TempBackup, BACKUP_MIME_TYPES};
pub use validate::{ensure_sqlite_file, is_sqlite_file};
