//! Platform Capabilities
//!
//! Abstract file-system capabilities the backup flows depend on: a granted
//! save directory, a document picker, and the final save step of an export.
//! Each may suspend on user interaction; returning `None` means the user declined.

use std::future::Future;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::BackupError;
use crate::models::ExportResult;

/// Directory-permission save flow (save path A)
pub trait DirectoryAccess: Send + Sync {
    /// False when the runtime has no document/file-system capability at all
    fn is_available(&self) -> bool {
        true
    }

    /// Ask the user for a directory. `None` when the user declines.
    fn request_directory(
        &self,
    ) -> impl Future<Output = Result<Option<String>, BackupError>> + Send;

    /// Create an empty file and return its location
    fn create_file(
        &self,
        directory: &str,
        file_name: &str,
        mime_type: &str,
    ) -> impl Future<Output = Result<String, BackupError>> + Send;

    /// Replace the file's content with the base64-decoded payload
    fn write_base64(
        &self,
        location: &str,
        contents: &str,
    ) -> impl Future<Output = Result<(), BackupError>> + Send;
}

/// "Pick a document" capability used by the import flow
pub trait DocumentPicker: Send + Sync {
    fn is_available(&self) -> bool {
        true
    }

    /// Returns the picked file, or `None` when the picker was dismissed
    fn pick_document(
        &self,
        mime_types: &[&str],
    ) -> impl Future<Output = Result<Option<PathBuf>, BackupError>> + Send;
}

/// Final step of an export: hand the cached snapshot to the user
pub trait BackupSaver: Send + Sync {
    fn is_available(&self) -> bool {
        true
    }

    fn save(
        &self,
        snapshot: &Path,
    ) -> impl Future<Output = Result<ExportResult, BackupError>> + Send;
}

/// Directory access backed by the local file system. The "granted" directory is
/// decided up front (e.g. from a CLI flag); `None` behaves like a declined prompt.
#[derive(Debug, Clone, Default)]
pub struct FsDirectoryAccess {
    granted: Option<PathBuf>,
}

impl FsDirectoryAccess {
    pub fn granted(directory: impl Into<PathBuf>) -> Self {
        Self {
            granted: Some(directory.into()),
        }
    }

    pub fn declined() -> Self {
        Self { granted: None }
    }
}

impl DirectoryAccess for FsDirectoryAccess {
    async fn request_directory(&self) -> Result<Option<String>, BackupError> {
        let Some(directory) = &self.granted else {
            return Ok(None);
        };
        tokio::fs::create_dir_all(directory).await?;
        Ok(Some(directory.to_string_lossy().into_owned()))
    }

    async fn create_file(
        &self,
        directory: &str,
        file_name: &str,
        mime_type: &str,
    ) -> Result<String, BackupError> {
        let path = Path::new(directory).join(file_name);
        tokio::fs::File::create(&path).await?;
        tracing::debug!(path = %path.display(), mime_type, "created export file");
        Ok(path.to_string_lossy().into_owned())
    }

    async fn write_base64(&self, location: &str, contents: &str) -> Result<(), BackupError> {
        let bytes = STANDARD
            .decode(contents)
            .map_err(|err| {
                BackupError::InvalidOperation(format!("invalid base64 payload: {err}"))
            })?;
        tokio::fs::write(location, bytes).await?;
        Ok(())
    }
}

/// Picker that returns a path chosen before the flow started
#[derive(Debug, Clone, Default)]
pub struct PathPicker {
    path: Option<PathBuf>,
}

impl PathPicker {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }
}

impl DocumentPicker for PathPicker {
    async fn pick_document(&self, mime_types: &[&str]) -> Result<Option<PathBuf>, BackupError> {
        tracing::debug!(?mime_types, picked = ?self.path, "document picked");
        Ok(self.path.clone())
    }
}
