//! File operations

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::warn;

use crate::errors::AnalyzerError;

/// A file wrapper with path
#[derive(Debug, Clone)]
pub struct File {
    path: PathBuf,
}

impl File {
    /// Create a new file reference
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the file name, lossily converted
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Check if the file exists
    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    /// Read file contents as string.
    ///
    /// Logs are not guaranteed to be valid UTF-8, so invalid sequences are
    /// replaced rather than rejected.
    pub async fn read_string(&self) -> Result<String, AnalyzerError> {
        let mut file = fs::File::open(&self.path).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                AnalyzerError::MissingInput(self.path.display().to_string())
            } else {
                AnalyzerError::IoError(e)
            }
        })?;
        let mut contents = Vec::new();
        file.read_to_end(&mut contents).await?;
        Ok(String::from_utf8_lossy(&contents).into_owned())
    }

    /// Read the file, or `None` when it does not exist
    pub async fn read_optional_string(&self) -> Result<Option<String>, AnalyzerError> {
        match self.read_string().await {
            Ok(contents) => Ok(Some(contents)),
            Err(AnalyzerError::MissingInput(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Read an input that the batch can do without. Absent and unreadable
    /// files are logged as `what` and yield `None`.
    pub async fn read_or_warn(&self, what: &str) -> Option<String> {
        match self.read_optional_string().await {
            Ok(Some(contents)) => Some(contents),
            Ok(None) => {
                warn!("{} not found at {:?}", what, self.path);
                None
            }
            Err(e) => {
                warn!("{} at {:?} could not be read: {}", what, self.path, e);
                None
            }
        }
    }

    /// Read file as JSON
    pub async fn read_json<T: DeserializeOwned>(&self) -> Result<T, AnalyzerError> {
        let contents = self.read_string().await?;
        let value = serde_json::from_str(&contents)?;
        Ok(value)
    }

    /// Write string to file
    pub async fn write_string(&self, contents: &str) -> Result<(), AnalyzerError> {
        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&self.path).await?;
        file.write_all(contents.as_bytes()).await?;
        file.sync_all().await?;
        Ok(())
    }

    /// Write JSON to file
    pub async fn write_json<T: Serialize>(&self, value: &T) -> Result<(), AnalyzerError> {
        let contents = serde_json::to_string_pretty(value)?;
        self.write_atomic(contents.as_bytes()).await
    }

    /// Atomic write using a temporary file
    pub async fn write_atomic(&self, contents: &[u8]) -> Result<(), AnalyzerError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let temp_path = self.path.with_extension("tmp");

        // Write to temp file
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(contents).await?;
        file.sync_all().await?;
        drop(file);

        // Rename to target
        fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }
}
