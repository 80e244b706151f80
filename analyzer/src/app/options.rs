//! Batch configuration options

use std::path::{Path, PathBuf};

use crate::persist::store::RetryPolicy;
use crate::storage::settings::Settings;

/// Options for one batch run
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Prepared bundle directory
    pub batch_dir: PathBuf,

    /// Batch identifier used in audit file names and as default collection
    pub batch_id: String,

    /// Servers analysed concurrently
    pub max_parallel_servers: usize,

    /// Persistence retry policy
    pub retry: RetryPolicy,

    /// Audit side-file options
    pub audit: AuditOptions,
}

/// Audit side-file options
#[derive(Debug, Clone)]
pub struct AuditOptions {
    pub enabled: bool,

    /// Output directory; `<batch>/analysis` when unset
    pub dir: Option<PathBuf>,
}

impl Default for AuditOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
        }
    }
}

/// Default batch id: the batch directory name
pub fn default_batch_id(batch_dir: &Path) -> String {
    batch_dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "batch".to_string())
}

impl BatchOptions {
    /// Options with defaults for everything but the directory
    pub fn new(batch_dir: impl Into<PathBuf>) -> Self {
        let batch_dir = batch_dir.into();
        Self {
            batch_id: default_batch_id(&batch_dir),
            batch_dir,
            max_parallel_servers: 4,
            retry: RetryPolicy::default(),
            audit: AuditOptions::default(),
        }
    }

    /// Options derived from the settings file
    pub fn from_settings(
        batch_dir: impl Into<PathBuf>,
        batch_id: Option<String>,
        settings: &Settings,
    ) -> Self {
        let mut options = Self::new(batch_dir);
        if let Some(batch_id) = batch_id.filter(|id| !id.is_empty()) {
            options.batch_id = batch_id;
        }
        options.max_parallel_servers = settings.max_parallel_servers.max(1);
        options.retry = RetryPolicy::from(&settings.retry);
        options.audit = AuditOptions {
            enabled: settings.audit.enabled,
            dir: settings.audit.dir.clone(),
        };
        options
    }
}
