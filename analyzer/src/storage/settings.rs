//! Settings file management

use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};

use crate::errors::AnalyzerError;
use crate::logs::LogLevel;

/// Environment variable consulted when the settings file carries no store token
pub const STORE_TOKEN_ENV: &str = "FWU_STORE_TOKEN";

/// Analyzer settings
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Directory for the log file; stdout only when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Emit JSON logs on stdout
    #[serde(default)]
    pub json_logs: bool,

    /// Servers analysed concurrently within one batch
    #[serde(default = "default_max_parallel_servers")]
    pub max_parallel_servers: usize,

    /// Record store configuration
    #[serde(default)]
    pub store: StoreSettings,

    /// Persistence retry configuration
    #[serde(default)]
    pub retry: RetrySettings,

    /// Audit side-file configuration
    #[serde(default)]
    pub audit: AuditSettings,
}

fn default_true() -> bool {
    true
}

fn default_max_parallel_servers() -> usize {
    4
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_dir: None,
            json_logs: false,
            max_parallel_servers: default_max_parallel_servers(),
            store: StoreSettings::default(),
            retry: RetrySettings::default(),
            audit: AuditSettings::default(),
        }
    }
}

impl Settings {
    /// Parse settings from JSON text and validate them
    pub fn from_json(contents: &str) -> Result<Self, AnalyzerError> {
        let settings: Settings = serde_json::from_str(contents)
            .map_err(|e| AnalyzerError::ConfigError(format!("invalid settings: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<(), AnalyzerError> {
        if self.max_parallel_servers == 0 {
            return Err(AnalyzerError::ConfigError(
                "max_parallel_servers must be at least 1".to_string(),
            ));
        }
        if self.retry.attempts == 0 {
            return Err(AnalyzerError::ConfigError(
                "retry.attempts must be at least 1".to_string(),
            ));
        }
        match self.store.kind {
            StoreKind::Http => {
                let base_url = self.store.base_url.as_deref().ok_or_else(|| {
                    AnalyzerError::ConfigError("store.base_url is required for the http store".to_string())
                })?;
                url::Url::parse(base_url).map_err(|e| {
                    AnalyzerError::ConfigError(format!("invalid store.base_url {}: {}", base_url, e))
                })?;
            }
            StoreKind::File if self.store.output_dir.is_none() => {
                return Err(AnalyzerError::ConfigError(
                    "store.output_dir is required for the file store".to_string(),
                ));
            }
            _ => {}
        }
        Ok(())
    }
}

/// Which record store receives finished records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Records are only written to audit files
    #[default]
    None,
    /// One JSON document per server in a directory
    File,
    /// Document store reachable over HTTP
    Http,
}

/// Record store settings
#[derive(Debug, Deserialize)]
pub struct StoreSettings {
    #[serde(default)]
    pub kind: StoreKind,

    /// Base URL of the document store API
    #[serde(default)]
    pub base_url: Option<String>,

    /// Target collection; defaults to the batch id
    #[serde(default)]
    pub collection: Option<String>,

    /// Bearer token for the document store
    #[serde(default, deserialize_with = "deserialize_secret")]
    pub token: Option<SecretString>,

    /// Output directory for the file store
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            kind: StoreKind::None,
            base_url: None,
            collection: None,
            token: None,
            output_dir: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.is_empty()).map(SecretString::from))
}

impl StoreSettings {
    /// Token from the settings file, falling back to the environment
    pub fn resolve_token(&self) -> Option<SecretString> {
        if let Some(token) = &self.token {
            return Some(SecretString::from(token.expose_secret().to_owned()));
        }
        std::env::var(STORE_TOKEN_ENV)
            .ok()
            .filter(|s| !s.is_empty())
            .map(SecretString::from)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Persistence retry settings
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySettings {
    /// Total store attempts per server, first try included
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    5000
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// Audit side-file settings
#[derive(Debug, Clone, Deserialize)]
pub struct AuditSettings {
    /// Write `<batchId>_<uuid>_analysis.json` per server
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Directory for audit files; `<batch>/analysis` when unset
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
        }
    }
}
