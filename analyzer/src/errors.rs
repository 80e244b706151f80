//! Error types for the analyzer

use thiserror::Error;

/// Main error type for the analyzer
#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// A required input file or directory is absent
    #[error("Missing input: {0}")]
    MissingInput(String),

    /// Embedded structured data was located but could not be decoded
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Not enough occurrences to anchor an extraction, or an unrecognized discriminator
    #[error("Ambiguity failure: {0}")]
    AmbiguityFailure(String),

    /// The record store rejected the record or retries were exhausted
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    /// The record store could not be reached; worth retrying
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AnalyzerError {
    /// Whether a persistence attempt failing with this error may be retried
    pub fn is_transient(&self) -> bool {
        match self {
            AnalyzerError::StoreUnavailable(_) | AnalyzerError::IoError(_) => true,
            AnalyzerError::HttpError(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }

    /// Short taxonomy label used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            AnalyzerError::IoError(_) => "io",
            AnalyzerError::JsonError(_) => "json",
            AnalyzerError::HttpError(_) => "http",
            AnalyzerError::MissingInput(_) => "missing_input",
            AnalyzerError::MalformedPayload(_) => "malformed_payload",
            AnalyzerError::AmbiguityFailure(_) => "ambiguity_failure",
            AnalyzerError::PersistenceFailure(_) => "persistence_failure",
            AnalyzerError::StoreUnavailable(_) => "store_unavailable",
            AnalyzerError::ConfigError(_) => "config",
            AnalyzerError::Internal(_) => "internal",
        }
    }
}
