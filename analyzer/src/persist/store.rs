//! Record store abstraction and retry policy

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{error, warn};

use crate::errors::AnalyzerError;
use crate::models::record::AnalysisRecord;
use crate::storage::settings::RetrySettings;

/// Acknowledgement returned by a store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreAck {
    pub uuid: String,
    /// Where the record landed (path, URL or document id)
    pub location: String,
}

/// Destination for finished records
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Store one record. Transient failures are reported via
    /// [`AnalyzerError::is_transient`].
    async fn store(&self, record: &AnalysisRecord) -> Result<StoreAck, AnalyzerError>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// Bounded retry of store operations.
///
/// The wait before retry `n` (zero based) is `base_delay * 2^n`, capped at
/// `max_delay`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first try included
    pub attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetrySettings::default())
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            attempts: settings.attempts.max(1),
            base_delay: Duration::from_millis(settings.base_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
        }
    }
}

impl RetryPolicy {
    /// Delay before the retry following failed attempt `attempt`
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

/// Store a record, retrying transient failures.
///
/// Exhausted retries and terminal errors both surface as
/// [`AnalyzerError::PersistenceFailure`].
pub async fn store_with_retry(
    store: &dyn RecordStore,
    record: &AnalysisRecord,
    policy: &RetryPolicy,
) -> Result<StoreAck, AnalyzerError> {
    let attempts = policy.attempts.max(1);
    let mut attempt = 0;
    loop {
        match store.store(record).await {
            Ok(ack) => return Ok(ack),
            Err(e) if e.is_transient() && attempt + 1 < attempts => {
                let delay = policy.backoff(attempt);
                warn!(
                    "Storing record {} in {} failed (attempt {}/{}), retrying in {:?}: {}",
                    record.uuid(),
                    store.name(),
                    attempt + 1,
                    attempts,
                    delay,
                    e
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                error!(
                    "Giving up storing record {} in {} after {} attempt(s): {}",
                    record.uuid(),
                    store.name(),
                    attempt + 1,
                    e
                );
                return Err(match e {
                    AnalyzerError::PersistenceFailure(msg) => AnalyzerError::PersistenceFailure(msg),
                    other => AnalyzerError::PersistenceFailure(format!(
                        "{} after {} attempt(s): {}",
                        store.name(),
                        attempt + 1,
                        other
                    )),
                });
            }
        }
    }
}
