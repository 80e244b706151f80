//! Document store reachable over HTTP

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, error};

use crate::errors::AnalyzerError;
use crate::models::record::AnalysisRecord;
use crate::persist::store::{RecordStore, StoreAck};

/// Header carrying the per-record idempotency key
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Posts each record as a document into one collection
pub struct HttpRecordStore {
    client: Client,
    base_url: String,
    collection: String,
    token: Option<SecretString>,
}

impl HttpRecordStore {
    /// Create a new store client
    pub fn new(
        base_url: &str,
        collection: &str,
        token: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, AnalyzerError> {
        url::Url::parse(base_url)
            .map_err(|e| AnalyzerError::ConfigError(format!("invalid store url {}: {}", base_url, e)))?;
        if collection.is_empty() {
            return Err(AnalyzerError::ConfigError("empty store collection".to_string()));
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            collection: collection.to_string(),
            token,
        })
    }

    pub fn documents_url(&self) -> String {
        format!("{}/collections/{}/documents", self.base_url, self.collection)
    }

    /// Hex sha256 of `collection:uuid`, so a retried POST of the same
    /// record is recognised by the store
    pub fn idempotency_key(&self, uuid: &str) -> String {
        let digest = Sha256::new()
            .chain_update(self.collection.as_bytes())
            .chain_update(b":")
            .chain_update(uuid.as_bytes())
            .finalize();
        format!("{:x}", digest)
    }
}

/// Whether a failed response status is worth retrying
pub fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    async fn store(&self, record: &AnalysisRecord) -> Result<StoreAck, AnalyzerError> {
        let url = self.documents_url();
        debug!("POST {}", url);

        let mut request = self
            .client
            .post(&url)
            .header(IDEMPOTENCY_HEADER, self.idempotency_key(record.uuid()))
            .json(record);

        if let Some(token) = &self.token {
            request = request.header(
                header::AUTHORIZATION,
                format!("Bearer {}", token.expose_secret()),
            );
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("HTTP POST failed: {} - {}", status, body);
            let message = format!("{}: {}", status, body);
            return Err(if is_retryable_status(status) {
                AnalyzerError::StoreUnavailable(message)
            } else {
                AnalyzerError::PersistenceFailure(message)
            });
        }

        let body: Value = response.json().await.unwrap_or(Value::Null);
        let location = body
            .get("id")
            .and_then(Value::as_str)
            .map(|id| format!("{}/{}", url, id))
            .unwrap_or(url);

        Ok(StoreAck {
            uuid: record.uuid().to_string(),
            location,
        })
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
