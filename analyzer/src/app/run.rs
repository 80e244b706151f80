//! Batch run loop

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::app::options::BatchOptions;
use crate::app::pass::{analyze_server, PassContext, SharedLogs};
use crate::classify::outcome::UpdateMode;
use crate::errors::AnalyzerError;
use crate::extract::occurrence::SecondOccurrence;
use crate::filesys::dir::Dir;
use crate::models::appliance::ApplianceContext;
use crate::persist::store::{store_with_retry, RecordStore};
use crate::storage::layout::BundleLayout;

/// Result of one server within a batch
#[derive(Debug, Clone, Serialize)]
pub struct ServerSummary {
    pub uuid: String,
    pub mode: Option<UpdateMode>,
    pub update_succeeded: bool,
    /// The record reached every configured destination
    pub persisted: bool,
    /// Where the store put the record, if a store is configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Recovery steps that did not contribute
    pub diagnostics: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of a batch run
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub batch_id: String,
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub servers: Vec<ServerSummary>,
}

impl BatchSummary {
    pub fn all_persisted(&self) -> bool {
        self.servers.iter().all(|s| s.persisted)
    }

    pub fn succeeded(&self) -> usize {
        self.servers.iter().filter(|s| s.update_succeeded).count()
    }
}

/// Audit file name for one server
pub fn audit_file_name(batch_id: &str, uuid: &str) -> String {
    format!("{}_{}_analysis.json", batch_id, uuid)
}

/// Analyse every server of a batch and hand the records to `store`.
///
/// Only a missing batch directory is fatal; per-server failures end up in
/// the returned summary.
pub async fn run(
    options: BatchOptions,
    store: Option<Arc<dyn RecordStore>>,
) -> Result<BatchSummary, AnalyzerError> {
    let started_at = Utc::now();
    let run_id = Uuid::new_v4().to_string();
    info!(
        "Starting batch {} (run {}) in {:?}",
        options.batch_id, run_id, options.batch_dir
    );

    let layout = BundleLayout::new(&options.batch_dir);
    if !layout.base().exists().await {
        return Err(AnalyzerError::MissingInput(format!(
            "batch directory {:?}",
            options.batch_dir
        )));
    }

    let appliance = ApplianceContext::load(&layout).await;
    let logs = SharedLogs::load(&layout).await;
    let uuids = list_servers(&layout).await?;
    info!("Found {} servers in batch {}", uuids.len(), options.batch_id);

    let audit_dir = if options.audit.enabled {
        Some(match &options.audit.dir {
            Some(dir) => Dir::new(dir),
            None => layout.analysis_dir(),
        })
    } else {
        None
    };

    let locator = SecondOccurrence;
    let ctx = PassContext {
        layout: &layout,
        appliance: &appliance,
        logs: &logs,
        locator: &locator,
    };

    let mut servers: Vec<ServerSummary> = stream::iter(uuids)
        .map(|uuid| process_server(&ctx, uuid, &options, audit_dir.as_ref(), store.as_deref()))
        .buffer_unordered(options.max_parallel_servers.max(1))
        .collect()
        .await;
    servers.sort_by(|a, b| a.uuid.cmp(&b.uuid));

    let summary = BatchSummary {
        batch_id: options.batch_id.clone(),
        run_id,
        started_at,
        finished_at: Utc::now(),
        servers,
    };
    info!(
        "Batch {} finished: {}/{} updates succeeded, all persisted: {}",
        summary.batch_id,
        summary.succeeded(),
        summary.servers.len(),
        summary.all_persisted()
    );
    Ok(summary)
}

async fn list_servers(layout: &BundleLayout) -> Result<Vec<String>, AnalyzerError> {
    let server_logs = layout.server_logs_dir();
    if !server_logs.exists().await {
        warn!("No server logs directory in {:?}, nothing to analyse", layout.base_dir);
        return Ok(Vec::new());
    }
    let dirs = server_logs.list_dirs().await?;
    Ok(dirs.iter().map(Dir::name).collect())
}

async fn process_server(
    ctx: &PassContext<'_>,
    uuid: String,
    options: &BatchOptions,
    audit_dir: Option<&Dir>,
    store: Option<&dyn RecordStore>,
) -> ServerSummary {
    let report = analyze_server(ctx, &uuid).await;
    let mut errors = Vec::new();

    if let Some(dir) = audit_dir {
        let file = dir.file(&audit_file_name(&options.batch_id, &uuid));
        if let Err(e) = file.write_json(&report).await {
            error!("[{}] Failed to write audit file {:?}: {}", uuid, file.path(), e);
            errors.push(format!("audit: {}", e));
        }
    }

    let mut location = None;
    if let Some(store) = store {
        match store_with_retry(store, &report.record, &options.retry).await {
            Ok(ack) => {
                info!("[{}] Record stored at {}", uuid, ack.location);
                location = Some(ack.location);
            }
            Err(e) => errors.push(e.to_string()),
        }
    }

    ServerSummary {
        uuid,
        mode: report.outcome.mode,
        update_succeeded: report.outcome.success,
        persisted: errors.is_empty(),
        location,
        diagnostics: report.diagnostics.len(),
        error: if errors.is_empty() {
            None
        } else {
            Some(errors.join("; "))
        },
    }
}
