//! Per-server analysis pass
//!
//! Runs the recovery steps in record lifecycle order. A failing step leaves
//! its fields at their defaults and adds a [`Diagnostic`]; the pass itself
//! never fails.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::classify::outcome::{classify, Outcome};
use crate::errors::AnalyzerError;
use crate::extract::occurrence::ResponseLocator;
use crate::extract::payloads::{decode, DependencyDocument};
use crate::extract::steps;
use crate::models::appliance::ApplianceContext;
use crate::models::record::AnalysisRecord;
use crate::storage::layout::{BundleLayout, DEPENDENCY_FILE_NAME};

/// A recovery step that did not contribute to the record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub step: String,
    /// Error taxonomy label
    pub kind: String,
    pub message: String,
}

/// Everything one pass produced for a server
#[derive(Debug, Clone, Serialize)]
pub struct ServerReport {
    pub uuid: String,
    pub record: AnalysisRecord,
    pub outcome: Outcome,
    pub diagnostics: Vec<Diagnostic>,
}

/// Logs shared by every server of a batch, read once
#[derive(Debug, Clone, Default)]
pub struct SharedLogs {
    pub install_set_log: Option<String>,
    pub execution_log: Option<String>,
}

impl SharedLogs {
    /// Absent or unreadable logs stay `None`; the steps that need them
    /// report it per server.
    pub async fn load(layout: &BundleLayout) -> Self {
        Self {
            install_set_log: layout.install_set_log().read_or_warn("Install-set log").await,
            execution_log: layout.execution_log().read_or_warn("Execution log").await,
        }
    }
}

/// Read-only inputs of a pass
pub struct PassContext<'a> {
    pub layout: &'a BundleLayout,
    pub appliance: &'a ApplianceContext,
    pub logs: &'a SharedLogs,
    pub locator: &'a dyn ResponseLocator,
}

struct Diagnostics<'a> {
    uuid: &'a str,
    entries: Vec<Diagnostic>,
}

impl<'a> Diagnostics<'a> {
    fn new(uuid: &'a str) -> Self {
        Self {
            uuid,
            entries: Vec::new(),
        }
    }

    fn note(&mut self, step: &str, error: &AnalyzerError) {
        warn!("[{}] {} step skipped: {}", self.uuid, step, error);
        self.entries.push(Diagnostic {
            step: step.to_string(),
            kind: error.kind().to_string(),
            message: error.to_string(),
        });
    }
}

fn missing(what: &str) -> AnalyzerError {
    AnalyzerError::MissingInput(what.to_string())
}

/// Analyse one server
pub async fn analyze_server(ctx: &PassContext<'_>, uuid: &str) -> ServerReport {
    let mut record = AnalysisRecord::new();
    let mut diagnostics = Diagnostics::new(uuid);

    record.apply_appliance(ctx.appliance);

    if let Err(e) = record.assign_uuid(uuid) {
        diagnostics.note("uuid", &e);
    }

    match ctx.logs.install_set_log.as_deref() {
        Some(log) => {
            record.merge_install_options(&steps::install_options(log));
            match steps::install_set_response(log, uuid, ctx.locator) {
                Ok(response) => record.merge_install_set_response(&response),
                Err(e) => diagnostics.note("install_set_response", &e),
            }
        }
        None => {
            let e = missing("installSetLogs.log");
            diagnostics.note("install_options", &e);
            diagnostics.note("install_set_response", &e);
        }
    }

    recover_status(ctx, uuid, &mut record, &mut diagnostics).await;

    match ctx.logs.install_set_log.as_deref().map(steps::host_info) {
        Some(Ok(Some(host))) => record.merge_host(&host),
        Some(Ok(None)) => diagnostics.note("host_info", &missing("inventory request")),
        Some(Err(e)) => diagnostics.note("host_info", &e),
        None => diagnostics.note("host_info", &missing("installSetLogs.log")),
    }

    recover_components(ctx, uuid, &mut record, &mut diagnostics).await;

    let outcome = classify(
        ctx.logs.install_set_log.as_deref(),
        ctx.logs.execution_log.as_deref(),
        uuid,
    );
    info!(
        "[{}] Analysis complete: update {} ({} diagnostics)",
        uuid,
        if outcome.success { "succeeded" } else { "failed" },
        diagnostics.entries.len()
    );

    ServerReport {
        uuid: uuid.to_string(),
        record,
        outcome,
        diagnostics: diagnostics.entries,
    }
}

/// Firmware and SUT status. The dedicated server log wins over the fallback.
async fn recover_status(
    ctx: &PassContext<'_>,
    uuid: &str,
    record: &mut AnalysisRecord,
    diagnostics: &mut Diagnostics<'_>,
) {
    let primary = ctx.layout.server_log(uuid);
    match primary.read_optional_string().await {
        Ok(Some(log)) => {
            debug!("[{}] Reading status from {:?}", uuid, primary.path());
            record.merge_firmware_status(&steps::firmware_status(&log, uuid));
            record.merge_sut_status(&steps::sut_status(&log, uuid));
            return;
        }
        Ok(None) => {}
        Err(e) => {
            diagnostics.note("firmware_status", &e);
            return;
        }
    }

    let fallback = ctx.layout.server_fallback_log(uuid);
    match fallback.read_optional_string().await {
        Ok(Some(log)) => {
            debug!("[{}] Reading SUT status from {:?}", uuid, fallback.path());
            record.merge_sut_status(&steps::sut_status(&log, uuid));
        }
        Ok(None) => diagnostics.note("firmware_status", &missing(&primary.name())),
        Err(e) => diagnostics.note("firmware_status", &e),
    }
}

/// Component list from every dependency document, in path order
async fn recover_components(
    ctx: &PassContext<'_>,
    uuid: &str,
    record: &mut AnalysisRecord,
    diagnostics: &mut Diagnostics<'_>,
) {
    let files = match ctx.layout.server_dir(uuid).find_files_named(DEPENDENCY_FILE_NAME).await {
        Ok(files) => files,
        Err(e) => {
            diagnostics.note("components", &e);
            return;
        }
    };
    if files.is_empty() {
        debug!("[{}] No {} found", uuid, DEPENDENCY_FILE_NAME);
        return;
    }

    for file in files {
        let document = match file.read_string().await {
            Ok(contents) => decode::<DependencyDocument>(&contents, DEPENDENCY_FILE_NAME),
            Err(e) => Err(e),
        };
        match document {
            Ok(document) => {
                let (summary, components) = steps::dependency_document(&document);
                debug!("[{}] {} components from {:?}", uuid, components.len(), file.path());
                record.merge_install_set_response(&summary);
                record.replace_components(components);
            }
            Err(e) => diagnostics.note("components", &e),
        }
    }
}
