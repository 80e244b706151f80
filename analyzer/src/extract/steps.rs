//! Recovery steps
//!
//! Each step turns the text of one source into a partial result that the
//! record merges. Steps never touch the filesystem.

use tracing::{debug, trace};

use crate::errors::AnalyzerError;
use crate::extract::occurrence::{find_all, ResponseLocator};
use crate::extract::payloads::{decode, DependencyDocument, InstallSetResponse, InventoryRequest};
use crate::extract::rules::{recover, recover_for_server, Field};
use crate::extract::span::object_after;
use crate::models::record::{
    Component, FirmwareStatus, HostInfo, InstallOptions, ResponseSummary, SutStatus,
};

/// Marker preceding an inventory request payload
pub const REQUEST_MARKER: &str = "Request = ";

/// Retry value reported for every install set
pub const RETRY_VALUE: &str = "No";

/// Update engine reported for every install set
pub const SUM_VERSION_VALUE: &str = "sum service";

/// Installation method, force and policy flags
pub fn install_options(install_set_log: &str) -> InstallOptions {
    InstallOptions {
        installation_method: recover(install_set_log, Field::InstallationMethod),
        force: recover(install_set_log, Field::Force),
        policy: recover(install_set_log, Field::Policy),
    }
}

/// Install-set response anchored on the server identifier
pub fn install_set_response(
    install_set_log: &str,
    server: &str,
    locator: &dyn ResponseLocator,
) -> Result<ResponseSummary, AnalyzerError> {
    let raw = locator.locate(install_set_log, server)?;
    trace!("Install set response span for {}: {} bytes", server, raw.len());

    let response: InstallSetResponse = decode(raw, "install set response")?;
    Ok(ResponseSummary {
        spp: Some(response.hapi.install_set.name.clone()),
        retry: Some(RETRY_VALUE.to_string()),
        dependency: Some(response.hapi.dependency_summary()),
        sum_version: Some(SUM_VERSION_VALUE.to_string()),
    })
}

/// Compliant baseline and install state from the dedicated server log
pub fn firmware_status(server_log: &str, server: &str) -> FirmwareStatus {
    FirmwareStatus {
        spp_used: recover(server_log, Field::SppUsed),
        install_state: recover_for_server(server_log, Field::InstallState, server),
    }
}

/// Most recent SUT status reported for the server
pub fn sut_status(log: &str, server: &str) -> SutStatus {
    SutStatus {
        mode: recover_for_server(log, Field::SutMode, server),
        service_state: recover_for_server(log, Field::SutServiceState, server),
        running_version: recover_for_server(log, Field::SutRunningVersion, server),
    }
}

/// Host OS and management controller model from the first decodable request.
///
/// Returns `Ok(None)` when the log carries no request at all.
pub fn host_info(install_set_log: &str) -> Result<Option<HostInfo>, AnalyzerError> {
    let markers = find_all(install_set_log, REQUEST_MARKER);
    if markers.is_empty() {
        return Ok(None);
    }

    let mut last_error = None;
    for offset in &markers {
        let Some(raw) = object_after(install_set_log, *offset) else {
            continue;
        };
        match decode::<InventoryRequest>(raw, "inventory request") {
            Ok(request) => {
                let host_os = request.hapi.host_os.as_ref();
                return Ok(Some(HostInfo {
                    os: host_os.map(|h| h.os_name.clone()),
                    os_version: host_os.map(|h| h.os_version.clone()),
                    ilo_model: request.ilo_model().map(str::to_string),
                }));
            }
            Err(e) => {
                debug!("Skipping undecodable request at offset {}: {}", offset, e);
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        AnalyzerError::MalformedPayload(format!(
            "none of {} request markers is followed by a balanced object",
            markers.len()
        ))
    }))
}

/// Install-set fields and component list carried by a dependency document
pub fn dependency_document(document: &DependencyDocument) -> (ResponseSummary, Vec<Component>) {
    let summary = match &document.install_set {
        Some(install_set) => ResponseSummary {
            spp: Some(install_set.name.clone()),
            dependency: Some(install_set.description.clone()),
            ..Default::default()
        },
        None => ResponseSummary::default(),
    };

    let components = document
        .sequence_details
        .iter()
        .map(|item| {
            let installed = item.current_installed();
            Component {
                installed_version: installed.map(|i| i.version.clone()).unwrap_or_default(),
                to_version: item.package_version.clone(),
                device_class: item.device_class.clone(),
                target_guid: installed.map(|i| i.target.clone()).unwrap_or_default(),
                file_name: item.filename.clone(),
            }
        })
        .collect();

    (summary, components)
}
