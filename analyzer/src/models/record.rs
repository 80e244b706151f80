//! Analysis record models
//!
//! The record keeps the key names downstream dashboards already query, so
//! every group and field carries an explicit serde rename.

use serde::{Deserialize, Serialize};

use crate::errors::AnalyzerError;
use crate::models::appliance::ApplianceContext;

/// Managing appliance metadata, identical for every server in a batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneView {
    #[serde(rename = "OV version")]
    pub version: String,

    #[serde(rename = "OV Type")]
    pub model: String,
}

/// Server identity and agent status snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    #[serde(rename = "UUID")]
    pub uuid: String,

    #[serde(rename = "Gen")]
    pub generation: String,

    #[serde(rename = "iLO Model")]
    pub ilo_model: String,

    #[serde(rename = "OS")]
    pub os: String,

    #[serde(rename = "OsVersion")]
    pub os_version: String,

    #[serde(rename = "SUT Mode")]
    pub sut_mode: String,

    #[serde(rename = "SUT Service State")]
    pub sut_service_state: String,

    #[serde(rename = "SUT Running Version")]
    pub sut_running_version: String,
}

/// Configuration and result facts of the update attempt
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareUpdate {
    #[serde(rename = "SPP Used")]
    pub spp_used: String,

    #[serde(rename = "Installation Method")]
    pub installation_method: String,

    #[serde(rename = "SUT Mode")]
    pub sut_mode: String,

    #[serde(rename = "SUT Service State")]
    pub sut_service_state: String,

    #[serde(rename = "SUT Running Version")]
    pub sut_running_version: String,

    #[serde(rename = "Policy")]
    pub policy: String,

    #[serde(rename = "Install state")]
    pub install_state: String,

    #[serde(rename = "Force")]
    pub force: String,
}

/// Summary of the install set computed by the appliance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallSetSummary {
    #[serde(rename = "SPP")]
    pub spp: String,

    #[serde(rename = "Retry")]
    pub retry: String,

    #[serde(rename = "Dependency")]
    pub dependency: String,

    #[serde(rename = "SUM Version")]
    pub sum_version: String,
}

/// One item of the update sequence
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    #[serde(rename = "Installed Version")]
    pub installed_version: String,

    #[serde(rename = "To Version")]
    pub to_version: String,

    #[serde(rename = "DeviceClass")]
    pub device_class: String,

    #[serde(rename = "TargetGUID")]
    pub target_guid: String,

    #[serde(rename = "FileName")]
    pub file_name: String,
}

/// Canonical per-server record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    #[serde(rename = "OneView")]
    pub one_view: OneView,

    #[serde(rename = "Server")]
    pub server: ServerInfo,

    #[serde(rename = "Firmware Update")]
    pub firmware_update: FirmwareUpdate,

    #[serde(rename = "Install set Response")]
    pub install_set_response: InstallSetSummary,

    #[serde(rename = "Components")]
    pub components: Vec<Component>,
}

// ================================= PARTIAL RESULTS ================================= //

/// Install options recovered from the install-set log
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallOptions {
    pub installation_method: Option<String>,
    pub force: Option<String>,
    pub policy: Option<String>,
}

/// SUT agent status for one server
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SutStatus {
    pub mode: Option<String>,
    pub service_state: Option<String>,
    pub running_version: Option<String>,
}

/// Firmware status recovered from the per-server log
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FirmwareStatus {
    pub spp_used: Option<String>,
    pub install_state: Option<String>,
}

/// Host data decoded from the first inventory request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostInfo {
    pub os: Option<String>,
    pub os_version: Option<String>,
    pub ilo_model: Option<String>,
}

/// Install-set response fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseSummary {
    pub spp: Option<String>,
    pub retry: Option<String>,
    pub dependency: Option<String>,
    pub sum_version: Option<String>,
}

/// Server generation implied by the management controller model
pub fn generation_for_ilo(ilo_model: &str) -> Option<&'static str> {
    if ilo_model.contains("iLO 5") {
        Some("Gen10")
    } else if ilo_model.contains("iLO 6") {
        Some("Gen11")
    } else if ilo_model.contains("iLO 7") {
        Some("Gen12")
    } else {
        None
    }
}

/// Overwrite `slot` only with a non-empty value
fn merge_value(slot: &mut String, value: Option<&str>) {
    if let Some(value) = value {
        if !value.is_empty() {
            *slot = value.to_string();
        }
    }
}

impl AnalysisRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn uuid(&self) -> &str {
        &self.server.uuid
    }

    /// Copy the shared appliance metadata
    pub fn apply_appliance(&mut self, appliance: &ApplianceContext) {
        merge_value(&mut self.one_view.version, Some(appliance.version.as_str()));
        merge_value(&mut self.one_view.model, Some(appliance.model.as_str()));
    }

    /// Bind the record to a server; the identifier cannot change afterwards
    pub fn assign_uuid(&mut self, uuid: &str) -> Result<(), AnalyzerError> {
        if uuid.is_empty() {
            return Err(AnalyzerError::Internal("empty server uuid".to_string()));
        }
        if self.server.uuid.is_empty() {
            self.server.uuid = uuid.to_string();
            return Ok(());
        }
        if self.server.uuid == uuid {
            return Ok(());
        }
        Err(AnalyzerError::Internal(format!(
            "record already bound to {}, refusing {}",
            self.server.uuid, uuid
        )))
    }

    pub fn merge_install_options(&mut self, options: &InstallOptions) {
        let fw = &mut self.firmware_update;
        merge_value(&mut fw.installation_method, options.installation_method.as_deref());
        merge_value(&mut fw.force, options.force.as_deref());
        merge_value(&mut fw.policy, options.policy.as_deref());
    }

    pub fn merge_install_set_response(&mut self, response: &ResponseSummary) {
        let isr = &mut self.install_set_response;
        merge_value(&mut isr.spp, response.spp.as_deref());
        merge_value(&mut isr.retry, response.retry.as_deref());
        merge_value(&mut isr.dependency, response.dependency.as_deref());
        merge_value(&mut isr.sum_version, response.sum_version.as_deref());
    }

    pub fn merge_firmware_status(&mut self, status: &FirmwareStatus) {
        merge_value(&mut self.firmware_update.spp_used, status.spp_used.as_deref());
        merge_value(&mut self.firmware_update.install_state, status.install_state.as_deref());
    }

    /// SUT values land in both the server and the update group
    pub fn merge_sut_status(&mut self, sut: &SutStatus) {
        let server = &mut self.server;
        merge_value(&mut server.sut_mode, sut.mode.as_deref());
        merge_value(&mut server.sut_service_state, sut.service_state.as_deref());
        merge_value(&mut server.sut_running_version, sut.running_version.as_deref());

        let fw = &mut self.firmware_update;
        merge_value(&mut fw.sut_mode, sut.mode.as_deref());
        merge_value(&mut fw.sut_service_state, sut.service_state.as_deref());
        merge_value(&mut fw.sut_running_version, sut.running_version.as_deref());
    }

    pub fn merge_host(&mut self, host: &HostInfo) {
        merge_value(&mut self.server.os, host.os.as_deref());
        merge_value(&mut self.server.os_version, host.os_version.as_deref());
        if let Some(ilo_model) = host.ilo_model.as_deref() {
            merge_value(&mut self.server.ilo_model, Some(ilo_model));
            merge_value(&mut self.server.generation, generation_for_ilo(ilo_model));
        }
    }

    /// Replace the component list as a whole
    pub fn replace_components(&mut self, components: Vec<Component>) {
        self.components = components;
    }
}
