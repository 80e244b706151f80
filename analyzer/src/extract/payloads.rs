//! Structured payloads embedded in or shipped next to the logs
//!
//! Every field is optional: appliances of different releases omit whole
//! sub-objects, and a missing key must never fail the decode.

use serde::Deserialize;
use serde_json::Value;

use crate::errors::AnalyzerError;

/// Decode a payload span, mapping decode errors to [`AnalyzerError::MalformedPayload`]
pub fn decode<T: for<'de> Deserialize<'de>>(raw: &str, what: &str) -> Result<T, AnalyzerError> {
    serde_json::from_str(raw)
        .map_err(|e| AnalyzerError::MalformedPayload(format!("{}: {}", what, e)))
}

/// Request payload following a `Request = ` marker
#[derive(Debug, Default, Deserialize)]
pub struct InventoryRequest {
    #[serde(default)]
    pub hapi: RequestHapi,
}

#[derive(Debug, Default, Deserialize)]
pub struct RequestHapi {
    #[serde(rename = "HostOS", default)]
    pub host_os: Option<HostOs>,
    #[serde(default)]
    pub server_inventory: ServerInventory,
}

#[derive(Debug, Default, Deserialize)]
pub struct HostOs {
    #[serde(rename = "OsName", default)]
    pub os_name: String,
    #[serde(rename = "OsVersion", default)]
    pub os_version: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ServerInventory {
    #[serde(default)]
    pub fw_inventory: Vec<FirmwareItem>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FirmwareItem {
    /// Reported as a string by current appliances, a number by some older ones
    #[serde(rename = "Id", default)]
    pub id: Value,
    #[serde(rename = "Name", default)]
    pub name: String,
}

impl FirmwareItem {
    pub fn has_id(&self, id: &str) -> bool {
        match &self.id {
            Value::String(s) => s == id,
            Value::Number(n) => n.to_string() == id,
            _ => false,
        }
    }
}

impl InventoryRequest {
    /// Name of the management controller entry (inventory `Id` 1)
    pub fn ilo_model(&self) -> Option<&str> {
        self.hapi
            .server_inventory
            .fw_inventory
            .iter()
            .find(|item| item.has_id("1"))
            .map(|item| item.name.as_str())
            .filter(|name| !name.is_empty())
    }
}

/// Install-set response object following the second identifier occurrence
#[derive(Debug, Default, Deserialize)]
pub struct InstallSetResponse {
    #[serde(default)]
    pub hapi: ResponseHapi,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResponseHapi {
    #[serde(default)]
    pub install_set: InstallSet,
    #[serde(default)]
    pub dependency_failures: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct InstallSet {
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Description", default)]
    pub description: String,
}

impl ResponseHapi {
    /// Dependency failures joined for display, `None` when there are none
    pub fn dependency_summary(&self) -> String {
        let parts: Vec<String> = self
            .dependency_failures
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .filter(|s| !s.is_empty())
            .collect();

        if parts.is_empty() {
            "None".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Contents of a `DependencyFailure.json` file
#[derive(Debug, Default, Deserialize)]
pub struct DependencyDocument {
    #[serde(default)]
    pub install_set: Option<InstallSet>,
    #[serde(default)]
    pub sequence_details: Vec<SequenceItem>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SequenceItem {
    #[serde(rename = "PackageVersion", default)]
    pub package_version: String,
    #[serde(rename = "Filename", default)]
    pub filename: String,
    #[serde(rename = "DeviceClass", default)]
    pub device_class: String,
    #[serde(rename = "InstalledVersion", default)]
    pub installed_version: Option<Vec<InstalledVersion>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct InstalledVersion {
    #[serde(rename = "Version", default)]
    pub version: String,
    #[serde(rename = "Target", default)]
    pub target: String,
}

impl SequenceItem {
    /// Only the first installed-version entry describes the current state
    pub fn current_installed(&self) -> Option<&InstalledVersion> {
        self.installed_version.as_ref().and_then(|v| v.first())
    }
}
