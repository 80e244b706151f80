//! Shared appliance metadata

use serde::Serialize;
use tracing::debug;

use crate::extract::rules::{recover, Field};
use crate::storage::layout::BundleLayout;

/// Read-only context computed once per batch and copied into each record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplianceContext {
    pub version: String,
    pub model: String,
}

impl ApplianceContext {
    /// Load the appliance version and model from the bundle root.
    ///
    /// Missing or unreadable files leave the matching value empty.
    pub async fn load(layout: &BundleLayout) -> Self {
        let version = layout
            .version_file()
            .read_or_warn("Appliance version file")
            .await
            .map(|contents| contents.trim().to_string())
            .unwrap_or_default();

        let model = layout
            .properties_file()
            .read_or_warn("Appliance properties file")
            .await
            .and_then(|contents| recover(&contents, Field::ModelNumber))
            .unwrap_or_default();

        debug!("Loaded appliance context: version={}, model={}", version, model);
        Self { version, model }
    }
}
