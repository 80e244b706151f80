//! Update outcome classification
//!
//! Dispatches once on the update type recorded in the install-set log, then
//! evaluates the branch-specific markers of the execution log.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::extract::rules::{recover, recover_for_server, Field};

/// Install state the agent reports once the new firmware runs
pub const ACTIVATED_STATE: &str = "Activated";

/// Update mode recorded in the install-set log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMode {
    /// Agent-driven update while the host OS runs
    Online,
    /// Update performed with the host OS down
    Offline,
}

impl UpdateMode {
    /// Parse a recorded update type, ignoring case
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "online" => Some(UpdateMode::Online),
            "offline" => Some(UpdateMode::Offline),
            _ => None,
        }
    }
}

impl fmt::Display for UpdateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateMode::Online => write!(f, "online"),
            UpdateMode::Offline => write!(f, "offline"),
        }
    }
}

/// Classification of one update attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// Branch taken; unset when the update type could not be determined
    pub mode: Option<UpdateMode>,

    pub success: bool,

    /// Why the attempt was classified as failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

impl Outcome {
    fn success(mode: UpdateMode) -> Self {
        Self {
            mode: Some(mode),
            success: true,
            diagnostic: None,
        }
    }

    fn failure(mode: Option<UpdateMode>, diagnostic: impl Into<String>) -> Self {
        Self {
            mode,
            success: false,
            diagnostic: Some(diagnostic.into()),
        }
    }
}

/// Classify the update attempt of `server`.
///
/// Absent logs and an unrecognized update type classify as failure; they are
/// terminal outcomes, not errors.
pub fn classify(install_set_log: Option<&str>, execution_log: Option<&str>, server: &str) -> Outcome {
    let Some(install_set_log) = install_set_log else {
        return Outcome::failure(None, "install-set log is missing");
    };

    let mode = match recover(install_set_log, Field::UpdateType) {
        Some(raw) => match UpdateMode::parse(&raw) {
            Some(mode) => mode,
            None => {
                return Outcome::failure(None, format!("unrecognized update type {:?}", raw));
            }
        },
        None => return Outcome::failure(None, "no update type recorded in the install-set log"),
    };

    let Some(execution_log) = execution_log else {
        return Outcome::failure(Some(mode), "execution log is missing");
    };

    debug!("Classifying {} update for server {}", mode, server);
    match mode {
        UpdateMode::Online => classify_online(execution_log),
        UpdateMode::Offline => classify_offline(execution_log, server),
    }
}

/// The last reported firmware install state decides
pub fn classify_online(execution_log: &str) -> Outcome {
    match recover(execution_log, Field::FwInstallState) {
        Some(state) if state == ACTIVATED_STATE => Outcome::success(UpdateMode::Online),
        Some(state) => Outcome::failure(
            Some(UpdateMode::Online),
            format!("last reported install state is {}", state),
        ),
        None => Outcome::failure(Some(UpdateMode::Online), "no install state reported by the agent"),
    }
}

/// Success requires a zero failed-component count and the completion marker
pub fn classify_offline(execution_log: &str, server: &str) -> Outcome {
    let failed = recover_for_server(execution_log, Field::FailedComponentCount, server)
        .and_then(|count| count.parse::<u64>().ok());
    let complete = recover(execution_log, Field::UpdateComplete).is_some();

    match (failed, complete) {
        (Some(0), true) => Outcome::success(UpdateMode::Offline),
        (None, _) => Outcome::failure(Some(UpdateMode::Offline), "no failed component count reported"),
        (Some(count), true) => Outcome::failure(
            Some(UpdateMode::Offline),
            format!("{} components failed", count),
        ),
        (Some(count), false) => Outcome::failure(
            Some(UpdateMode::Offline),
            format!("update completion not reported ({} failed components)", count),
        ),
    }
}
