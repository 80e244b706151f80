//! Field recovery rules
//!
//! Every recoverable field owns one ordered list of [`Rule`]s. Rules are
//! tried in order and the first one that matches supplies the value; when
//! none match the field is absent. Rules are plain data so they can be
//! exercised against snippets without any log file on disk.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

/// Marker opening a SUT status report line
pub const SUT_STATUS_MARKER: &str = "Successfully got SUT status from server via RIS for";

/// Marker of an install state report line
pub const INSTALL_STATE_MARKER: &str = "FirmwareDriverBaselineSettings on server";

/// Value reported when an install state line carries no nested `"State"`
pub const UNKNOWN_INSTALL_STATE: &str = "Unknown";

/// Fields the engine knows how to recover
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// `MODEL_NUMBER` from the appliance properties
    ModelNumber,
    /// First `"update_type"` value in the install-set log
    InstallationMethod,
    /// Last `"update_type"` value in the install-set log
    UpdateType,
    Force,
    Policy,
    /// Baseline reported compliant in the per-server log
    SppUsed,
    SutMode,
    SutServiceState,
    SutRunningVersion,
    InstallState,
    /// Agent-reported firmware install state in the execution log
    FwInstallState,
    /// Trailing failed-component count in the execution log
    FailedComponentCount,
    /// Offline update completion marker in the execution log
    UpdateComplete,
}

/// Where a rule looks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// First match anywhere in the text
    Body,
    /// Last match anywhere in the text
    BodyLast,
    /// Lines top to bottom, first matching line wins
    FirstLine,
    /// Lines bottom to top, most recent matching line wins
    LastLine,
}

/// Post-processing applied to the captured group
#[derive(Debug, Clone)]
pub enum Transform {
    Trim,
    /// `true` -> `True`, `false` -> `False`
    Capitalize,
    /// Downgrade flag to baseline policy name
    Policy,
    /// Pull a quoted value out of the capture, or report a fixed sentinel
    Nested { pattern: Regex, missing: &'static str },
}

impl Transform {
    fn apply(&self, raw: &str) -> String {
        match self {
            Transform::Trim => raw.trim().to_string(),
            Transform::Capitalize => {
                let raw = raw.trim();
                let mut chars = raw.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            }
            Transform::Policy => match raw.trim() {
                "true" => "Exact Match".to_string(),
                _ => "LowerThanBaseline".to_string(),
            },
            Transform::Nested { pattern, missing } => pattern
                .captures(raw)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| missing.to_string()),
        }
    }
}

/// One pattern-match attempt for a field
#[derive(Debug, Clone)]
pub struct Rule {
    scope: Scope,
    /// Literal a candidate line must contain
    marker: Option<&'static str>,
    /// Candidate line must also mention the server identifier
    server_scoped: bool,
    /// Narrows the text after the marker to this pattern's first group
    section: Option<Regex>,
    pattern: Regex,
    transform: Transform,
}

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static recovery pattern must compile")
}

impl Rule {
    /// Panics on an invalid pattern; rules are built from literals.
    pub fn new(scope: Scope, pattern: &str) -> Self {
        Self {
            scope,
            marker: None,
            server_scoped: false,
            section: None,
            pattern: re(pattern),
            transform: Transform::Trim,
        }
    }

    pub fn marker(mut self, marker: &'static str) -> Self {
        self.marker = Some(marker);
        self
    }

    pub fn server_scoped(mut self) -> Self {
        self.server_scoped = true;
        self
    }

    pub fn section(mut self, pattern: &str) -> Self {
        self.section = Some(re(pattern));
        self
    }

    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Apply this rule alone.
    ///
    /// Server-scoped rules never match without a server identifier.
    pub fn apply(&self, text: &str, server: Option<&str>) -> Option<String> {
        if self.server_scoped && server.is_none() {
            return None;
        }

        let raw = match self.scope {
            Scope::Body => self.capture(text),
            Scope::BodyLast => self
                .pattern
                .captures_iter(text)
                .filter_map(|c| c.get(1).map(|m| m.as_str()))
                .last(),
            Scope::FirstLine => text.lines().find_map(|line| self.match_line(line, server)),
            Scope::LastLine => text.lines().rev().find_map(|line| self.match_line(line, server)),
        }?;

        Some(self.transform.apply(raw))
    }

    fn capture<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.pattern
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
    }

    fn match_line<'t>(&self, line: &'t str, server: Option<&str>) -> Option<&'t str> {
        if self.server_scoped && !line.contains(server?) {
            return None;
        }

        let after_marker = match self.marker {
            Some(marker) => {
                let at = line.find(marker)?;
                &line[at + marker.len()..]
            }
            None => line,
        };

        match &self.section {
            Some(section) => {
                let narrowed = section.captures(after_marker)?.get(1)?.as_str();
                self.capture(narrowed)
            }
            None => self.capture(line),
        }
    }
}

static RULES: LazyLock<HashMap<Field, Vec<Rule>>> = LazyLock::new(|| {
    let sut_line = |pattern: &str| {
        Rule::new(Scope::LastLine, pattern)
            .marker(SUT_STATUS_MARKER)
            .server_scoped()
            .section(r"\[(.*?)\]")
    };

    let mut rules = HashMap::new();

    rules.insert(
        Field::ModelNumber,
        vec![Rule::new(Scope::FirstLine, r"^\s*MODEL_NUMBER\s*=\s*(.*)$").marker("MODEL_NUMBER")],
    );
    rules.insert(
        Field::InstallationMethod,
        vec![Rule::new(Scope::Body, r#""update_type"\s*:\s*"([^"]+)""#)],
    );
    rules.insert(
        Field::UpdateType,
        vec![Rule::new(Scope::BodyLast, r#""update_type"\s*:\s*"([^"]*)""#)],
    );
    rules.insert(
        Field::Force,
        vec![Rule::new(Scope::Body, r#""rewrite"\s*:\s*(true|false)"#).transform(Transform::Capitalize)],
    );
    rules.insert(
        Field::Policy,
        vec![Rule::new(Scope::Body, r#""downgrade"\s*:\s*(true|false)"#).transform(Transform::Policy)],
    );
    rules.insert(
        Field::SppUsed,
        vec![Rule::new(Scope::LastLine, r"The selected baseline (.*?) is absaroka compliant = true")
            .marker("is absaroka compliant = true")],
    );
    // Sub-fields end where the next sibling keyword begins.
    rules.insert(
        Field::SutMode,
        vec![sut_line(r"Mode: (.*?)Service"), sut_line(r"Mode: ([^S]*?)State:")],
    );
    rules.insert(Field::SutServiceState, vec![sut_line(r"State: ([^V]*?)Version:")]);
    rules.insert(Field::SutRunningVersion, vec![sut_line(r"Version: ([^T]*?)Type:")]);
    rules.insert(
        Field::InstallState,
        vec![Rule::new(Scope::LastLine, r"FirmwareDriverBaselineSettings on server .*? is (.*)")
            .marker(INSTALL_STATE_MARKER)
            .server_scoped()
            .transform(Transform::Nested {
                pattern: re(r#""State"\s*:\s*"([^"]*)""#),
                missing: UNKNOWN_INSTALL_STATE,
            })],
    );
    rules.insert(
        Field::FwInstallState,
        vec![Rule::new(Scope::LastLine, r"(?i)Updating iLO with fwInstallState:\s*(\w+)")],
    );
    let failed_count = r"fetchFailedComponentList Total number of failed components for server name: .*?, bay .*? uuid: .*? (\d+)\s*$";
    rules.insert(
        Field::FailedComponentCount,
        vec![Rule::new(Scope::LastLine, failed_count)
            .marker("fetchFailedComponentList")
            .server_scoped()],
    );
    rules.insert(
        Field::UpdateComplete,
        vec![Rule::new(Scope::Body, r"Absaroka Firmware update is complete for server:(.*)")],
    );

    rules
});

/// Ordered rules for a field
pub fn rules_for(field: Field) -> &'static [Rule] {
    RULES.get(&field).map(Vec::as_slice).unwrap_or(&[])
}

/// Recover a field that does not depend on the server identifier
pub fn recover(text: &str, field: Field) -> Option<String> {
    recover_with(text, field, None)
}

/// Recover a field whose candidate lines must mention `server`
pub fn recover_for_server(text: &str, field: Field, server: &str) -> Option<String> {
    recover_with(text, field, Some(server))
}

fn recover_with(text: &str, field: Field, server: Option<&str>) -> Option<String> {
    rules_for(field)
        .iter()
        .find_map(|rule| rule.apply(text, server))
}
