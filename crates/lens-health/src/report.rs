//! Health report types.

use std::fmt;

use serde::Serialize;

use crate::rules::ConfigFinding;

/// Severity of one status, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Ok,
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Ok => "ok",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }

    /// Display color name.
    pub fn color(&self) -> &'static str {
        match self {
            Severity::Ok => "emerald",
            Severity::Info => "sky",
            Severity::Warning => "amber",
            Severity::Critical => "rose",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Outcome of one of the four checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCheck {
    pub status: Severity,
    pub title: String,
    pub detail: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub help: Vec<String>,
}

impl StatusCheck {
    pub fn new(status: Severity, title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            status,
            title: title.into(),
            detail: detail.into(),
            help: Vec::new(),
        }
    }

    pub fn ok(title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(Severity::Ok, title, detail)
    }

    /// The store could not be read; distinct from "nothing recorded".
    pub fn unavailable(detail: impl Into<String>) -> Self {
        Self::new(Severity::Critical, "Store Unavailable", detail)
            .with_help("Check the storage path and that no other process holds the lock")
    }

    pub fn with_help(mut self, line: impl Into<String>) -> Self {
        self.help.push(line.into());
        self
    }
}

/// One observed model row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObserverRow {
    pub model: String,
    pub kind: String,
}

/// Config findings split by level. Critical findings list first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfigFindings {
    pub critical: Vec<ConfigFinding>,
    pub warning: Vec<ConfigFinding>,
}

impl ConfigFindings {
    pub fn is_empty(&self) -> bool {
        self.critical.is_empty() && self.warning.is_empty()
    }
}

/// Synthesized health of one index model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub title: String,
    pub identifier: String,
    pub index_model: String,
    pub base_model: Option<String>,

    pub index_status: StatusCheck,
    pub model_status: StatusCheck,
    pub build_status: StatusCheck,
    pub config_status: StatusCheck,

    pub index_data: Vec<(String, String)>,
    pub model_data: Vec<(String, String)>,
    pub build_data: Vec<(String, String)>,
    pub config_data: Vec<(String, String)>,

    pub observers: Vec<ObserverRow>,
    pub config_findings: ConfigFindings,
}

impl HealthReport {
    /// Most severe of the four statuses.
    pub fn overall(&self) -> Severity {
        self.statuses()
            .iter()
            .map(|s| s.status)
            .max()
            .unwrap_or(Severity::Ok)
    }

    pub fn statuses(&self) -> [&StatusCheck; 4] {
        [
            &self.index_status,
            &self.model_status,
            &self.build_status,
            &self.config_status,
        ]
    }

    pub fn is_healthy(&self) -> bool {
        self.overall() <= Severity::Info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_order() {
        assert!(Severity::Critical > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
        assert!(Severity::Info > Severity::Ok);
        assert_eq!(
            [Severity::Info, Severity::Critical, Severity::Ok]
                .into_iter()
                .max(),
            Some(Severity::Critical)
        );
    }

    #[test]
    fn test_severity_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Severity::Warning).unwrap(),
            "\"warning\""
        );
    }
}
