//! Build records: one row per (index model, source record) pair.
//!
//! A record is created in [`BuildState::Init`] on the first attempt and
//! updated in place on every later attempt. Each attempt prepends a
//! [`LogEntry`]; the log is capped and the oldest entries fall off the end.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::LensError;

/// Longest error snippet shown in listings.
pub const SNIPPET_MAX_CHARS: usize = 80;

/// State of the most recent build attempt for a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BuildState {
    /// Record created, no attempt applied yet
    #[default]
    Init,
    /// Last attempt wrote the document
    Success,
    /// Last attempt was intentionally bypassed
    Skipped,
    /// Last attempt failed
    Failed,
}

impl BuildState {
    pub const ALL: [BuildState; 4] = [
        BuildState::Init,
        BuildState::Success,
        BuildState::Skipped,
        BuildState::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BuildState::Init => "init",
            BuildState::Success => "success",
            BuildState::Skipped => "skipped",
            BuildState::Failed => "failed",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            BuildState::Init => "Build Initializing",
            BuildState::Success => "Index Build Successful",
            BuildState::Skipped => "Index Build Skipped",
            BuildState::Failed => "Index Build Failed",
        }
    }

    /// Display color name.
    pub fn color(&self) -> &'static str {
        match self {
            BuildState::Init => "slate",
            BuildState::Success | BuildState::Skipped => "emerald",
            BuildState::Failed => "rose",
        }
    }
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for BuildState {
    type Err = LensError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BuildState::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| LensError::InvalidInput(format!("unknown build state: {}", s)))
    }
}

/// What the indexing pipeline reports for one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Succeeded,
    Failed,
    /// Bypassed on purpose, e.g. a no-op update
    Skipped,
}

impl AttemptOutcome {
    pub fn from_success(success: bool) -> Self {
        if success {
            AttemptOutcome::Succeeded
        } else {
            AttemptOutcome::Failed
        }
    }

    /// The `success` flag written to the log entry.
    pub fn is_success(&self) -> bool {
        !matches!(self, AttemptOutcome::Failed)
    }

    /// State the record transitions to.
    pub fn state(&self) -> BuildState {
        match self {
            AttemptOutcome::Succeeded => BuildState::Success,
            AttemptOutcome::Failed => BuildState::Failed,
            AttemptOutcome::Skipped => BuildState::Skipped,
        }
    }
}

/// Diagnostic payload of a single attempt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,

    /// Field map of the document that could not be written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub problematic_field_map: Option<serde_json::Value>,
}

impl LogData {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_field_map(mut self, map: serde_json::Value) -> Self {
        self.problematic_field_map = Some(map);
        self
    }
}

/// One recorded attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,

    pub success: bool,

    /// Set for intentionally bypassed attempts (which also carry `success`)
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,

    #[serde(default)]
    pub data: LogData,
}

impl LogEntry {
    pub fn new(outcome: AttemptOutcome, data: LogData) -> Self {
        Self {
            timestamp: Utc::now(),
            success: outcome.is_success(),
            skipped: outcome == AttemptOutcome::Skipped,
            data,
        }
    }

    pub fn outcome(&self) -> AttemptOutcome {
        if self.skipped {
            AttemptOutcome::Skipped
        } else {
            AttemptOutcome::from_success(self.success)
        }
    }
}

/// Build audit record for one (index model, source record) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRecord {
    /// ULID assigned when the record was first created
    pub id: String,

    /// Source type name
    pub model: String,

    /// Natural key of the source record
    pub model_id: String,

    /// Resolved index-model identifier
    pub index_model: String,

    pub state: BuildState,

    /// Description of the event that triggered the last attempt
    #[serde(default)]
    pub last_source: String,

    /// Opaque context of the most recent attempt
    #[serde(default)]
    pub state_data: serde_json::Value,

    /// Newest first
    #[serde(default)]
    pub logs: Vec<LogEntry>,

    /// Bumped on every applied attempt
    #[serde(default)]
    pub version: u64,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

impl BuildRecord {
    /// Create a fresh record in the init state.
    pub fn new(
        index_model: impl Into<String>,
        model_id: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Ulid::new().to_string(),
            model: model.into(),
            model_id: model_id.into(),
            index_model: index_model.into(),
            state: BuildState::Init,
            last_source: String::new(),
            state_data: serde_json::Value::Null,
            logs: Vec::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply one attempt: prepend its entry, evict beyond `cap`, transition.
    pub fn apply(
        &mut self,
        entry: LogEntry,
        last_source: impl Into<String>,
        state_data: serde_json::Value,
        cap: usize,
    ) {
        self.state = entry.outcome().state();
        self.updated_at = entry.timestamp;
        self.logs.insert(0, entry);
        self.logs.truncate(cap.max(1));
        self.last_source = last_source.into();
        self.state_data = state_data;
        self.version += 1;
    }

    pub fn latest_log(&self) -> Option<&LogEntry> {
        self.logs.first()
    }

    /// First line of the newest message (or details), shortened for listings.
    pub fn error_snippet(&self) -> String {
        let Some(entry) = self.latest_log() else {
            return "No logs".to_string();
        };
        let text = entry
            .data
            .message
            .as_deref()
            .or(entry.data.details.as_deref())
            .unwrap_or("No message");
        let line = text.lines().next().unwrap_or_default().trim();
        if line.chars().count() > SNIPPET_MAX_CHARS {
            let cut: String = line.chars().take(SNIPPET_MAX_CHARS - 3).collect();
            format!("{}...", cut)
        } else {
            line.to_string()
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(msg: &str) -> LogEntry {
        LogEntry::new(AttemptOutcome::Failed, LogData::message(msg))
    }

    #[test]
    fn test_new_record_is_init() {
        let record = BuildRecord::new("indexed_user", "42", "App\\Models\\User");
        assert_eq!(record.state, BuildState::Init);
        assert!(record.logs.is_empty());
        assert_eq!(record.version, 0);
        assert_eq!(record.id.len(), 26);
    }

    #[test]
    fn test_apply_failed_then_success() {
        let mut record = BuildRecord::new("indexed_user", "42", "User");
        record.apply(failure("mapping error"), "observer", serde_json::Value::Null, 5);
        assert_eq!(record.state, BuildState::Failed);

        let ok = LogEntry::new(AttemptOutcome::Succeeded, LogData::default());
        record.apply(ok, "observer", serde_json::json!({"took": 3}), 5);
        assert_eq!(record.state, BuildState::Success);
        assert!(record.logs[0].success);
        assert!(!record.logs[1].success);
        assert_eq!(record.version, 2);
        assert_eq!(record.state_data["took"], 3);
    }

    #[test]
    fn test_apply_evicts_oldest() {
        let mut record = BuildRecord::new("indexed_user", "42", "User");
        for i in 0..7 {
            record.apply(failure(&format!("attempt {}", i)), "job", serde_json::Value::Null, 3);
        }
        assert_eq!(record.logs.len(), 3);
        let messages: Vec<_> = record
            .logs
            .iter()
            .map(|l| l.data.message.clone().unwrap())
            .collect();
        assert_eq!(messages, vec!["attempt 6", "attempt 5", "attempt 4"]);
    }

    #[test]
    fn test_skip_keeps_success_flag() {
        let mut record = BuildRecord::new("indexed_user", "42", "User");
        let skip = LogEntry::new(AttemptOutcome::Skipped, LogData::message("unchanged"));
        record.apply(skip, "observer", serde_json::Value::Null, 3);
        assert_eq!(record.state, BuildState::Skipped);
        assert!(record.logs[0].success);
        assert_eq!(record.logs[0].outcome(), AttemptOutcome::Skipped);
    }

    #[test]
    fn test_error_snippet() {
        let mut record = BuildRecord::new("indexed_user", "42", "User");
        assert_eq!(record.error_snippet(), "No logs");

        let long = format!("first line {}\nsecond line", "x".repeat(200));
        record.apply(failure(&long), "job", serde_json::Value::Null, 3);
        let snippet = record.error_snippet();
        assert!(snippet.starts_with("first line"));
        assert!(snippet.ends_with("..."));
        assert_eq!(snippet.chars().count(), SNIPPET_MAX_CHARS);
    }

    #[test]
    fn test_state_presentation() {
        assert_eq!(BuildState::Failed.label(), "Index Build Failed");
        assert_eq!(BuildState::Skipped.color(), "emerald");
        assert_eq!("FAILED".parse::<BuildState>().unwrap(), BuildState::Failed);
        assert!("broken".parse::<BuildState>().is_err());
    }

    #[test]
    fn test_record_json_field_names() {
        let record = BuildRecord::new("indexed_user", "42", "User");
        let json = String::from_utf8(record.to_bytes().unwrap()).unwrap();
        assert!(json.contains("\"index_model\":\"indexed_user\""));
        assert!(json.contains("\"model_id\":\"42\""));
        assert!(json.contains("\"state\":\"init\""));
        assert!(json.contains("\"last_source\""));
    }
}
