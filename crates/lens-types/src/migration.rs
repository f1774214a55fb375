//! Migration records: one immutable row per migration run.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::LensError;

/// Outcome state of a migration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationState {
    Success,
    Failed,
    /// Written by repair/administrative action without a definite outcome
    Undefined,
}

impl MigrationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationState::Success => "success",
            MigrationState::Failed => "failed",
            MigrationState::Undefined => "undefined",
        }
    }

    /// Display color name.
    pub fn color(&self) -> &'static str {
        match self {
            MigrationState::Success => "emerald",
            MigrationState::Failed => "rose",
            MigrationState::Undefined => "amber",
        }
    }
}

impl fmt::Display for MigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Which half of the version a new migration bumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionBump {
    /// Resets minor to 0
    Major,
    Minor,
}

/// `major.minor` schema version, ordered lexicographically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MigrationVersion {
    pub major: i32,
    pub minor: i32,
}

impl MigrationVersion {
    pub const INITIAL: MigrationVersion = MigrationVersion { major: 1, minor: 0 };

    pub fn new(major: i32, minor: i32) -> Self {
        Self { major, minor }
    }

    /// Next version, or `InvalidVersion` when the bumped half would overflow.
    pub fn bump(&self, bump: VersionBump) -> Result<Self, LensError> {
        let next = match bump {
            VersionBump::Major => self.major.checked_add(1).map(|major| Self::new(major, 0)),
            VersionBump::Minor => self.minor.checked_add(1).map(|minor| Self::new(self.major, minor)),
        };
        next.ok_or_else(|| LensError::InvalidVersion(format!("{} cannot be bumped further", self)))
    }
}

impl fmt::Display for MigrationVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// What a migration run produced.
#[derive(Debug, Clone, PartialEq)]
pub enum MigrationOutcome {
    /// Resulting schema snapshot
    Applied(serde_json::Value),
    /// Error description
    Failed(String),
    /// Administrative record, optionally with a note
    Undefined(Option<String>),
}

impl MigrationOutcome {
    pub fn state(&self) -> MigrationState {
        match self {
            MigrationOutcome::Applied(_) => MigrationState::Success,
            MigrationOutcome::Failed(_) => MigrationState::Failed,
            MigrationOutcome::Undefined(_) => MigrationState::Undefined,
        }
    }

    fn into_map(self) -> serde_json::Value {
        match self {
            MigrationOutcome::Applied(snapshot) => snapshot,
            MigrationOutcome::Failed(error) => serde_json::json!({ "error": error }),
            MigrationOutcome::Undefined(Some(note)) => serde_json::json!({ "note": note }),
            MigrationOutcome::Undefined(None) => serde_json::json!({}),
        }
    }
}

/// Migration audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationRecord {
    pub id: String,

    pub index_model: String,

    pub state: MigrationState,

    #[serde(default)]
    pub version_major: Option<i32>,

    #[serde(default)]
    pub version_minor: Option<i32>,

    /// Schema snapshot, or `{"error": ..}` on failure
    #[serde(default)]
    pub map: serde_json::Value,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl MigrationRecord {
    pub fn new(
        index_model: impl Into<String>,
        version: Option<MigrationVersion>,
        outcome: MigrationOutcome,
    ) -> Self {
        Self {
            id: Ulid::new().to_string(),
            index_model: index_model.into(),
            state: outcome.state(),
            version_major: version.map(|v| v.major),
            version_minor: version.map(|v| v.minor),
            map: outcome.into_map(),
            created_at: Utc::now(),
        }
    }

    /// Both halves of the version, when present.
    pub fn version(&self) -> Option<MigrationVersion> {
        match (self.version_major, self.version_minor) {
            (Some(major), Some(minor)) => Some(MigrationVersion::new(major, minor)),
            _ => None,
        }
    }

    pub fn version_label(&self) -> String {
        self.version()
            .map(|v| v.to_string())
            .unwrap_or_else(|| "N/A".to_string())
    }

    /// Error payload of a failed run.
    pub fn error(&self) -> Option<&str> {
        self.map.get("error").and_then(|v| v.as_str())
    }

    /// Schema snapshot of a successful run.
    pub fn snapshot(&self) -> Option<&serde_json::Value> {
        (self.state == MigrationState::Success).then_some(&self.map)
    }

    /// Field names in the snapshot.
    ///
    /// Reads `mappings.properties`, then `properties`, then the top level.
    pub fn snapshot_fields(&self) -> BTreeSet<String> {
        let Some(snapshot) = self.snapshot() else {
            return BTreeSet::new();
        };
        let fields = snapshot
            .pointer("/mappings/properties")
            .or_else(|| snapshot.get("properties"))
            .unwrap_or(snapshot);
        fields
            .as_object()
            .map(|obj| obj.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// Recency order: (major, minor) with missing halves lowest, then creation
/// time, then id.
pub fn cmp_recency(a: &MigrationRecord, b: &MigrationRecord) -> Ordering {
    a.version_major
        .cmp(&b.version_major)
        .then(a.version_minor.cmp(&b.version_minor))
        .then(a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}
