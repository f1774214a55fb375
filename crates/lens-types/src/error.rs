//! Error taxonomy for the index-lens tracking engine.

use thiserror::Error;

/// Unified error type surfaced by tracking, health and qualification.
#[derive(Debug, Error)]
pub enum LensError {
    /// Lookup by ID yielded nothing
    #[error("Record not found: {0}")]
    RecordNotFound(String),

    /// Qualification found several candidate types; the caller must pick one
    #[error("Ambiguous identifier '{name}': {} candidates", matches.len())]
    AmbiguousIdentifier {
        /// The name as supplied by the caller
        name: String,
        /// Every qualified type that matched
        matches: Vec<String>,
    },

    /// The store rejected or could not complete a write
    #[error("Write failure: {0}")]
    WriteFailure(String),

    /// Migration version missing or going backwards
    #[error("Invalid version: {0}")]
    InvalidVersion(String),

    /// Connection-level failure, distinct from "not found"
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input error
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<serde_json::Error> for LensError {
    fn from(err: serde_json::Error) -> Self {
        LensError::Serialization(err.to_string())
    }
}

impl LensError {
    /// True when the error means the store could not be reached at all.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, LensError::StoreUnavailable(_))
    }
}
