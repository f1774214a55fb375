//! # lens-types
//!
//! Shared domain types for the index-lens build and migration tracker.
//!
//! - Build records: per (index model, source record) attempt history
//! - Migration records: immutable per-run schema migration outcomes
//! - Identifiers: stable index-model identifiers from qualified type names
//! - Index model definitions: caller-declared field maps and observers
//! - Settings: layered configuration
//!
//! ## Usage
//!
//! ```rust
//! use lens_types::resolve;
//!
//! assert_eq!(resolve("Modules\\Faq\\Topic"), "topic_faq");
//! ```

pub mod build;
pub mod config;
pub mod error;
pub mod identifier;
pub mod migration;
pub mod model;

pub use build::{AttemptOutcome, BuildRecord, BuildState, LogData, LogEntry};
pub use self::config::{NamespaceMapping, Settings};
pub use error::LensError;
pub use identifier::{
    is_qualified, namespace_segments, resolve, sanitize_index_model, simple_name, snake_case,
    validate_identifier,
};
pub use migration::{
    cmp_recency, MigrationOutcome, MigrationRecord, MigrationState, MigrationVersion,
    VersionBump,
};
pub use model::{IndexModelDefinition, ObserverDefinition, ObserverKind};
