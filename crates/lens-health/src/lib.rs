//! # lens-health
//!
//! Health diagnostics for one index model.
//!
//! A health check runs after the caller's model name has been qualified to
//! a single type. It combines four independent checks into one report:
//! - Index: does the index exist and does its live schema cover the
//!   declared field map
//! - Base model: does the paired domain type resolve, which models are
//!   observed
//! - Builds: failed/skipped/success/total counts
//! - Config: caller-declared rules bucketed into critical and warning
//!
//! The overall status is the most severe of the four.

pub mod aggregator;
pub mod catalog;
pub mod registry;
pub mod report;
pub mod rules;

pub use aggregator::HealthAggregator;
pub use catalog::{IndexCatalog, MigrationCatalog};
pub use registry::{ModelRegistry, Qualification};
pub use report::{ConfigFindings, HealthReport, ObserverRow, Severity, StatusCheck};
pub use rules::{default_rules, ConfigFinding, ConfigRule, FindingLevel, PredicateRule, RuleContext};
