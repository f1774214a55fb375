//! # lens-tracking
//!
//! Build and migration state tracking for search-index pipelines.
//!
//! Every (re)index of a domain record and every schema migration leaves an
//! audit record here. Build records are upserted per (index model, model id)
//! with a bounded newest-first log; migration records are append-only and
//! versioned.
//!
//! ## Features
//! - Best-effort build writes: failures are logged, never raised
//! - Compare-and-swap retry loop for concurrent writers on one pair
//! - Monotonic migration versions per index model
//! - Group-by, filter-by-state and exact/prefix ID lookups
//! - Dashboard aggregations

pub mod base;
pub mod builds;
pub mod config;
mod lookup;
pub mod migrations;
pub mod queries;

pub use base::{as_base, BaseResolver};
pub use builds::{BuildAttempt, BuildLog};
pub use config::TrackingConfig;
pub use migrations::MigrationLog;
pub use queries::{
    build_dashboard, migration_dashboard, BuildDashboardRow, BuildSummary, MigrationDashboardRow,
};
