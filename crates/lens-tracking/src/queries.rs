//! Aggregations consumed by dashboards and health checks.

use chrono::{DateTime, Utc};
use lens_types::{BuildState, LensError, MigrationVersion};
use serde::Serialize;

use crate::builds::BuildLog;
use crate::migrations::MigrationLog;

/// Build counts for one index model.
///
/// `success` is derived: `total - failed - skipped`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuildSummary {
    pub failed: usize,
    pub skipped: usize,
    pub success: usize,
    pub total: usize,
}

impl BuildSummary {
    pub fn from_states(states: impl IntoIterator<Item = BuildState>) -> Self {
        let mut summary = BuildSummary::default();
        for state in states {
            summary.total += 1;
            match state {
                BuildState::Failed => summary.failed += 1,
                BuildState::Skipped => summary.skipped += 1,
                BuildState::Init | BuildState::Success => {}
            }
        }
        summary.success = summary.total - summary.failed - summary.skipped;
        summary
    }
}

/// One row of the build dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildDashboardRow {
    pub index_model: String,
    #[serde(flatten)]
    pub summary: BuildSummary,
}

/// One row of the migration dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigrationDashboardRow {
    pub index_model: String,
    /// Version of the latest migration, if it carries one
    pub latest_version: Option<MigrationVersion>,
    pub total: usize,
    pub last_migrated_at: Option<DateTime<Utc>>,
}

/// Per-index-model build counts, ordered by index model.
pub fn build_dashboard(builds: &BuildLog) -> Result<Vec<BuildDashboardRow>, LensError> {
    builds
        .index_models()?
        .into_iter()
        .map(|index_model| {
            let summary = builds.summary(&index_model)?;
            Ok(BuildDashboardRow {
                index_model,
                summary,
            })
        })
        .collect()
}

/// Per-index-model latest version, migration count and last run time.
pub fn migration_dashboard(
    migrations: &MigrationLog,
) -> Result<Vec<MigrationDashboardRow>, LensError> {
    migrations
        .index_models()?
        .into_iter()
        .map(|index_model| {
            let records = migrations.migrations_for(&index_model, false)?;
            let latest = records.iter().max_by(|a, b| lens_types::cmp_recency(a, b));
            Ok(MigrationDashboardRow {
                latest_version: latest.and_then(|r| r.version()),
                total: records.len(),
                last_migrated_at: records.iter().map(|r| r.created_at).max(),
                index_model,
            })
        })
        .collect()
}
