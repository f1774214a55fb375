//! Command implementations for `lens`.
//!
//! Handles:
//! - build-logs: dashboard, failed builds of one index model, record detail
//! - migration-logs: dashboard, history of one index model, record detail
//! - health: qualify the model name, then run the health check
//! - admin: storage stats, compaction, build purge

use std::fs;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use lens_health::{HealthAggregator, ModelRegistry};
use lens_storage::Storage;
use lens_tracking::{build_dashboard, migration_dashboard, BuildLog, MigrationLog, TrackingConfig};
use lens_types::{sanitize_index_model, LensError, Settings};
use tracing::info;

use crate::cli::AdminCommands;
use crate::render;

/// Opened storage plus the stores and registry built from settings.
pub struct Lens {
    pub settings: Settings,
    pub storage: Arc<Storage>,
    pub builds: Arc<BuildLog>,
    pub migrations: Arc<MigrationLog>,
}

impl Lens {
    /// Open storage at the configured path, creating parent directories.
    pub fn open(settings: Settings) -> Result<Self> {
        let db_path = settings.expanded_db_path();
        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent).context("Failed to create database directory")?;
        }
        let storage = Arc::new(Storage::open(&db_path).context("Failed to open storage")?);

        let config = TrackingConfig::from_settings(&settings);
        let builds = Arc::new(BuildLog::new(storage.clone(), config.clone()));
        let migrations = Arc::new(MigrationLog::new(storage.clone(), config));

        Ok(Self {
            settings,
            storage,
            builds,
            migrations,
        })
    }

    pub fn registry(&self) -> Result<ModelRegistry> {
        ModelRegistry::from_settings(&self.settings).context("Invalid index model declarations")
    }

    pub fn aggregator(&self) -> Result<HealthAggregator> {
        Ok(
            HealthAggregator::new(self.registry()?, self.builds.clone(), self.migrations.clone())
                .with_connection(&self.settings.connection),
        )
    }

    /// Identifier for an index model given by identifier, index type or base
    /// type. Names no declaration covers are sanitized as-is.
    pub fn index_model(&self, name: &str) -> Result<String> {
        let mut matches = self.registry()?.index_identifiers(name);
        match matches.len() {
            0 => Ok(sanitize_index_model(name)),
            1 => Ok(matches.remove(0)),
            _ => bail!(
                "{} matches several index models: {}",
                name.trim(),
                matches.join(", ")
            ),
        }
    }
}

pub fn handle_build_logs(
    lens: &Lens,
    index_model: Option<&str>,
    limit: usize,
    id: Option<&str>,
) -> Result<String> {
    if let Some(id) = id {
        let record = lens.builds.lookup(id).context("Build log not found")?;
        return Ok(render::build_detail(&record));
    }

    match index_model {
        Some(name) => {
            let index_model = lens.index_model(name)?;
            let summary = lens.builds.summary(&index_model)?;
            let failed = lens.builds.failed_builds(&index_model, limit)?;
            Ok(render::failed_builds(&index_model, &summary, &failed))
        }
        None => Ok(render::build_dashboard(&build_dashboard(&lens.builds)?)),
    }
}

pub fn handle_migration_logs(
    lens: &Lens,
    index_model: Option<&str>,
    limit: usize,
    id: Option<&str>,
) -> Result<String> {
    if let Some(id) = id {
        let record = lens
            .migrations
            .lookup(id)
            .context("Migration log not found")?;
        return Ok(render::migration_detail(&record));
    }

    match index_model {
        Some(name) => {
            let index_model = lens.index_model(name)?;
            let history = lens.migrations.history(&index_model, limit)?;
            Ok(render::migration_history(&index_model, &history))
        }
        None => Ok(render::migration_dashboard(&migration_dashboard(
            &lens.migrations,
        )?)),
    }
}

/// Run a health check. An ambiguous name fails with the list of matches
/// unless `pick` selects one of them (1-based).
pub fn handle_health(lens: &Lens, model: &str, pick: Option<usize>) -> Result<String> {
    let aggregator = lens.aggregator()?;

    let report = match aggregator.check_model(model) {
        Err(LensError::AmbiguousIdentifier { name, matches }) => match pick {
            Some(n) if (1..=matches.len()).contains(&n) => {
                aggregator.check_model(&matches[n - 1])?
            }
            _ => {
                let listing: Vec<String> = matches
                    .iter()
                    .enumerate()
                    .map(|(i, m)| format!("  {}. {}", i + 1, m))
                    .collect();
                bail!(
                    "Found multiple models named {}:\n{}\nRe-run with --pick N to select one",
                    name,
                    listing.join("\n")
                );
            }
        },
        other => other?,
    };

    Ok(render::health(&report))
}

pub fn handle_admin(lens: &Lens, command: AdminCommands) -> Result<String> {
    match command {
        AdminCommands::Stats => {
            let stats = lens.storage.get_stats()?;
            Ok(format!(
                "Database Statistics\n  Build records:     {}\n  Migration records: {}\n  Disk usage:        {} bytes\n",
                stats.build_count, stats.migration_count, stats.disk_usage_bytes
            ))
        }
        AdminCommands::Compact => {
            lens.storage.compact()?;
            Ok("Compaction complete\n".to_string())
        }
        AdminCommands::PurgeBuilds { yes } => {
            if !yes {
                bail!("Purging deletes every build record; re-run with --yes to confirm");
            }
            let removed = lens.builds.purge()?;
            info!(removed, "Build records purged from CLI");
            Ok(format!("Removed {} build records\n", removed))
        }
    }
}
