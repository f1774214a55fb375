//! Migration record store.
//!
//! Append-only: one immutable record per migration run. Write failures are
//! surfaced, since these records are the authoritative schema history.

use std::collections::BTreeSet;
use std::sync::Arc;

use lens_storage::{
    DocumentStore, MigrationKey, StorageError, WriteOp, CF_MIGRATIONS, CF_MIGRATION_IDS,
};
use lens_types::{
    cmp_recency, validate_identifier, LensError, MigrationOutcome, MigrationRecord,
    MigrationState, MigrationVersion, VersionBump,
};
use tracing::{info, instrument};

use crate::config::TrackingConfig;
use crate::lookup;

fn check_non_negative(index_model: &str, version: &MigrationVersion) -> Result<(), LensError> {
    if version.major < 0 || version.minor < 0 {
        return Err(LensError::InvalidVersion(format!(
            "{} for {} has a negative component",
            version, index_model
        )));
    }
    Ok(())
}

/// Migration record store.
pub struct MigrationLog {
    store: Arc<dyn DocumentStore>,
    config: TrackingConfig,
}

impl MigrationLog {
    pub fn new(store: Arc<dyn DocumentStore>, config: TrackingConfig) -> Self {
        Self { store, config }
    }

    /// Append the outcome of one migration run.
    ///
    /// A successful run must not go below the latest successful version of
    /// the same index model; equal versions are accepted.
    #[instrument(skip(self, outcome))]
    pub fn record_migration(
        &self,
        index_model: &str,
        version: MigrationVersion,
        outcome: MigrationOutcome,
    ) -> Result<MigrationRecord, LensError> {
        validate_identifier(index_model)?;
        check_non_negative(index_model, &version)?;

        if outcome.state() == MigrationState::Success {
            if let Some(current) = self
                .latest_successful(index_model)?
                .and_then(|r| r.version())
            {
                if version < current {
                    return Err(LensError::InvalidVersion(format!(
                        "{} for {} is below the latest successful {}",
                        version, index_model, current
                    )));
                }
            }
        }

        self.append(MigrationRecord::new(index_model, Some(version), outcome))
    }

    /// Append an administrative record with no definite outcome.
    pub fn record_undefined(
        &self,
        index_model: &str,
        version: Option<MigrationVersion>,
        note: Option<String>,
    ) -> Result<MigrationRecord, LensError> {
        validate_identifier(index_model)?;
        if let Some(version) = &version {
            check_non_negative(index_model, version)?;
        }
        self.append(MigrationRecord::new(
            index_model,
            version,
            MigrationOutcome::Undefined(note),
        ))
    }

    fn append(&self, record: MigrationRecord) -> Result<MigrationRecord, LensError> {
        let key = MigrationKey::from_record_id(&record.index_model, &record.id)
            .map_err(StorageError::on_write)?
            .to_bytes();
        let ops = [
            WriteOp::new(CF_MIGRATIONS, key.clone(), record.to_bytes()?),
            WriteOp::new(CF_MIGRATION_IDS, record.id.clone(), key),
        ];
        self.store.insert(&ops).map_err(StorageError::on_write)?;

        info!(
            index_model = %record.index_model,
            state = %record.state,
            version = %record.version_label(),
            "Recorded migration"
        );
        Ok(record)
    }

    /// Every migration of one index model, oldest first or by recency.
    pub fn migrations_for(
        &self,
        index_model: &str,
        by_latest: bool,
    ) -> Result<Vec<MigrationRecord>, LensError> {
        let entries = self
            .store
            .prefix_scan(CF_MIGRATIONS, &MigrationKey::prefix(index_model), None)
            .map_err(StorageError::on_read)?;
        let mut records = entries
            .iter()
            .map(|(_, value)| MigrationRecord::from_bytes(value).map_err(LensError::from))
            .collect::<Result<Vec<_>, _>>()?;
        if by_latest {
            records.sort_by(|a, b| cmp_recency(b, a));
        }
        Ok(records)
    }

    /// Record with the highest version; missing versions rank lowest, ties
    /// go to the newest.
    pub fn latest(&self, index_model: &str) -> Result<Option<MigrationRecord>, LensError> {
        Ok(self
            .migrations_for(index_model, false)?
            .into_iter()
            .max_by(cmp_recency))
    }

    pub fn latest_successful(&self, index_model: &str) -> Result<Option<MigrationRecord>, LensError> {
        Ok(self
            .migrations_for(index_model, false)?
            .into_iter()
            .filter(|r| r.state == MigrationState::Success)
            .max_by(cmp_recency))
    }

    /// Most recent first by version, capped at `limit`.
    pub fn history(&self, index_model: &str, limit: usize) -> Result<Vec<MigrationRecord>, LensError> {
        let mut records = self.migrations_for(index_model, true)?;
        records.truncate(limit);
        Ok(records)
    }

    /// Failed runs, newest first, capped at `limit`.
    pub fn failed_migrations(
        &self,
        index_model: &str,
        limit: usize,
    ) -> Result<Vec<MigrationRecord>, LensError> {
        let mut records: Vec<_> = self
            .migrations_for(index_model, false)?
            .into_iter()
            .filter(|r| r.state == MigrationState::Failed)
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        records.truncate(limit);
        Ok(records)
    }

    pub fn count(&self, index_model: &str) -> Result<usize, LensError> {
        Ok(self
            .store
            .prefix_scan(CF_MIGRATIONS, &MigrationKey::prefix(index_model), None)
            .map_err(StorageError::on_read)?
            .len())
    }

    /// Distinct index models with at least one migration.
    pub fn index_models(&self) -> Result<Vec<String>, LensError> {
        let entries = self
            .store
            .prefix_scan(CF_MIGRATIONS, &MigrationKey::all(), None)
            .map_err(StorageError::on_read)?;
        let mut names = BTreeSet::new();
        for (key, _) in entries {
            let key = MigrationKey::from_bytes(&key).map_err(StorageError::on_read)?;
            names.insert(key.index_model);
        }
        Ok(names.into_iter().collect())
    }

    /// Version the next run should carry: the latest successful version
    /// bumped, or the initial version when there is none.
    pub fn next_version(
        &self,
        index_model: &str,
        bump: VersionBump,
    ) -> Result<MigrationVersion, LensError> {
        match self.latest_successful(index_model)?.and_then(|r| r.version()) {
            Some(current) => current.bump(bump),
            None => Ok(MigrationVersion::INITIAL),
        }
    }

    /// Exact lookup by record ID.
    pub fn find(&self, id: &str) -> Result<Option<MigrationRecord>, LensError> {
        match lookup::exact(self.store.as_ref(), CF_MIGRATION_IDS, id)? {
            Some(primary) => self.load(&primary),
            None => Ok(None),
        }
    }

    /// Exact ID, falling back to a best-effort prefix match.
    pub fn lookup(&self, id: &str) -> Result<MigrationRecord, LensError> {
        let primary = lookup::resolve(
            self.store.as_ref(),
            CF_MIGRATION_IDS,
            id,
            self.config.id_prefix_lookup,
        )?;
        self.load(&primary)?
            .ok_or_else(|| LensError::RecordNotFound(id.to_string()))
    }

    fn load(&self, primary: &[u8]) -> Result<Option<MigrationRecord>, LensError> {
        match self
            .store
            .get(CF_MIGRATIONS, primary)
            .map_err(StorageError::on_read)?
        {
            Some(bytes) => Ok(Some(MigrationRecord::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }
}
