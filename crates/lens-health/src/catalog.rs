//! Index catalog seam.
//!
//! The health check asks whether an index exists and which fields its live
//! schema has. A search-engine client can answer directly; without one,
//! [`MigrationCatalog`] answers from the migration history.

use std::collections::BTreeSet;
use std::sync::Arc;

use lens_tracking::MigrationLog;
use lens_types::LensError;

/// Live index information.
pub trait IndexCatalog: Send + Sync {
    fn index_exists(&self, identifier: &str) -> Result<bool, LensError>;

    /// Field names of the live schema, `None` when unknown.
    fn live_fields(&self, identifier: &str) -> Result<Option<BTreeSet<String>>, LensError>;
}

/// Catalog backed by migration records: an index exists once a migration
/// succeeded, and its schema is the latest successful snapshot.
pub struct MigrationCatalog {
    migrations: Arc<MigrationLog>,
}

impl MigrationCatalog {
    pub fn new(migrations: Arc<MigrationLog>) -> Self {
        Self { migrations }
    }
}

impl IndexCatalog for MigrationCatalog {
    fn index_exists(&self, identifier: &str) -> Result<bool, LensError> {
        Ok(self.migrations.latest_successful(identifier)?.is_some())
    }

    fn live_fields(&self, identifier: &str) -> Result<Option<BTreeSet<String>>, LensError> {
        Ok(self
            .migrations
            .latest_successful(identifier)?
            .map(|record| record.snapshot_fields()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lens_storage::Storage;
    use lens_tracking::TrackingConfig;
    use lens_types::{MigrationOutcome, MigrationVersion};
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_migration_catalog() {
        let temp_dir = TempDir::new().unwrap();
        let storage = Arc::new(Storage::open(temp_dir.path()).unwrap());
        let migrations = Arc::new(MigrationLog::new(storage, TrackingConfig::default()));
        let catalog = MigrationCatalog::new(migrations.clone());

        assert!(!catalog.index_exists("indexed_user").unwrap());
        assert_eq!(catalog.live_fields("indexed_user").unwrap(), None);

        migrations
            .record_migration(
                "indexed_user",
                MigrationVersion::INITIAL,
                MigrationOutcome::Failed("boom".to_string()),
            )
            .unwrap();
        assert!(!catalog.index_exists("indexed_user").unwrap());

        migrations
            .record_migration(
                "indexed_user",
                MigrationVersion::INITIAL,
                MigrationOutcome::Applied(json!({"mappings": {"properties": {"email": {}}}})),
            )
            .unwrap();
        assert!(catalog.index_exists("indexed_user").unwrap());
        let fields = catalog.live_fields("indexed_user").unwrap().unwrap();
        assert!(fields.contains("email"));
    }
}
