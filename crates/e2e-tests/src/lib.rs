//! End-to-end test infrastructure for index-lens.
//!
//! Provides a shared TestHarness and helpers for tests covering the path
//! from recorded attempts and migrations through to health reports.

use std::sync::Arc;

use lens_health::{HealthAggregator, ModelRegistry};
use lens_storage::Storage;
use lens_tracking::{BuildAttempt, BuildLog, MigrationLog, TrackingConfig};
use lens_types::{AttemptOutcome, IndexModelDefinition, LogData, NamespaceMapping};

/// Index model used by most scenarios.
pub const USER_INDEX: &str = "App\\Models\\Indexes\\IndexedUser";
pub const USER_IDENTIFIER: &str = "indexed_user_indexes";
pub const USER_MODEL: &str = "App\\Models\\User";

/// Shared test harness for E2E tests.
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    pub storage: Arc<Storage>,
    pub builds: Arc<BuildLog>,
    pub migrations: Arc<MigrationLog>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(TrackingConfig::default())
    }

    pub fn with_config(config: TrackingConfig) -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let storage =
            Arc::new(Storage::open(temp_dir.path()).expect("Failed to open test storage"));
        let builds = Arc::new(BuildLog::new(storage.clone(), config.clone()));
        let migrations = Arc::new(MigrationLog::new(storage.clone(), config));

        Self {
            _temp_dir: temp_dir,
            storage,
            builds,
            migrations,
        }
    }

    /// Aggregator over this harness's stores with [`registry`].
    pub fn aggregator(&self) -> HealthAggregator {
        HealthAggregator::new(registry(), self.builds.clone(), self.migrations.clone())
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry with a user index and two same-named topic indexes.
pub fn registry() -> ModelRegistry {
    let mut registry = ModelRegistry::new(vec![
        NamespaceMapping::new("App\\Models", "App\\Models\\Indexes"),
        NamespaceMapping::new("Modules\\Faq", "Modules\\Faq"),
        NamespaceMapping::new("Modules\\HelpCenter", "Modules\\HelpCenter"),
    ]);
    registry
        .register(
            IndexModelDefinition::new(USER_INDEX)
                .with_field("name", "text")
                .with_field("email", "keyword"),
        )
        .expect("Failed to register user index");
    registry
        .register(IndexModelDefinition::new("Modules\\Faq\\IndexedTopic"))
        .expect("Failed to register faq index");
    registry
        .register(IndexModelDefinition::new("Modules\\HelpCenter\\IndexedTopic"))
        .expect("Failed to register help center index");
    registry
}

/// Attempt on the user index for `model_id`.
pub fn user_attempt(model_id: &str, outcome: AttemptOutcome) -> BuildAttempt {
    let message = match outcome {
        AttemptOutcome::Succeeded => "Indexed",
        AttemptOutcome::Failed => "mapper_parsing_exception: failed to parse field [email]",
        AttemptOutcome::Skipped => "Skipped: not searchable",
    };
    BuildAttempt::new(USER_IDENTIFIER, model_id, USER_MODEL, outcome)
        .with_data(LogData::message(message))
        .with_source("saved")
}

/// Random numeric model IDs, unique within the returned set.
pub fn random_model_ids(count: usize) -> Vec<String> {
    let mut ids = std::collections::BTreeSet::new();
    while ids.len() < count {
        ids.insert(rand::random::<u32>().to_string());
    }
    ids.into_iter().collect()
}
