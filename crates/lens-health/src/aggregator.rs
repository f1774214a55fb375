//! Health aggregation.
//!
//! Runs the index, base-model, build and config checks for one index model
//! and folds them into a [`HealthReport`]. A store that cannot be read turns
//! the affected check into an explicit "unavailable" status instead of an
//! error, so the rest of the report still renders.

use std::collections::BTreeSet;
use std::sync::Arc;

use lens_tracking::{BuildLog, MigrationLog};
use lens_types::{IndexModelDefinition, LensError, MigrationState};
use tracing::{debug, instrument};

use crate::catalog::{IndexCatalog, MigrationCatalog};
use crate::registry::ModelRegistry;
use crate::report::{ConfigFindings, HealthReport, ObserverRow, Severity, StatusCheck};
use crate::rules::{default_rules, ConfigRule, FindingLevel, RuleContext};

type Rows = Vec<(String, String)>;

fn row(label: &str, value: impl ToString) -> (String, String) {
    (label.to_string(), value.to_string())
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

/// Unwrap a read, or bail out of the check with an unavailable status.
macro_rules! read_or_unavailable {
    ($read:expr, $data:expr) => {
        match $read {
            Ok(value) => value,
            Err(e) if e.is_unavailable() => return Ok((StatusCheck::unavailable(e.to_string()), $data)),
            Err(e) => return Err(e),
        }
    };
}

/// Produces health reports for registered index models.
pub struct HealthAggregator {
    registry: ModelRegistry,
    builds: Arc<BuildLog>,
    migrations: Arc<MigrationLog>,
    catalog: Box<dyn IndexCatalog>,
    rules: Vec<Box<dyn ConfigRule>>,
    connection: String,
}

impl HealthAggregator {
    /// Aggregator with the migration-backed catalog and the built-in rules.
    pub fn new(registry: ModelRegistry, builds: Arc<BuildLog>, migrations: Arc<MigrationLog>) -> Self {
        Self {
            registry,
            builds,
            catalog: Box::new(MigrationCatalog::new(migrations.clone())),
            migrations,
            rules: default_rules(),
            connection: "default".to_string(),
        }
    }

    pub fn with_catalog(mut self, catalog: impl IndexCatalog + 'static) -> Self {
        self.catalog = Box::new(catalog);
        self
    }

    /// Add a rule after the current ones.
    pub fn with_rule(mut self, rule: impl ConfigRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Replace every rule, built-ins included.
    pub fn with_rules(mut self, rules: Vec<Box<dyn ConfigRule>>) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_connection(mut self, connection: impl Into<String>) -> Self {
        self.connection = connection.into();
        self
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Qualify a model name, then check its index model.
    ///
    /// Several matching types yield [`LensError::AmbiguousIdentifier`]; the
    /// caller must pick one and call again with the qualified name.
    pub fn check_model(&self, name: &str) -> Result<HealthReport, LensError> {
        let qualified = self.registry.qualify(name).into_unique(name)?;
        let definition = self.registry.definition_for(&qualified).ok_or_else(|| {
            LensError::RecordNotFound(format!("no index model is paired with {}", qualified))
        })?;
        self.check_definition(definition)
    }

    /// Check the index model registered under a resolved identifier.
    pub fn check(&self, identifier: &str) -> Result<HealthReport, LensError> {
        let definition = self
            .registry
            .definition(identifier)
            .ok_or_else(|| LensError::RecordNotFound(identifier.to_string()))?;
        self.check_definition(definition)
    }

    #[instrument(skip(self, definition), fields(index_model = %definition.index_model))]
    fn check_definition(&self, definition: &IndexModelDefinition) -> Result<HealthReport, LensError> {
        let identifier = definition.identifier();
        let base_model = self.registry.base_model_for(definition);
        let base_exists = base_model
            .as_deref()
            .is_some_and(|base| self.registry.contains(base));

        let (index_status, index_data) = self.index_check(&identifier, definition)?;
        let (model_status, model_data, observers) =
            self.model_check(definition, base_model.as_deref(), base_exists);
        let (build_status, build_data) = self.build_check(&identifier)?;
        let ctx = RuleContext {
            identifier: &identifier,
            definition,
            base_model: base_model.as_deref(),
            base_exists,
        };
        let (config_status, config_findings) = self.config_check(&ctx);

        let report = HealthReport {
            title: format!("{} health", identifier),
            index_model: definition.index_model.clone(),
            base_model,
            index_status,
            model_status,
            build_status,
            config_status,
            index_data,
            model_data,
            build_data,
            config_data: self.config_data(),
            observers,
            config_findings,
            identifier,
        };
        debug!(overall = %report.overall(), "Health check complete");
        Ok(report)
    }

    fn index_check(
        &self,
        identifier: &str,
        definition: &IndexModelDefinition,
    ) -> Result<(StatusCheck, Rows), LensError> {
        let mut data = vec![
            row("Identifier", identifier),
            row("Index Model", &definition.index_model),
            row("Declared Fields", definition.fields.len()),
        ];

        let exists = read_or_unavailable!(self.catalog.index_exists(identifier), data);
        let latest = read_or_unavailable!(self.migrations.latest(identifier), data);
        data.push(row(
            "Latest Version",
            latest
                .as_ref()
                .map(|r| r.version_label())
                .unwrap_or_else(|| "None".to_string()),
        ));

        if !exists {
            let status = StatusCheck::new(
                Severity::Critical,
                "Index Not Found",
                format!("No successful migration recorded for {}", identifier),
            )
            .with_help(format!("Run the migration for {}", definition.index_model));
            return Ok((status, data));
        }

        if let Some(failed) = latest.filter(|r| r.state == MigrationState::Failed) {
            let status = StatusCheck::new(
                Severity::Warning,
                "Latest Migration Failed",
                failed.error().unwrap_or("no error recorded").to_string(),
            )
            .with_help(format!("lens migration-logs {} --id {}", identifier, failed.id));
            return Ok((status, data));
        }

        let live = read_or_unavailable!(self.catalog.live_fields(identifier), data);
        let Some(live) = live else {
            data.push(row("Live Fields", "unknown"));
            return Ok((StatusCheck::ok("Index OK", "Live schema not available"), data));
        };
        data.push(row("Live Fields", live.len()));

        let declared: BTreeSet<&str> = definition.fields.keys().map(String::as_str).collect();
        let missing: Vec<&str> = declared
            .iter()
            .copied()
            .filter(|f| !live.contains(*f))
            .collect();
        let undeclared: Vec<&str> = if declared.is_empty() {
            Vec::new()
        } else {
            live.iter()
                .map(String::as_str)
                .filter(|f| !declared.contains(f))
                .collect()
        };

        let status = if !missing.is_empty() {
            StatusCheck::new(
                Severity::Warning,
                "Schema Out Of Sync",
                format!("Missing from live index: {}", missing.join(", ")),
            )
            .with_help("Run a new migration to apply the declared field map")
        } else if !undeclared.is_empty() {
            StatusCheck::new(
                Severity::Info,
                "Undeclared Fields",
                format!("Live index has extra fields: {}", undeclared.join(", ")),
            )
        } else {
            StatusCheck::ok("Index OK", format!("{} matches its declared fields", identifier))
        };
        Ok((status, data))
    }

    fn model_check(
        &self,
        definition: &IndexModelDefinition,
        base_model: Option<&str>,
        base_exists: bool,
    ) -> (StatusCheck, Rows, Vec<ObserverRow>) {
        let data = vec![
            row("Base Model", base_model.unwrap_or("N/A")),
            row("Registered", yes_no(base_exists)),
            row("Observes Base", yes_no(definition.observe_base)),
        ];

        let mut observers = Vec::new();
        if let (true, Some(base)) = (definition.observe_base, base_model) {
            observers.push(ObserverRow {
                model: base.to_string(),
                kind: "base".to_string(),
            });
        }
        observers.extend(definition.observers.iter().map(|o| ObserverRow {
            model: o.model.clone(),
            kind: o.kind.as_str().to_string(),
        }));

        let status = match base_model {
            None => StatusCheck::new(
                Severity::Critical,
                "Base Model Unresolved",
                format!("No base model could be derived for {}", definition.index_model),
            ),
            Some(base) if !base_exists => StatusCheck::new(
                Severity::Critical,
                "Base Model Not Found",
                format!("{} is not a registered type", base),
            ),
            Some(_) if observers.is_empty() => StatusCheck::new(
                Severity::Warning,
                "No Observers",
                "Changes to the base model will not trigger builds",
            ),
            Some(base) => StatusCheck::ok(
                "Base Model OK",
                format!("{} ({} observed)", base, observers.len()),
            ),
        };
        (status, data, observers)
    }

    fn build_check(&self, identifier: &str) -> Result<(StatusCheck, Rows), LensError> {
        let summary = read_or_unavailable!(self.builds.summary(identifier), Vec::new());
        let data = vec![
            row("Failed", summary.failed),
            row("Skipped", summary.skipped),
            row("Success", summary.success),
            row("Total", summary.total),
        ];

        let status = if summary.total == 0 {
            StatusCheck::ok("No Builds", format!("Nothing recorded for {} yet", identifier))
        } else if summary.failed > 0 {
            StatusCheck::new(
                Severity::Warning,
                "Failed Builds",
                format!("{} of {} records failed to build", summary.failed, summary.total),
            )
            .with_help(format!("lens build-logs {}", identifier))
        } else {
            StatusCheck::ok("Builds OK", format!("{} records built", summary.total))
        };
        Ok((status, data))
    }

    fn config_check(&self, ctx: &RuleContext<'_>) -> (StatusCheck, ConfigFindings) {
        let mut findings = ConfigFindings::default();
        for finding in self.rules.iter().filter_map(|rule| rule.evaluate(ctx)) {
            match finding.level {
                FindingLevel::Critical => findings.critical.push(finding),
                FindingLevel::Warning => findings.warning.push(finding),
            }
        }

        let counts = format!(
            "{} critical, {} warning",
            findings.critical.len(),
            findings.warning.len()
        );
        let status = if !findings.critical.is_empty() {
            StatusCheck::new(Severity::Critical, "Config Errors", counts)
        } else if !findings.warning.is_empty() {
            StatusCheck::new(Severity::Warning, "Config Recommendations", counts)
        } else {
            StatusCheck::ok("Config OK", "No findings")
        };
        (status, findings)
    }

    fn config_data(&self) -> Rows {
        let config = self.builds.config();
        vec![
            row("Connection", &self.connection),
            row("Build Log Cap", config.build_log_cap),
            row("Write Retry Limit", config.write_retry_limit),
            row(
                "Prefix Lookup",
                if config.id_prefix_lookup {
                    "enabled"
                } else {
                    "disabled"
                },
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{ConfigFinding, PredicateRule};
    use lens_storage::{DocumentStore, Storage, StorageError, WriteOp};
    use lens_tracking::{BuildAttempt, TrackingConfig};
    use lens_types::{AttemptOutcome, MigrationOutcome, MigrationVersion, NamespaceMapping};
    use serde_json::json;
    use tempfile::TempDir;

    const INDEX_MODEL: &str = "App\\Models\\Indexes\\IndexedUser";
    const IDENTIFIER: &str = "indexed_user_indexes";

    fn registry() -> ModelRegistry {
        let mut registry = ModelRegistry::new(vec![NamespaceMapping::new(
            "App\\Models",
            "App\\Models\\Indexes",
        )]);
        registry
            .register(
                IndexModelDefinition::new(INDEX_MODEL)
                    .with_field("name", "text")
                    .with_field("email", "keyword"),
            )
            .unwrap();
        registry
    }

    fn create_aggregator(store: Arc<dyn DocumentStore>) -> HealthAggregator {
        let builds = Arc::new(BuildLog::new(store.clone(), TrackingConfig::default()));
        let migrations = Arc::new(MigrationLog::new(store, TrackingConfig::default()));
        HealthAggregator::new(registry(), builds, migrations)
    }

    fn open_store() -> (Arc<Storage>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        (Arc::new(Storage::open(temp_dir.path()).unwrap()), temp_dir)
    }

    fn migrate(store: Arc<Storage>, snapshot: serde_json::Value) {
        MigrationLog::new(store, TrackingConfig::default())
            .record_migration(IDENTIFIER, MigrationVersion::INITIAL, MigrationOutcome::Applied(snapshot))
            .unwrap();
    }

    #[test]
    fn test_healthy_index() {
        let (store, _temp) = open_store();
        migrate(store.clone(), json!({"properties": {"name": {}, "email": {}}}));
        let aggregator = create_aggregator(store);

        let report = aggregator.check(IDENTIFIER).unwrap();
        assert_eq!(report.index_status.status, Severity::Ok);
        assert_eq!(report.model_status.status, Severity::Ok);
        assert_eq!(report.base_model.as_deref(), Some("App\\Models\\User"));
        assert_eq!(report.observers.len(), 1);
        assert_eq!(report.overall(), Severity::Ok);
        assert!(report.is_healthy());
    }

    #[test]
    fn test_zero_builds_is_ok() {
        let (store, _temp) = open_store();
        let aggregator = create_aggregator(store);

        let report = aggregator.check(IDENTIFIER).unwrap();
        assert_eq!(report.build_status.status, Severity::Ok);
        assert!(report.build_data.contains(&("Total".to_string(), "0".to_string())));
        // No migration yet
        assert_eq!(report.index_status.status, Severity::Critical);
    }

    #[test]
    fn test_one_critical_two_warnings() {
        let (store, _temp) = open_store();
        migrate(store.clone(), json!({"properties": {"name": {}, "email": {}}}));
        let aggregator = create_aggregator(store).with_rules(vec![
            Box::new(PredicateRule::new(|_: &RuleContext<'_>| {
                Some(ConfigFinding::critical("Index prefix collides with another index"))
            })),
            Box::new(PredicateRule::new(|_: &RuleContext<'_>| {
                Some(ConfigFinding::warning("Soft deletes not handled"))
            })),
            Box::new(PredicateRule::new(|_: &RuleContext<'_>| {
                Some(ConfigFinding::warning("Queue connection not set"))
            })),
        ]);

        let report = aggregator.check(IDENTIFIER).unwrap();
        assert_eq!(report.config_status.status, Severity::Critical);
        assert_eq!(report.config_findings.critical.len(), 1);
        assert_eq!(report.config_findings.warning.len(), 2);
        assert_eq!(report.overall(), Severity::Critical);
    }

    #[test]
    fn test_schema_drift_and_failed_builds_warn() {
        let (store, _temp) = open_store();
        migrate(store.clone(), json!({"properties": {"name": {}}}));
        let builds = BuildLog::new(store.clone(), TrackingConfig::default());
        builds.record_attempt(BuildAttempt::new(IDENTIFIER, "1", "App\\Models\\User", AttemptOutcome::Failed));
        let aggregator = create_aggregator(store);

        let report = aggregator.check(IDENTIFIER).unwrap();
        assert_eq!(report.index_status.status, Severity::Warning);
        assert!(report.index_status.detail.contains("email"));
        assert_eq!(report.build_status.status, Severity::Warning);
        assert_eq!(report.overall(), Severity::Warning);
    }

    #[test]
    fn test_latest_failed_migration_warns() {
        let (store, _temp) = open_store();
        migrate(store.clone(), json!({"properties": {"name": {}, "email": {}}}));
        MigrationLog::new(store.clone(), TrackingConfig::default())
            .record_migration(
                IDENTIFIER,
                MigrationVersion::new(1, 1),
                MigrationOutcome::Failed("mapper_parsing_exception".to_string()),
            )
            .unwrap();
        let aggregator = create_aggregator(store);

        let report = aggregator.check(IDENTIFIER).unwrap();
        assert_eq!(report.index_status.title, "Latest Migration Failed");
        assert_eq!(report.index_status.detail, "mapper_parsing_exception");
    }

    #[test]
    fn test_check_model_qualifies_first() {
        let (store, _temp) = open_store();
        let aggregator = create_aggregator(store);

        let report = aggregator.check_model("User").unwrap();
        assert_eq!(report.identifier, IDENTIFIER);

        assert!(matches!(
            aggregator.check_model("Invoice"),
            Err(LensError::RecordNotFound(_))
        ));
        assert!(matches!(
            aggregator.check("indexed_invoice"),
            Err(LensError::RecordNotFound(_))
        ));
    }

    #[test]
    fn test_ambiguous_model_is_a_precondition_failure() {
        let (store, _temp) = open_store();
        let builds = Arc::new(BuildLog::new(store.clone(), TrackingConfig::default()));
        let migrations = Arc::new(MigrationLog::new(store, TrackingConfig::default()));
        let mut registry = ModelRegistry::new(vec![
            NamespaceMapping::new("Modules\\Faq", "Modules\\Faq"),
            NamespaceMapping::new("Modules\\HelpCenter", "Modules\\HelpCenter"),
        ]);
        registry
            .register(IndexModelDefinition::new("Modules\\Faq\\IndexedTopic"))
            .unwrap();
        registry
            .register(IndexModelDefinition::new("Modules\\HelpCenter\\IndexedTopic"))
            .unwrap();
        let aggregator = HealthAggregator::new(registry, builds, migrations);

        match aggregator.check_model("Topic") {
            Err(LensError::AmbiguousIdentifier { matches, .. }) => assert_eq!(matches.len(), 2),
            other => panic!("expected ambiguity, got {:?}", other.map(|r| r.identifier)),
        }
        let report = aggregator.check_model("Modules\\HelpCenter\\Topic").unwrap();
        assert_eq!(report.identifier, "indexed_topic_help_center");
    }

    struct UnreachableStore;

    impl DocumentStore for UnreachableStore {
        fn get(&self, _: &str, _: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
            Err(StorageError::Unavailable("connection refused".to_string()))
        }

        fn prefix_scan(
            &self,
            _: &str,
            _: &[u8],
            _: Option<usize>,
        ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
            Err(StorageError::Unavailable("connection refused".to_string()))
        }

        fn insert(&self, _: &[WriteOp]) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("connection refused".to_string()))
        }

        fn compare_and_swap(
            &self,
            _: &'static str,
            _: &[u8],
            _: Option<&[u8]>,
            _: &[u8],
            _: &[WriteOp],
        ) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("connection refused".to_string()))
        }

        fn purge(&self, _: &str) -> Result<usize, StorageError> {
            Err(StorageError::Unavailable("connection refused".to_string()))
        }
    }

    #[test]
    fn test_unavailable_store_degrades_to_status() {
        let aggregator = create_aggregator(Arc::new(UnreachableStore));

        let report = aggregator.check(IDENTIFIER).unwrap();
        assert_eq!(report.index_status.title, "Store Unavailable");
        assert_eq!(report.build_status.title, "Store Unavailable");
        assert_eq!(report.overall(), Severity::Critical);
        // Checks that need no store still run
        assert_eq!(report.model_status.status, Severity::Ok);
    }
}
