//! Build record store.
//!
//! One record per (index model, model id), updated in place on every attempt.
//! Writes go through a read-modify-compare-and-swap loop so concurrent
//! attempts against the same pair serialize without losing log entries.
//! Attempts against different pairs share nothing.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use lens_storage::{BuildKey, DocumentStore, StorageError, WriteOp, CF_BUILDS, CF_BUILD_IDS};
use lens_types::{
    validate_identifier, AttemptOutcome, BuildRecord, BuildState, LensError, LogData, LogEntry,
};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::config::TrackingConfig;
use crate::lookup;
use crate::queries::BuildSummary;

/// One build attempt as reported by the indexing pipeline.
#[derive(Debug, Clone)]
pub struct BuildAttempt {
    pub index_model: String,
    pub model_id: String,
    pub model: String,
    pub outcome: AttemptOutcome,
    pub data: LogData,
    /// What triggered the attempt (observer event, command, job)
    pub source: String,
    pub state_data: Value,
}

impl BuildAttempt {
    pub fn new(
        index_model: impl Into<String>,
        model_id: impl Into<String>,
        model: impl Into<String>,
        outcome: AttemptOutcome,
    ) -> Self {
        Self {
            index_model: index_model.into(),
            model_id: model_id.into(),
            model: model.into(),
            outcome,
            data: LogData::default(),
            source: String::new(),
            state_data: Value::Null,
        }
    }

    pub fn with_data(mut self, data: LogData) -> Self {
        self.data = data;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_state_data(mut self, state_data: Value) -> Self {
        self.state_data = state_data;
        self
    }
}

/// Build record store.
pub struct BuildLog {
    store: Arc<dyn DocumentStore>,
    config: TrackingConfig,
}

impl BuildLog {
    pub fn new(store: Arc<dyn DocumentStore>, config: TrackingConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    /// Record an attempt, best effort.
    ///
    /// Failures are reported as a `warn!` event and swallowed; the indexing
    /// caller's own write stands regardless. Returns the stored record on
    /// success.
    pub fn record_attempt(&self, attempt: BuildAttempt) -> Option<BuildRecord> {
        match self.try_record_attempt(&attempt) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(
                    index_model = %attempt.index_model,
                    model_id = %attempt.model_id,
                    error = %e,
                    "Build log write failed; attempt not recorded"
                );
                None
            }
        }
    }

    /// Record an attempt, surfacing failures.
    ///
    /// Conflicts are retried until `write_retry_limit` attempts or the
    /// `write_timeout` deadline, whichever comes first.
    #[instrument(skip(self, attempt), fields(index_model = %attempt.index_model, model_id = %attempt.model_id))]
    pub fn try_record_attempt(&self, attempt: &BuildAttempt) -> Result<BuildRecord, LensError> {
        validate_identifier(&attempt.index_model)?;

        let key = BuildKey::new(&attempt.index_model, &attempt.model_id).to_bytes();
        let deadline = Instant::now() + self.config.write_timeout;
        let mut tries: u32 = 0;

        loop {
            tries += 1;

            let current = self.store.get(CF_BUILDS, &key).map_err(StorageError::on_write)?;
            let mut record = match current.as_deref() {
                Some(bytes) => BuildRecord::from_bytes(bytes)?,
                None => BuildRecord::new(&attempt.index_model, &attempt.model_id, &attempt.model),
            };
            record.apply(
                LogEntry::new(attempt.outcome, attempt.data.clone()),
                attempt.source.clone(),
                attempt.state_data.clone(),
                self.config.build_log_cap,
            );
            let value = record.to_bytes()?;

            // ID index entry is written once, with the record's creation
            let extra = match current {
                None => vec![WriteOp::new(CF_BUILD_IDS, record.id.clone(), key.clone())],
                Some(_) => Vec::new(),
            };

            match self
                .store
                .compare_and_swap(CF_BUILDS, &key, current.as_deref(), &value, &extra)
            {
                Ok(()) => {
                    debug!(state = %record.state, version = record.version, tries, "Recorded build attempt");
                    return Ok(record);
                }
                Err(StorageError::Conflict(reason)) => {
                    if tries >= self.config.write_retry_limit {
                        return Err(StorageError::Conflict(format!(
                            "gave up after {} tries: {}",
                            tries, reason
                        ))
                        .on_write());
                    }
                    if Instant::now() >= deadline {
                        return Err(StorageError::Timeout(format!(
                            "{}ms elapsed after {} tries",
                            self.config.write_timeout.as_millis(),
                            tries
                        ))
                        .on_write());
                    }
                    debug!(tries, "Build record changed underneath, retrying");
                    std::thread::yield_now();
                }
                Err(e) => return Err(e.on_write()),
            }
        }
    }

    /// Record for one (index model, model id) pair.
    pub fn get(&self, index_model: &str, model_id: &str) -> Result<Option<BuildRecord>, LensError> {
        let key = BuildKey::new(index_model, model_id).to_bytes();
        match self.store.get(CF_BUILDS, &key).map_err(StorageError::on_read)? {
            Some(bytes) => Ok(Some(BuildRecord::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Exact lookup by record ID.
    pub fn find(&self, id: &str) -> Result<Option<BuildRecord>, LensError> {
        match lookup::exact(self.store.as_ref(), CF_BUILD_IDS, id)? {
            Some(primary) => self.load(&primary),
            None => Ok(None),
        }
    }

    /// First record whose ID starts with `prefix`; `None` when prefix
    /// lookup is disabled.
    pub fn find_by_prefix(&self, prefix: &str) -> Result<Option<BuildRecord>, LensError> {
        if !self.config.id_prefix_lookup {
            return Ok(None);
        }
        match lookup::by_prefix(self.store.as_ref(), CF_BUILD_IDS, prefix)? {
            Some(primary) => self.load(&primary),
            None => Ok(None),
        }
    }

    /// Exact ID, falling back to a best-effort prefix match.
    pub fn lookup(&self, id: &str) -> Result<BuildRecord, LensError> {
        let primary = lookup::resolve(
            self.store.as_ref(),
            CF_BUILD_IDS,
            id,
            self.config.id_prefix_lookup,
        )?;
        self.load(&primary)?
            .ok_or_else(|| LensError::RecordNotFound(id.to_string()))
    }

    fn load(&self, primary: &[u8]) -> Result<Option<BuildRecord>, LensError> {
        match self.store.get(CF_BUILDS, primary).map_err(StorageError::on_read)? {
            Some(bytes) => Ok(Some(BuildRecord::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Every build of one index model, in model-id order or newest-updated
    /// first.
    pub fn builds_for(&self, index_model: &str, by_latest: bool) -> Result<Vec<BuildRecord>, LensError> {
        let mut records = self.scan(&BuildKey::prefix(index_model))?;
        if by_latest {
            records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        }
        Ok(records)
    }

    /// Records in `state`, newest-updated first, capped at `limit`.
    pub fn list_by_state(
        &self,
        index_model: Option<&str>,
        state: BuildState,
        limit: usize,
    ) -> Result<Vec<BuildRecord>, LensError> {
        let prefix = match index_model {
            Some(index_model) => BuildKey::prefix(index_model),
            None => BuildKey::all(),
        };
        let mut records: Vec<_> = self
            .scan(&prefix)?
            .into_iter()
            .filter(|r| r.state == state)
            .collect();
        records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        records.truncate(limit);
        Ok(records)
    }

    pub fn failed_builds(&self, index_model: &str, limit: usize) -> Result<Vec<BuildRecord>, LensError> {
        self.list_by_state(Some(index_model), BuildState::Failed, limit)
    }

    /// Distinct index models with at least one build.
    pub fn index_models(&self) -> Result<Vec<String>, LensError> {
        let entries = self
            .store
            .prefix_scan(CF_BUILDS, &BuildKey::all(), None)
            .map_err(StorageError::on_read)?;
        let mut names = BTreeSet::new();
        for (key, _) in entries {
            let key = BuildKey::from_bytes(&key).map_err(StorageError::on_read)?;
            names.insert(key.index_model);
        }
        Ok(names.into_iter().collect())
    }

    pub fn count_errors(&self, index_model: &str) -> Result<usize, LensError> {
        Ok(self.summary(index_model)?.failed)
    }

    pub fn count_skips(&self, index_model: &str) -> Result<usize, LensError> {
        Ok(self.summary(index_model)?.skipped)
    }

    pub fn count_total(&self, index_model: &str) -> Result<usize, LensError> {
        Ok(self.summary(index_model)?.total)
    }

    /// Failed, skipped, success and total counts in a single scan.
    pub fn summary(&self, index_model: &str) -> Result<BuildSummary, LensError> {
        let records = self.scan(&BuildKey::prefix(index_model))?;
        Ok(BuildSummary::from_states(records.iter().map(|r| r.state)))
    }

    /// Drop every build record and the ID index. Returns records removed.
    pub fn purge(&self) -> Result<usize, LensError> {
        let removed = self.store.purge(CF_BUILDS).map_err(StorageError::on_write)?;
        self.store.purge(CF_BUILD_IDS).map_err(StorageError::on_write)?;
        info!(removed, "Purged build records");
        Ok(removed)
    }

    fn scan(&self, prefix: &[u8]) -> Result<Vec<BuildRecord>, LensError> {
        let entries = self
            .store
            .prefix_scan(CF_BUILDS, prefix, None)
            .map_err(StorageError::on_read)?;
        entries
            .iter()
            .map(|(_, value)| BuildRecord::from_bytes(value).map_err(LensError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lens_storage::Storage;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    /// Store where every conditional update loses to another writer.
    #[derive(Default)]
    struct ContendedStore {
        swaps: AtomicU32,
    }

    impl DocumentStore for ContendedStore {
        fn get(&self, _: &str, _: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
            Ok(None)
        }

        fn prefix_scan(
            &self,
            _: &str,
            _: &[u8],
            _: Option<usize>,
        ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
            Ok(Vec::new())
        }

        fn insert(&self, _: &[WriteOp]) -> Result<(), StorageError> {
            Ok(())
        }

        fn compare_and_swap(
            &self,
            _: &'static str,
            _: &[u8],
            _: Option<&[u8]>,
            _: &[u8],
            _: &[WriteOp],
        ) -> Result<(), StorageError> {
            self.swaps.fetch_add(1, Ordering::SeqCst);
            Err(StorageError::Conflict("record changed".to_string()))
        }

        fn purge(&self, _: &str) -> Result<usize, StorageError> {
            Ok(0)
        }
    }

    fn create_test_log(config: TrackingConfig) -> (BuildLog, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = Arc::new(Storage::open(temp_dir.path()).unwrap());
        (BuildLog::new(storage, config), temp_dir)
    }

    fn attempt(model_id: &str, outcome: AttemptOutcome, message: &str) -> BuildAttempt {
        BuildAttempt::new("indexed_user", model_id, "App\\Models\\User", outcome)
            .with_data(LogData::message(message))
            .with_source("observer:updated")
    }

    #[test]
    fn test_first_attempt_creates_record() {
        let (log, _temp) = create_test_log(TrackingConfig::default());
        let record = log
            .record_attempt(attempt("1", AttemptOutcome::Succeeded, "ok"))
            .unwrap();

        assert_eq!(record.state, BuildState::Success);
        assert_eq!(record.logs.len(), 1);
        assert_eq!(record.last_source, "observer:updated");
        assert_eq!(record.version, 1);

        let stored = log.get("indexed_user", "1").unwrap().unwrap();
        assert_eq!(stored.id, record.id);
    }

    #[test]
    fn test_failed_then_success_transitions() {
        let (log, _temp) = create_test_log(TrackingConfig::default());
        let failed = log
            .record_attempt(attempt("7", AttemptOutcome::Failed, "mapper_parsing_exception"))
            .unwrap();
        assert_eq!(failed.state, BuildState::Failed);

        let ok = log
            .record_attempt(attempt("7", AttemptOutcome::Succeeded, "ok"))
            .unwrap();
        assert_eq!(ok.state, BuildState::Success);
        assert!(ok.logs[0].success);
        assert!(!ok.logs[1].success);
        // Same row, updated in place
        assert_eq!(ok.id, failed.id);
        assert_eq!(log.count_total("indexed_user").unwrap(), 1);
    }

    #[test]
    fn test_log_cap_keeps_newest() {
        let cap = 3;
        let (log, _temp) = create_test_log(TrackingConfig::default().with_build_log_cap(cap));
        for i in 0..(cap + 4) {
            log.record_attempt(attempt("1", AttemptOutcome::Succeeded, &format!("attempt {}", i)));
        }

        let record = log.get("indexed_user", "1").unwrap().unwrap();
        assert_eq!(record.logs.len(), cap);
        let messages: Vec<_> = record
            .logs
            .iter()
            .map(|l| l.data.message.clone().unwrap())
            .collect();
        assert_eq!(messages, vec!["attempt 6", "attempt 5", "attempt 4"]);
    }

    #[test]
    fn test_skip_sets_skipped_state() {
        let (log, _temp) = create_test_log(TrackingConfig::default());
        let record = log
            .record_attempt(attempt("1", AttemptOutcome::Skipped, "unchanged"))
            .unwrap();
        assert_eq!(record.state, BuildState::Skipped);
        assert!(record.logs[0].skipped);
    }

    #[test]
    fn test_counts_add_up() {
        let (log, _temp) = create_test_log(TrackingConfig::default());
        log.record_attempt(attempt("1", AttemptOutcome::Succeeded, "ok"));
        log.record_attempt(attempt("2", AttemptOutcome::Failed, "boom"));
        log.record_attempt(attempt("3", AttemptOutcome::Skipped, "noop"));
        log.record_attempt(attempt("4", AttemptOutcome::Failed, "boom"));
        log.record_attempt(
            BuildAttempt::new("topic_faq", "1", "Modules\\Faq\\Topic", AttemptOutcome::Failed),
        );

        let summary = log.summary("indexed_user").unwrap();
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.success, 1);
        assert_eq!(summary.total, 4);
        assert_eq!(log.count_errors("indexed_user").unwrap(), 2);
        assert_eq!(log.count_skips("indexed_user").unwrap(), 1);
        assert_eq!(
            log.index_models().unwrap(),
            vec!["indexed_user".to_string(), "topic_faq".to_string()]
        );
    }

    #[test]
    fn test_zero_builds() {
        let (log, _temp) = create_test_log(TrackingConfig::default());
        assert_eq!(log.count_total("indexed_user").unwrap(), 0);
        assert!(log.builds_for("indexed_user", true).unwrap().is_empty());
    }

    #[test]
    fn test_failed_builds_newest_first_and_capped() {
        let (log, _temp) = create_test_log(TrackingConfig::default());
        for id in ["a", "b", "c"] {
            log.record_attempt(attempt(id, AttemptOutcome::Failed, "boom"));
            std::thread::sleep(Duration::from_millis(2));
        }
        log.record_attempt(attempt("d", AttemptOutcome::Succeeded, "ok"));

        let failed = log.failed_builds("indexed_user", 2).unwrap();
        let ids: Vec<_> = failed.iter().map(|r| r.model_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b"]);
    }

    #[test]
    fn test_find_and_prefix_lookup() {
        let (log, _temp) = create_test_log(TrackingConfig::default());
        let record = log
            .record_attempt(attempt("1", AttemptOutcome::Succeeded, "ok"))
            .unwrap();

        assert_eq!(log.find(&record.id).unwrap().unwrap().model_id, "1");
        assert!(log.find(&record.id[..10]).unwrap().is_none());

        let by_prefix = log.lookup(&record.id[..20].to_lowercase()).unwrap();
        assert_eq!(by_prefix.id, record.id);

        let missing = log.lookup("ZZZZZZZZZZZZZZZZZZZZZZZZZZ").unwrap_err();
        assert!(matches!(missing, LensError::RecordNotFound(_)));
    }

    #[test]
    fn test_prefix_lookup_disabled_degrades_to_not_found() {
        let (log, _temp) = create_test_log(TrackingConfig::default().with_id_prefix_lookup(false));
        let record = log
            .record_attempt(attempt("1", AttemptOutcome::Succeeded, "ok"))
            .unwrap();

        assert!(log.find_by_prefix(&record.id[..20]).unwrap().is_none());
        assert!(matches!(
            log.lookup(&record.id[..20]),
            Err(LensError::RecordNotFound(_))
        ));
        assert!(log.lookup(&record.id).is_ok());
    }

    #[test]
    fn test_conflicts_give_up_at_retry_limit() {
        let store = Arc::new(ContendedStore::default());
        let config = TrackingConfig::default()
            .with_write_retry_limit(3)
            .with_write_timeout(Duration::from_secs(60));
        let log = BuildLog::new(store.clone(), config);

        let err = log
            .try_record_attempt(&attempt("1", AttemptOutcome::Succeeded, "ok"))
            .unwrap_err();
        match err {
            LensError::WriteFailure(msg) => assert!(msg.contains("gave up after 3 tries")),
            other => panic!("Expected WriteFailure, got {:?}", other),
        }
        assert_eq!(store.swaps.load(Ordering::SeqCst), 3);

        // The best-effort path swallows the same failure
        assert!(log
            .record_attempt(attempt("1", AttemptOutcome::Failed, "boom"))
            .is_none());
        assert_eq!(store.swaps.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn test_conflicts_give_up_at_deadline() {
        let store = Arc::new(ContendedStore::default());
        let config = TrackingConfig::default()
            .with_write_retry_limit(1_000)
            .with_write_timeout(Duration::ZERO);
        let log = BuildLog::new(store.clone(), config);

        let err = log
            .try_record_attempt(&attempt("1", AttemptOutcome::Succeeded, "ok"))
            .unwrap_err();
        match err {
            LensError::WriteFailure(msg) => {
                assert!(msg.contains("Timed out"));
                assert!(msg.contains("after 1 tries"));
            }
            other => panic!("Expected WriteFailure, got {:?}", other),
        }
        assert_eq!(store.swaps.load(Ordering::SeqCst), 1);

        assert!(log
            .record_attempt(attempt("1", AttemptOutcome::Succeeded, "ok"))
            .is_none());
    }

    #[test]
    fn test_lookup_ignores_case() {
        let (log, _temp) = create_test_log(TrackingConfig::default().with_id_prefix_lookup(false));
        let record = log
            .record_attempt(attempt("1", AttemptOutcome::Succeeded, "ok"))
            .unwrap();

        let lower = record.id.to_ascii_lowercase();
        assert_eq!(log.lookup(&lower).unwrap().id, record.id);
        assert_eq!(log.lookup(&format!("  {}  ", lower)).unwrap().id, record.id);
    }

    #[test]
    fn test_invalid_identifier_is_swallowed() {
        let (log, _temp) = create_test_log(TrackingConfig::default());
        let bad = BuildAttempt::new("indexed:user", "1", "User", AttemptOutcome::Succeeded);
        assert!(log.record_attempt(bad.clone()).is_none());
        assert!(matches!(
            log.try_record_attempt(&bad),
            Err(LensError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_concurrent_attempts_on_same_pair() {
        let config = TrackingConfig::default()
            .with_build_log_cap(100)
            .with_write_retry_limit(10_000)
            .with_write_timeout(Duration::from_secs(30));
        let (log, _temp) = create_test_log(config);
        let log = Arc::new(log);

        let writers = 4;
        let per_writer = 10;
        std::thread::scope(|s| {
            for w in 0..writers {
                let log = Arc::clone(&log);
                s.spawn(move || {
                    for i in 0..per_writer {
                        let recorded = log.record_attempt(attempt(
                            "shared",
                            AttemptOutcome::Succeeded,
                            &format!("w{}-{}", w, i),
                        ));
                        assert!(recorded.is_some());
                    }
                });
            }
        });

        let record = log.get("indexed_user", "shared").unwrap().unwrap();
        assert_eq!(record.version, (writers * per_writer) as u64);
        assert_eq!(record.logs.len(), writers * per_writer);
        assert_eq!(log.count_total("indexed_user").unwrap(), 1);
    }

    #[test]
    fn test_purge() {
        let (log, _temp) = create_test_log(TrackingConfig::default());
        let record = log
            .record_attempt(attempt("1", AttemptOutcome::Succeeded, "ok"))
            .unwrap();
        log.record_attempt(attempt("2", AttemptOutcome::Succeeded, "ok"));

        assert_eq!(log.purge().unwrap(), 2);
        assert_eq!(log.count_total("indexed_user").unwrap(), 0);
        assert!(log.find(&record.id).unwrap().is_none());
    }
}
