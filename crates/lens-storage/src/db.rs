//! RocksDB wrapper for index-lens storage.
//!
//! Provides:
//! - Database open with column family setup
//! - Conditional writes through optimistic transactions
//! - Single-key reads and prefix scans
//! - Collection purge, compaction and stats

use std::path::Path;

use rocksdb::{ColumnFamily, Direction, IteratorMode, OptimisticTransactionDB, Options};
use tracing::{debug, info, instrument};

use crate::column_families::{build_cf_descriptors, ALL_CF_NAMES, CF_BUILDS, CF_MIGRATIONS};
use crate::error::StorageError;
use crate::store::{DocumentStore, WriteOp};

/// RocksDB-backed document store
pub struct Storage {
    db: OptimisticTransactionDB,
}

impl Storage {
    /// Open storage at the given path, creating if necessary.
    ///
    /// Failure to open is reported as [`StorageError::Unavailable`].
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        info!("Opening storage at {:?}", path);

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_max_background_jobs(4);

        let db = OptimisticTransactionDB::open_cf_descriptors(&db_opts, path, build_cf_descriptors())
            .map_err(|e| StorageError::Unavailable(format!("cannot open {:?}: {}", path, e)))?;

        Ok(Self { db })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily, StorageError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StorageError::ColumnFamilyNotFound(name.to_string()))
    }

    /// Flush all column families to disk
    pub fn flush(&self) -> Result<(), StorageError> {
        for cf_name in ALL_CF_NAMES {
            if let Some(cf) = self.db.cf_handle(cf_name) {
                self.db.flush_cf(cf)?;
            }
        }
        Ok(())
    }

    /// Trigger manual compaction on all column families.
    pub fn compact(&self) -> Result<(), StorageError> {
        info!("Starting full compaction...");
        for cf_name in ALL_CF_NAMES {
            if let Some(cf) = self.db.cf_handle(cf_name) {
                self.db.compact_range_cf::<&[u8], &[u8]>(cf, None, None);
            }
        }
        info!("Compaction complete");
        Ok(())
    }

    /// Get database statistics.
    pub fn get_stats(&self) -> Result<StorageStats, StorageError> {
        Ok(StorageStats {
            build_count: self.count_cf_entries(self.cf(CF_BUILDS)?)?,
            migration_count: self.count_cf_entries(self.cf(CF_MIGRATIONS)?)?,
            disk_usage_bytes: self.get_disk_usage(),
        })
    }

    fn count_cf_entries(&self, cf: &ColumnFamily) -> Result<u64, StorageError> {
        let mut count = 0u64;
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            item?;
            count += 1;
        }
        Ok(count)
    }

    fn get_disk_usage(&self) -> u64 {
        std::fs::read_dir(self.db.path())
            .map(|entries| {
                entries
                    .flatten()
                    .filter_map(|entry| entry.metadata().ok())
                    .map(|metadata| metadata.len())
                    .sum()
            })
            .unwrap_or(0)
    }
}

impl DocumentStore for Storage {
    fn get(&self, collection: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let cf = self.cf(collection)?;
        Ok(self.db.get_cf(cf, key)?)
    }

    fn prefix_scan(
        &self,
        collection: &str,
        prefix: &[u8],
        limit: Option<usize>,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        let cf = self.cf(collection)?;
        let limit = limit.unwrap_or(usize::MAX);

        let mut results = Vec::new();
        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(prefix, Direction::Forward));

        for item in iter {
            if results.len() >= limit {
                break;
            }
            let (key, value) = item?;
            // Stop if we've passed the prefix
            if !key.starts_with(prefix) {
                break;
            }
            results.push((key.to_vec(), value.to_vec()));
        }

        Ok(results)
    }

    fn insert(&self, ops: &[WriteOp]) -> Result<(), StorageError> {
        let txn = self.db.transaction();
        for op in ops {
            txn.put_cf(self.cf(op.collection)?, &op.key, &op.value)?;
        }
        txn.commit().map_err(StorageError::from_commit)?;
        debug!(count = ops.len(), "Inserted documents");
        Ok(())
    }

    #[instrument(skip(self, key, expected, value, extra))]
    fn compare_and_swap(
        &self,
        collection: &'static str,
        key: &[u8],
        expected: Option<&[u8]>,
        value: &[u8],
        extra: &[WriteOp],
    ) -> Result<(), StorageError> {
        let cf = self.cf(collection)?;
        let txn = self.db.transaction();

        // Tracks the key so a concurrent commit fails ours at commit time
        let current = txn.get_for_update_cf(cf, key, true)?;
        if current.as_deref() != expected {
            return Err(StorageError::Conflict(format!(
                "{} changed since it was read",
                String::from_utf8_lossy(key)
            )));
        }

        txn.put_cf(cf, key, value)?;
        for op in extra {
            txn.put_cf(self.cf(op.collection)?, &op.key, &op.value)?;
        }
        txn.commit().map_err(StorageError::from_commit)
    }

    fn purge(&self, collection: &str) -> Result<usize, StorageError> {
        let cf = self.cf(collection)?;
        let txn = self.db.transaction();
        let mut count = 0;

        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (key, _) = item?;
            txn.delete_cf(cf, &key)?;
            count += 1;
        }

        txn.commit().map_err(StorageError::from_commit)?;
        info!(collection = %collection, count, "Purged collection");
        Ok(count)
    }
}

/// Statistics about the storage.
#[derive(Debug, Default)]
pub struct StorageStats {
    /// Number of build records
    pub build_count: u64,
    /// Number of migration records
    pub migration_count: u64,
    /// Total disk usage in bytes
    pub disk_usage_bytes: u64,
}
