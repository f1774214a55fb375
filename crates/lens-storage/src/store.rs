//! Document-store seam.
//!
//! The tracking engine talks to its store only through [`DocumentStore`].
//! [`crate::Storage`] is the RocksDB implementation; anything offering
//! per-key reads, prefix scans, atomic multi-key writes and a conditional
//! update can stand in for it.

use crate::error::StorageError;

/// One key/value write into a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOp {
    pub collection: &'static str,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl WriteOp {
    pub fn new(collection: &'static str, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            collection,
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Key/value document store with optimistic concurrency.
pub trait DocumentStore: Send + Sync {
    /// Read a single document.
    fn get(&self, collection: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;

    /// Documents whose key starts with `prefix`, in key order.
    #[allow(clippy::type_complexity)]
    fn prefix_scan(
        &self,
        collection: &str,
        prefix: &[u8],
        limit: Option<usize>,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError>;

    /// Write all ops atomically, unconditionally.
    fn insert(&self, ops: &[WriteOp]) -> Result<(), StorageError>;

    /// Replace `key` with `value` only if its current content equals
    /// `expected` (`None` = must not exist). `extra` is written in the same
    /// atomic unit. Returns [`StorageError::Conflict`] when the check fails
    /// or a concurrent writer commits first.
    fn compare_and_swap(
        &self,
        collection: &'static str,
        key: &[u8],
        expected: Option<&[u8]>,
        value: &[u8],
        extra: &[WriteOp],
    ) -> Result<(), StorageError>;

    /// Remove every document of a collection. Returns the count removed.
    fn purge(&self, collection: &str) -> Result<usize, StorageError>;
}
