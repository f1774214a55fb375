//! Storage layer error types.

use lens_types::LensError;
use thiserror::Error;

/// Errors that can occur in the storage layer
#[derive(Error, Debug)]
pub enum StorageError {
    /// RocksDB operation failed
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),

    /// The store could not be opened or reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A conditional write lost to a concurrent writer
    #[error("Write conflict: {0}")]
    Conflict(String),

    /// Retry deadline exceeded
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Column family not found
    #[error("Column family not found: {0}")]
    ColumnFamilyNotFound(String),

    /// Key encoding/decoding error
    #[error("Key error: {0}")]
    Key(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl StorageError {
    /// Map a failed transaction commit; busy/try-again means another writer won.
    pub fn from_commit(err: rocksdb::Error) -> Self {
        match err.kind() {
            rocksdb::ErrorKind::Busy | rocksdb::ErrorKind::TryAgain => {
                StorageError::Conflict(err.to_string())
            }
            _ => StorageError::RocksDb(err),
        }
    }

    /// True for failures that mean the store itself is not reachable.
    pub fn is_unavailable(&self) -> bool {
        match self {
            StorageError::Unavailable(_) | StorageError::ColumnFamilyNotFound(_) => true,
            StorageError::RocksDb(e) => matches!(
                e.kind(),
                rocksdb::ErrorKind::IOError
                    | rocksdb::ErrorKind::ShutdownInProgress
                    | rocksdb::ErrorKind::Corruption
            ),
            _ => false,
        }
    }

    /// Classify an error raised while reading.
    pub fn on_read(self) -> LensError {
        match self {
            StorageError::Serialization(msg) | StorageError::Key(msg) => {
                LensError::Serialization(msg)
            }
            other => LensError::StoreUnavailable(other.to_string()),
        }
    }

    /// Classify an error raised while writing.
    pub fn on_write(self) -> LensError {
        if self.is_unavailable() {
            LensError::StoreUnavailable(self.to_string())
        } else {
            LensError::WriteFailure(self.to_string())
        }
    }
}
