//! Storage layer for index-lens.
//!
//! Provides RocksDB-backed storage with:
//! - Column family isolation per collection (builds, migrations, ID indexes)
//! - Prefix-scoped keys for per-index-model scans
//! - Atomic multi-key writes via optimistic transactions
//! - Compare-and-swap updates for concurrent build writers

pub mod column_families;
pub mod db;
pub mod error;
pub mod keys;
pub mod store;

pub use column_families::{CF_BUILDS, CF_BUILD_IDS, CF_MIGRATIONS, CF_MIGRATION_IDS};
pub use db::{Storage, StorageStats};
pub use error::StorageError;
pub use keys::{BuildKey, MigrationKey};
pub use store::{DocumentStore, WriteOp};
