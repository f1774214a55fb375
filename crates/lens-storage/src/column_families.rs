//! Column family definitions for RocksDB.
//!
//! Each collection lives in its own column family:
//! - indexable_builds: build records keyed by (index model, model id)
//! - indexable_build_ids: build ID -> primary key (prefix-searchable)
//! - indexable_migration_logs: append-only migration records
//! - indexable_migration_ids: migration ID -> primary key

use rocksdb::{ColumnFamilyDescriptor, Options};

/// Column family name for build records
pub const CF_BUILDS: &str = "indexable_builds";

/// Column family name for the build ID index
pub const CF_BUILD_IDS: &str = "indexable_build_ids";

/// Column family name for migration records
pub const CF_MIGRATIONS: &str = "indexable_migration_logs";

/// Column family name for the migration ID index
pub const CF_MIGRATION_IDS: &str = "indexable_migration_ids";

/// All column family names
pub const ALL_CF_NAMES: &[&str] = &[CF_BUILDS, CF_BUILD_IDS, CF_MIGRATIONS, CF_MIGRATION_IDS];

/// Append-only, compressed
fn migrations_options() -> Options {
    let mut opts = Options::default();
    opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
    opts
}

/// Build all column family descriptors
pub fn build_cf_descriptors() -> Vec<ColumnFamilyDescriptor> {
    vec![
        ColumnFamilyDescriptor::new(CF_BUILDS, Options::default()),
        ColumnFamilyDescriptor::new(CF_BUILD_IDS, Options::default()),
        ColumnFamilyDescriptor::new(CF_MIGRATIONS, migrations_options()),
        ColumnFamilyDescriptor::new(CF_MIGRATION_IDS, Options::default()),
    ]
}
