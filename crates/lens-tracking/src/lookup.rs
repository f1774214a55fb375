//! ID index lookups shared by the build and migration stores.
//!
//! Record IDs live in their own column family (`id -> primary key`) so a
//! short ID prefix can be answered with a bounded prefix scan instead of a
//! full collection scan.

use lens_storage::{DocumentStore, StorageError};
use lens_types::LensError;

/// Length of a full record ID (a ULID string).
pub(crate) const FULL_ID_LEN: usize = 26;

/// Primary key for an exact record ID.
pub(crate) fn exact(
    store: &dyn DocumentStore,
    ids_collection: &str,
    id: &str,
) -> Result<Option<Vec<u8>>, LensError> {
    store
        .get(ids_collection, id.as_bytes())
        .map_err(StorageError::on_read)
}

/// Primary key of the first record (in ID order) whose ID starts with `prefix`.
pub(crate) fn by_prefix(
    store: &dyn DocumentStore,
    ids_collection: &str,
    prefix: &str,
) -> Result<Option<Vec<u8>>, LensError> {
    if prefix.is_empty() {
        return Ok(None);
    }
    let hits = store
        .prefix_scan(ids_collection, prefix.as_bytes(), Some(1))
        .map_err(StorageError::on_read)?;
    Ok(hits.into_iter().next().map(|(_, primary)| primary))
}

/// Exact match first, then prefix when allowed and `id` is shorter than a
/// full ID. Yields `RecordNotFound` when neither hits.
pub(crate) fn resolve(
    store: &dyn DocumentStore,
    ids_collection: &str,
    id: &str,
    prefix_enabled: bool,
) -> Result<Vec<u8>, LensError> {
    let id = id.trim();
    // IDs are stored upper-case
    let normalized = id.to_ascii_uppercase();
    if let Some(primary) = exact(store, ids_collection, &normalized)? {
        return Ok(primary);
    }
    if prefix_enabled && normalized.len() < FULL_ID_LEN {
        if let Some(primary) = by_prefix(store, ids_collection, &normalized)? {
            return Ok(primary);
        }
    }
    Err(LensError::RecordNotFound(id.to_string()))
}
