//! Key encoding and decoding for storage layer.
//!
//! - Build records: `build:{index_model}:{model_id}`
//! - Migration records: `migration:{index_model}:{ulid}`
//!
//! Index-model identifiers never contain `:`, so `{prefix}:{index_model}:`
//! scopes a prefix scan to one index model even when model IDs do.
//! ULIDs sort by creation time, so migration keys of one index model come
//! back oldest first.

use ulid::Ulid;

use crate::error::StorageError;

/// Key for a build record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildKey {
    pub index_model: String,
    pub model_id: String,
}

impl BuildKey {
    pub fn new(index_model: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            index_model: index_model.into(),
            model_id: model_id.into(),
        }
    }

    /// Encode key to bytes for storage
    pub fn to_bytes(&self) -> Vec<u8> {
        format!("build:{}:{}", self.index_model, self.model_id).into_bytes()
    }

    /// Decode key from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StorageError> {
        let s = std::str::from_utf8(bytes)
            .map_err(|e| StorageError::Key(format!("Invalid UTF-8: {}", e)))?;
        let rest = s
            .strip_prefix("build:")
            .ok_or_else(|| StorageError::Key(format!("Invalid build key format: {}", s)))?;
        // model_id may itself contain ':'
        let (index_model, model_id) = rest
            .split_once(':')
            .ok_or_else(|| StorageError::Key(format!("Invalid build key format: {}", s)))?;
        Ok(Self::new(index_model, model_id))
    }

    /// Prefix covering every build of one index model
    pub fn prefix(index_model: &str) -> Vec<u8> {
        format!("build:{}:", index_model).into_bytes()
    }

    /// Prefix covering every build
    pub fn all() -> Vec<u8> {
        b"build:".to_vec()
    }
}

/// Key for a migration record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationKey {
    pub index_model: String,
    pub ulid: Ulid,
}

impl MigrationKey {
    pub fn new(index_model: impl Into<String>, ulid: Ulid) -> Self {
        Self {
            index_model: index_model.into(),
            ulid,
        }
    }

    /// Create a key from a record ID string (the ULID)
    pub fn from_record_id(index_model: &str, record_id: &str) -> Result<Self, StorageError> {
        let ulid: Ulid = record_id
            .parse()
            .map_err(|e| StorageError::Key(format!("Invalid migration ID ULID: {}", e)))?;
        Ok(Self::new(index_model, ulid))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        format!("migration:{}:{}", self.index_model, self.ulid).into_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StorageError> {
        let s = std::str::from_utf8(bytes)
            .map_err(|e| StorageError::Key(format!("Invalid UTF-8: {}", e)))?;
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 3 || parts[0] != "migration" {
            return Err(StorageError::Key(format!(
                "Invalid migration key format: {}",
                s
            )));
        }
        Self::from_record_id(parts[1], parts[2])
    }

    pub fn prefix(index_model: &str) -> Vec<u8> {
        format!("migration:{}:", index_model).into_bytes()
    }

    pub fn all() -> Vec<u8> {
        b"migration:".to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_key_with_colon_in_model_id() {
        let key = BuildKey::new("indexed_user", "tenant:42");
        let decoded = BuildKey::from_bytes(&key.to_bytes()).unwrap();
        assert_eq!(decoded, key);
    }

    #[test]
    fn test_build_prefix_scopes_index_model() {
        let key = BuildKey::new("topic_faq", "1").to_bytes();
        assert!(key.starts_with(&BuildKey::prefix("topic_faq")));
        assert!(!key.starts_with(&BuildKey::prefix("topic")));
    }

    #[test]
    fn test_migration_key_order_follows_creation() {
        let first = MigrationKey::new("indexed_user", Ulid::from_parts(1000, 1));
        let second = MigrationKey::new("indexed_user", Ulid::from_parts(2000, 1));
        assert!(first.to_bytes() < second.to_bytes());
        assert_eq!(MigrationKey::from_bytes(&second.to_bytes()).unwrap(), second);
    }

    #[test]
    fn test_invalid_keys() {
        assert!(BuildKey::from_bytes(b"migration:x:y").is_err());
        assert!(MigrationKey::from_bytes(b"migration:x").is_err());
        assert!(MigrationKey::from_record_id("x", "not-a-ulid").is_err());
    }
}
