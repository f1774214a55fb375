//! Conversion from build records to the domain objects they audit.

use lens_types::BuildRecord;

/// Loads the domain object a build record points at.
pub trait BaseResolver {
    type Base;

    /// `None` when the object no longer exists.
    fn resolve(&self, model: &str, model_id: &str) -> Option<Self::Base>;
}

/// Paired domain objects for `records`, skipping ones whose base is gone.
pub fn as_base<R: BaseResolver>(records: &[BuildRecord], resolver: &R) -> Vec<R::Base> {
    records
        .iter()
        .filter_map(|record| resolver.resolve(&record.model, &record.model_id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Users(HashMap<String, String>);

    impl BaseResolver for Users {
        type Base = String;

        fn resolve(&self, model: &str, model_id: &str) -> Option<String> {
            if model != "App\\Models\\User" {
                return None;
            }
            self.0.get(model_id).cloned()
        }
    }

    #[test]
    fn test_as_base_drops_missing() {
        let users = Users(HashMap::from([("1".to_string(), "ada".to_string())]));
        let records = vec![
            BuildRecord::new("indexed_user", "1", "App\\Models\\User"),
            BuildRecord::new("indexed_user", "2", "App\\Models\\User"),
        ];
        assert_eq!(as_base(&records, &users), vec!["ada".to_string()]);
    }
}
