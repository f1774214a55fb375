//! Model registry and name qualification.
//!
//! Which domain types exist is declared up front, never probed at runtime.
//! A bare name like `User` is qualified by trying every configured model
//! namespace; more than one hit is reported, not guessed.

use std::collections::{BTreeMap, BTreeSet};

use lens_types::{
    is_qualified, namespace_segments, simple_name, IndexModelDefinition, LensError,
    NamespaceMapping, Settings,
};
use tracing::warn;

/// Result of qualifying a model name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Qualification {
    /// Exactly one registered type matched
    Unique(String),
    /// Several types matched; the caller must pick one
    Ambiguous(Vec<String>),
    /// Nothing matched; lists every candidate that was tried
    NotFound(Vec<String>),
}

impl Qualification {
    /// The single match, or the matching error.
    pub fn into_unique(self, name: &str) -> Result<String, LensError> {
        match self {
            Qualification::Unique(qualified) => Ok(qualified),
            Qualification::Ambiguous(matches) => Err(LensError::AmbiguousIdentifier {
                name: name.to_string(),
                matches,
            }),
            Qualification::NotFound(tried) => Err(LensError::RecordNotFound(format!(
                "{} (tried: {})",
                name,
                tried.join(", ")
            ))),
        }
    }
}

/// Registry of known types, namespace mappings and index model definitions.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    types: BTreeSet<String>,
    namespaces: Vec<NamespaceMapping>,
    definitions: BTreeMap<String, IndexModelDefinition>,
}

/// `\`-joined canonical form, so `a::b` and `a\b` compare equal.
fn canonical(name: &str) -> String {
    namespace_segments(name).join("\\")
}

fn namespace_of(qualified: &str) -> String {
    let mut segments = namespace_segments(qualified);
    segments.pop();
    segments.join("\\")
}

impl ModelRegistry {
    pub fn new(namespaces: Vec<NamespaceMapping>) -> Self {
        Self {
            namespaces,
            ..Self::default()
        }
    }

    /// Registry holding every index model declared in settings.
    pub fn from_settings(settings: &Settings) -> Result<Self, LensError> {
        let mut registry = Self::new(settings.namespaces.clone());
        for definition in &settings.index_models {
            registry.register(definition.clone())?;
        }
        Ok(registry)
    }

    /// Mark a qualified type as existing.
    pub fn register_type(&mut self, qualified: &str) {
        self.types.insert(canonical(qualified));
    }

    /// Register an index model definition along with the types it names.
    ///
    /// A later definition resolving to the same identifier replaces the
    /// earlier one.
    pub fn register(&mut self, definition: IndexModelDefinition) -> Result<(), LensError> {
        let identifier = definition.identifier();
        lens_types::validate_identifier(&identifier)?;

        self.register_type(&definition.index_model);
        if let Some(base) = self.base_model_for(&definition) {
            self.register_type(&base);
        }
        for observer in &definition.observers {
            self.register_type(&observer.model);
        }

        if let Some(previous) = self.definitions.get(&identifier) {
            if canonical(&previous.index_model) != canonical(&definition.index_model) {
                warn!(
                    identifier = %identifier,
                    previous = %previous.index_model,
                    replacement = %definition.index_model,
                    "Two index models resolve to the same identifier"
                );
            }
        }
        self.definitions.insert(identifier, definition);
        Ok(())
    }

    pub fn contains(&self, qualified: &str) -> bool {
        self.types.contains(&canonical(qualified))
    }

    pub fn namespaces(&self) -> &[NamespaceMapping] {
        &self.namespaces
    }

    /// Qualify a bare or qualified model name.
    pub fn qualify(&self, name: &str) -> Qualification {
        let name = name.trim();
        if is_qualified(name) && self.contains(name) {
            return Qualification::Unique(canonical(name));
        }

        let mut found = Vec::new();
        let mut tried = Vec::new();
        for mapping in &self.namespaces {
            let candidate = canonical(&format!("{}\\{}", mapping.models, name));
            if self.contains(&candidate) {
                if !found.contains(&candidate) {
                    found.push(candidate);
                }
            } else {
                tried.push(candidate);
            }
        }

        match found.len() {
            0 => Qualification::NotFound(tried),
            1 => Qualification::Unique(found.remove(0)),
            _ => Qualification::Ambiguous(found),
        }
    }

    /// Index type paired with a base type: `{index namespace}\Indexed{Name}`.
    pub fn index_model_for(&self, base: &str) -> Option<String> {
        let namespace = namespace_of(base);
        self.namespaces
            .iter()
            .find(|m| canonical(&m.models) == namespace)
            .map(|m| format!("{}\\Indexed{}", canonical(&m.indexes), simple_name(base)))
    }

    /// Base type of an index model: the declared one, else derived from the
    /// namespace mapping by dropping the `Indexed` prefix.
    pub fn base_model_for(&self, definition: &IndexModelDefinition) -> Option<String> {
        if let Some(base) = &definition.base_model {
            return Some(canonical(base));
        }
        let namespace = namespace_of(&definition.index_model);
        let simple = simple_name(&definition.index_model);
        let base_simple = simple.strip_prefix("Indexed").filter(|s| !s.is_empty())?;
        self.namespaces
            .iter()
            .find(|m| canonical(&m.indexes) == namespace)
            .map(|m| format!("{}\\{}", canonical(&m.models), base_simple))
    }

    /// Definition registered under an identifier.
    pub fn definition(&self, identifier: &str) -> Option<&IndexModelDefinition> {
        self.definitions.get(identifier)
    }

    /// Definition whose index type or base type is `qualified`.
    pub fn definition_for(&self, qualified: &str) -> Option<&IndexModelDefinition> {
        let target = canonical(qualified);
        let by_index_type = |index_model: &str| {
            self.definitions
                .values()
                .find(|d| canonical(&d.index_model) == index_model)
        };
        by_index_type(&target)
            .or_else(|| {
                self.index_model_for(&target)
                    .and_then(|index_model| by_index_type(&index_model))
            })
            .or_else(|| {
                self.definitions
                    .values()
                    .find(|d| self.base_model_for(d).as_deref() == Some(target.as_str()))
            })
    }

    /// Identifiers of every registered index model.
    pub fn identifiers(&self) -> impl Iterator<Item = &String> {
        self.definitions.keys()
    }

    /// Identifiers a name can refer to: a registered identifier, an index
    /// type or a base type, either bare or qualified.
    pub fn index_identifiers(&self, name: &str) -> Vec<String> {
        let name = name.trim();
        if self.definitions.contains_key(name) {
            return vec![name.to_string()];
        }

        let target = canonical(name);
        let bare = !is_qualified(name);
        let names_type = |qualified: &str| {
            canonical(qualified) == target || (bare && simple_name(qualified) == name)
        };
        self.definitions
            .iter()
            .filter(|(_, definition)| {
                names_type(&definition.index_model)
                    || self
                        .base_model_for(definition)
                        .is_some_and(|base| names_type(&base))
            })
            .map(|(identifier, _)| identifier.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ModelRegistry {
        let mut registry = ModelRegistry::new(vec![
            NamespaceMapping::new("App\\Models", "App\\Models\\Indexes"),
            NamespaceMapping::new("Modules\\Faq", "Modules\\Faq"),
            NamespaceMapping::new("Modules\\HelpCenter", "Modules\\HelpCenter"),
        ]);
        registry
            .register(IndexModelDefinition::new("App\\Models\\Indexes\\IndexedUser"))
            .unwrap();
        registry
            .register(IndexModelDefinition::new("Modules\\Faq\\IndexedTopic"))
            .unwrap();
        registry
            .register(IndexModelDefinition::new("Modules\\HelpCenter\\IndexedTopic"))
            .unwrap();
        registry
    }

    #[test]
    fn test_index_identifiers() {
        let registry = registry();
        assert_eq!(registry.index_identifiers("IndexedUser"), vec!["indexed_user_indexes"]);
        assert_eq!(registry.index_identifiers("User"), vec!["indexed_user_indexes"]);
        assert_eq!(
            registry.index_identifiers("App::Models::Indexes::IndexedUser"),
            vec!["indexed_user_indexes"]
        );
        assert_eq!(
            registry.index_identifiers("indexed_user_indexes"),
            vec!["indexed_user_indexes"]
        );
        assert_eq!(
            registry.index_identifiers("Topic"),
            vec!["indexed_topic_faq", "indexed_topic_help_center"]
        );
        assert_eq!(
            registry.index_identifiers("Modules\\HelpCenter\\Topic"),
            vec!["indexed_topic_help_center"]
        );
        assert!(registry.index_identifiers("Invoice").is_empty());
    }

    #[test]
    fn test_qualify_unique() {
        let registry = registry();
        assert_eq!(
            registry.qualify("User"),
            Qualification::Unique("App\\Models\\User".to_string())
        );
        assert_eq!(
            registry.qualify("App::Models::User"),
            Qualification::Unique("App\\Models\\User".to_string())
        );
    }

    #[test]
    fn test_qualify_ambiguous() {
        let registry = registry();
        match registry.qualify("Topic") {
            Qualification::Ambiguous(matches) => {
                assert_eq!(
                    matches,
                    vec!["Modules\\Faq\\Topic", "Modules\\HelpCenter\\Topic"]
                );
            }
            other => panic!("expected ambiguous, got {:?}", other),
        }

        let err = registry.qualify("Topic").into_unique("Topic").unwrap_err();
        assert!(matches!(err, LensError::AmbiguousIdentifier { .. }));
    }

    #[test]
    fn test_qualify_not_found_lists_candidates() {
        let registry = registry();
        match registry.qualify("Invoice") {
            Qualification::NotFound(tried) => assert_eq!(tried.len(), 3),
            other => panic!("expected not found, got {:?}", other),
        }
    }

    #[test]
    fn test_index_and_base_pairing() {
        let registry = registry();
        assert_eq!(
            registry.index_model_for("App\\Models\\User").as_deref(),
            Some("App\\Models\\Indexes\\IndexedUser")
        );
        assert_eq!(registry.index_model_for("Other\\User"), None);

        let def = registry.definition("indexed_user_indexes").unwrap();
        assert_eq!(
            registry.base_model_for(def).as_deref(),
            Some("App\\Models\\User")
        );
    }

    #[test]
    fn test_definition_for_base_or_index_type() {
        let registry = registry();
        let by_base = registry.definition_for("Modules\\Faq\\Topic").unwrap();
        assert_eq!(by_base.index_model, "Modules\\Faq\\IndexedTopic");
        assert_eq!(by_base.identifier(), "indexed_topic_faq");
        assert!(registry.definition("indexed_topic_help_center").is_some());

        let by_index = registry
            .definition_for("App\\Models\\Indexes\\IndexedUser")
            .unwrap();
        assert_eq!(by_index.identifier(), "indexed_user_indexes");
        assert!(registry.definition_for("App\\Models\\Invoice").is_none());
    }
}
