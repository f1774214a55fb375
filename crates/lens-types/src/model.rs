//! Caller-declared index model definitions.
//!
//! The tracking engine never inspects domain types itself. Everything the
//! health check knows about an index model comes from one of these.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::identifier::resolve;

/// How an observed model relates to the index model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ObserverKind {
    /// The base model itself
    #[default]
    Base,
    /// A related model whose changes trigger a rebuild
    Embedded,
}

impl ObserverKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObserverKind::Base => "base",
            ObserverKind::Embedded => "embedded",
        }
    }
}

/// A model whose changes are observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObserverDefinition {
    pub model: String,
    #[serde(default)]
    pub kind: ObserverKind,
}

/// Declaration of one index model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexModelDefinition {
    /// Fully-qualified index type name
    pub index_model: String,

    /// Fully-qualified base type; derived from the namespace mapping if absent
    #[serde(default)]
    pub base_model: Option<String>,

    /// Declared field map: field name -> field type
    #[serde(default)]
    pub fields: BTreeMap<String, String>,

    #[serde(default)]
    pub observers: Vec<ObserverDefinition>,

    #[serde(default = "default_observe_base")]
    pub observe_base: bool,
}

fn default_observe_base() -> bool {
    true
}

impl IndexModelDefinition {
    pub fn new(index_model: impl Into<String>) -> Self {
        Self {
            index_model: index_model.into(),
            base_model: None,
            fields: BTreeMap::new(),
            observers: Vec::new(),
            observe_base: true,
        }
    }

    pub fn with_base_model(mut self, base_model: impl Into<String>) -> Self {
        self.base_model = Some(base_model.into());
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, field_type: impl Into<String>) -> Self {
        self.fields.insert(name.into(), field_type.into());
        self
    }

    pub fn with_observer(mut self, model: impl Into<String>, kind: ObserverKind) -> Self {
        self.observers.push(ObserverDefinition {
            model: model.into(),
            kind,
        });
        self
    }

    /// Resolved identifier of the index type.
    pub fn identifier(&self) -> String {
        resolve(&self.index_model)
    }
}
