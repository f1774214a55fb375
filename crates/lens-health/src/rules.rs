//! Config rules evaluated by the health check.
//!
//! Rules are opaque predicates over an index model's definition. Each one
//! yields at most one finding, at critical or warning level.

use lens_types::IndexModelDefinition;
use serde::Serialize;

/// Level of a config finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingLevel {
    Critical,
    Warning,
}

/// One config problem or recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigFinding {
    pub level: FindingLevel,
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub help: Vec<String>,
}

impl ConfigFinding {
    pub fn critical(name: impl Into<String>) -> Self {
        Self {
            level: FindingLevel::Critical,
            name: name.into(),
            help: Vec::new(),
        }
    }

    pub fn warning(name: impl Into<String>) -> Self {
        Self {
            level: FindingLevel::Warning,
            name: name.into(),
            help: Vec::new(),
        }
    }

    pub fn with_help(mut self, line: impl Into<String>) -> Self {
        self.help.push(line.into());
        self
    }
}

/// What a rule gets to look at.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub identifier: &'a str,
    pub definition: &'a IndexModelDefinition,
    /// Base type, when it resolved
    pub base_model: Option<&'a str>,
    /// Whether the base type is registered
    pub base_exists: bool,
}

/// A config consistency check.
pub trait ConfigRule: Send + Sync {
    fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<ConfigFinding>;
}

/// Rule built from a closure.
pub struct PredicateRule<F> {
    check: F,
}

impl<F> PredicateRule<F>
where
    F: Fn(&RuleContext<'_>) -> Option<ConfigFinding> + Send + Sync,
{
    pub fn new(check: F) -> Self {
        Self { check }
    }
}

impl<F> ConfigRule for PredicateRule<F>
where
    F: Fn(&RuleContext<'_>) -> Option<ConfigFinding> + Send + Sync,
{
    fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<ConfigFinding> {
        (self.check)(ctx)
    }
}

struct BaseModelMissing;

impl ConfigRule for BaseModelMissing {
    fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<ConfigFinding> {
        match ctx.base_model {
            None => Some(
                ConfigFinding::critical("Base model could not be resolved")
                    .with_help("Set base_model on the index model or add a namespace mapping"),
            ),
            Some(base) if !ctx.base_exists => Some(
                ConfigFinding::critical(format!("Base model {} is not registered", base))
                    .with_help("Register the base type with the model registry"),
            ),
            Some(_) => None,
        }
    }
}

struct FieldMapMissing;

impl ConfigRule for FieldMapMissing {
    fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<ConfigFinding> {
        ctx.definition.fields.is_empty().then(|| {
            ConfigFinding::warning("No field map declared")
                .with_help("Without a field map every base attribute is indexed as-is")
        })
    }
}

struct NothingObserved;

impl ConfigRule for NothingObserved {
    fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<ConfigFinding> {
        (!ctx.definition.observe_base && ctx.definition.observers.is_empty()).then(|| {
            ConfigFinding::warning("No models are observed")
                .with_help("Builds only happen on an explicit rebuild")
        })
    }
}

/// Built-in rules: missing base model (critical), missing field map and
/// nothing observed (warnings).
pub fn default_rules() -> Vec<Box<dyn ConfigRule>> {
    vec![
        Box::new(BaseModelMissing),
        Box::new(FieldMapMissing),
        Box::new(NothingObserved),
    ]
}
