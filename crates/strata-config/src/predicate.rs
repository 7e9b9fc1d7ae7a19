//! `only`/`except` predicates and the environment snapshot they evaluate
//! against.
//!
//! Predicates come in two kinds with two evaluation times:
//!
//! - **static** (`classexists`, `moduleexists`): facts of the build itself,
//!   resolved once during the prefilter — class and module existence never
//!   varies per request;
//! - **variant** (`environment`, `envvarset`, `constantdefined`, and the
//!   permissive name=value fallback): live process state, evaluated per
//!   request and captured in the variant key.
//!
//! A clause mixing both kinds contributes each predicate to its own pass.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaticPredicate {
    ClassExists(String),
    ModuleExists(String),
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantPredicate {
    /// Environment classification is `dev`, `test` or `live`.
    Environment(String),
    /// The named environment variable is set (to anything).
    EnvVarSet(String),
    /// The named constant is defined (to anything).
    ConstantDefined(String),
    /// Permissive fallback for unknown predicate keys: the named env-var or
    /// constant currently holds exactly this value.
    ValueEquals { name: String, value: String },
}

/// The predicates of one `only:` or `except:` clause, split by kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredicateSet {
    pub statics: Vec<StaticPredicate>,
    pub variants: Vec<VariantPredicate>,
}

impl PredicateSet {
    /// Build from a parsed YAML mapping. Keys are compared lower-cased;
    /// list values expand to one predicate per item.
    pub fn from_value(value: &Value) -> Self {
        let mut set = PredicateSet::default();
        let Value::Object(map) = value else {
            return set;
        };

        for (key, raw) in map {
            let kind = key.to_lowercase();
            for item in scalar_items(raw) {
                match kind.as_str() {
                    "classexists" => set.statics.push(StaticPredicate::ClassExists(item)),
                    "moduleexists" => set.statics.push(StaticPredicate::ModuleExists(item)),
                    "environment" => set.variants.push(VariantPredicate::Environment(item)),
                    "envvarset" => set.variants.push(VariantPredicate::EnvVarSet(item)),
                    "constantdefined" => {
                        set.variants.push(VariantPredicate::ConstantDefined(item))
                    }
                    // The fallback keeps the key's original casing: env-var
                    // and constant names are case-sensitive.
                    _ => set.variants.push(VariantPredicate::ValueEquals {
                        name: key.clone(),
                        value: item,
                    }),
                }
            }
        }
        set
    }

    pub fn is_empty(&self) -> bool {
        self.statics.is_empty() && self.variants.is_empty()
    }
}

fn scalar_items(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().flat_map(scalar_items).collect(),
        Value::String(s) => vec![s.clone()],
        Value::Bool(b) => vec![b.to_string()],
        Value::Number(n) => vec![n.to_string()],
        Value::Null => vec![String::new()],
        Value::Object(_) => Vec::new(),
    }
}

/// Static build facts a prefilter evaluates against.
pub trait StaticContext {
    fn class_exists(&self, name: &str) -> bool;
    fn module_exists(&self, name: &str) -> bool;
}

impl StaticPredicate {
    pub fn holds(&self, ctx: &dyn StaticContext) -> bool {
        match self {
            StaticPredicate::ClassExists(name) => ctx.class_exists(name),
            StaticPredicate::ModuleExists(name) => ctx.module_exists(name),
        }
    }
}

/// Environment classification of the running process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvKind {
    Dev,
    Test,
    Live,
}

impl EnvKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EnvKind::Dev => "dev",
            EnvKind::Test => "test",
            EnvKind::Live => "live",
        }
    }
}

/// An explicit snapshot of the process state variant predicates read.
///
/// Built once per request and passed in — never read ambiently — so tests
/// and embedders control exactly what the resolver sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    pub kind: EnvKind,
    pub env_vars: BTreeMap<String, String>,
    pub constants: BTreeMap<String, String>,
}

impl Environment {
    pub fn new(kind: EnvKind) -> Self {
        Self {
            kind,
            env_vars: BTreeMap::new(),
            constants: BTreeMap::new(),
        }
    }

    /// Snapshot the real process environment. The classification comes from
    /// `STRATA_ENV` (defaulting to `live`, the conservative choice).
    pub fn from_process() -> Self {
        let env_vars: BTreeMap<String, String> = std::env::vars().collect();
        let kind = match env_vars.get("STRATA_ENV").map(String::as_str) {
            Some("dev") => EnvKind::Dev,
            Some("test") => EnvKind::Test,
            _ => EnvKind::Live,
        };
        Self {
            kind,
            env_vars,
            constants: BTreeMap::new(),
        }
    }

    pub fn with_env_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(name.into(), value.into());
        self
    }

    pub fn with_constant(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.constants.insert(name.into(), value.into());
        self
    }

    fn lookup(&self, name: &str) -> Option<&str> {
        self.env_vars
            .get(name)
            .or_else(|| self.constants.get(name))
            .map(String::as_str)
    }
}

impl VariantPredicate {
    pub fn holds(&self, env: &Environment) -> bool {
        match self {
            VariantPredicate::Environment(name) => name.eq_ignore_ascii_case(env.kind.as_str()),
            VariantPredicate::EnvVarSet(name) => env.env_vars.contains_key(name),
            VariantPredicate::ConstantDefined(name) => env.constants.contains_key(name),
            VariantPredicate::ValueEquals { name, value } => {
                env.lookup(name).is_some_and(|current| current == value)
            }
        }
    }
}

/// One entry of the variant key: a single environment-dependent fact some
/// loaded fragment references.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VariantKeyEntry {
    Environment,
    EnvVar(String),
    Constant(String),
    NameValue(String),
}

/// The set of environment-dependent facts any loaded fragment references.
///
/// Computed once per fragment set, independent of current values; the
/// variant *key* is this spec evaluated against a live [`Environment`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantKeySpec {
    entries: BTreeSet<VariantKeyEntry>,
}

impl VariantKeySpec {
    pub fn collect<'a>(predicates: impl Iterator<Item = &'a VariantPredicate>) -> Self {
        let mut entries = BTreeSet::new();
        for predicate in predicates {
            match predicate {
                VariantPredicate::Environment(_) => {
                    entries.insert(VariantKeyEntry::Environment);
                }
                VariantPredicate::EnvVarSet(name) => {
                    entries.insert(VariantKeyEntry::EnvVar(name.clone()));
                }
                VariantPredicate::ConstantDefined(name) => {
                    entries.insert(VariantKeyEntry::Constant(name.clone()));
                }
                VariantPredicate::ValueEquals { name, .. } => {
                    entries.insert(VariantKeyEntry::NameValue(name.clone()));
                }
            }
        }
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &VariantKeyEntry> {
        self.entries.iter()
    }
}
