//! Variant resolution: which fragments apply right now, and the merged
//! configuration they produce.
//!
//! Conditional evaluation is two-phase, mirroring the two kinds of
//! predicate:
//!
//! 1. **Prefilter** (build time): static `classexists`/`moduleexists`
//!    checks. A fragment that fails can never apply in this build and is
//!    removed before sorting, so it never appears in any cached artifact.
//! 2. **Variant filter** (request time): environment/env-var/constant
//!    checks against the current [`Environment`]. The values of every
//!    referenced fact are folded into the [`CacheKey`] variant key; the
//!    merged configuration is rebuilt only when that key changes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strata_cache::CacheKey;
use strata_core::NameKey;

use crate::fragment::ConfigFragment;
use crate::merge::deep_merge;
use crate::predicate::{Environment, StaticContext, VariantKeyEntry, VariantKeySpec};

/// Drop fragments that can never apply in this build, and strip predicate
/// clauses the static checks have fully decided.
///
/// After this pass every surviving fragment's `only`/`except` contains
/// variant predicates only. Runs before sorting so impossible fragments
/// never constrain the order.
pub fn prefilter(fragments: Vec<ConfigFragment>, ctx: &dyn StaticContext) -> Vec<ConfigFragment> {
    let mut kept = Vec::with_capacity(fragments.len());

    for mut fragment in fragments {
        if let Some(only) = fragment.only.take() {
            // `only` fails closed: every static predicate must hold.
            if !only.statics.iter().all(|p| p.holds(ctx)) {
                tracing::debug!(
                    target = "strata.config",
                    fragment = %fragment.id(),
                    "dropped by static only-check"
                );
                continue;
            }
            if !only.variants.is_empty() {
                fragment.only = Some(crate::predicate::PredicateSet {
                    statics: Vec::new(),
                    variants: only.variants,
                });
            }
        }

        if let Some(except) = fragment.except.take() {
            let statics_hold = except.statics.iter().all(|p| p.holds(ctx));
            if statics_hold {
                if except.variants.is_empty() && !except.is_empty() {
                    // The exclusion is already certain.
                    tracing::debug!(
                        target = "strata.config",
                        fragment = %fragment.id(),
                        "dropped by static except-check"
                    );
                    continue;
                }
                if !except.variants.is_empty() {
                    fragment.except = Some(crate::predicate::PredicateSet {
                        statics: Vec::new(),
                        variants: except.variants,
                    });
                }
            }
            // A failed static part means the exception can never trigger;
            // the clause is dropped entirely.
        }

        kept.push(fragment);
    }

    kept
}

/// True if the fragment applies under `env`. Only variant predicates remain
/// after the prefilter: `only` fails closed, `except` fails open.
fn applies(fragment: &ConfigFragment, env: &Environment) -> bool {
    if let Some(only) = &fragment.only {
        if !only.variants.iter().all(|p| p.holds(env)) {
            return false;
        }
    }
    if let Some(except) = &fragment.except {
        if !except.variants.is_empty() && except.variants.iter().all(|p| p.holds(env)) {
            return false;
        }
    }
    true
}

/// The final class → property → value tree for one variant.
///
/// Class keys are stored lower-cased so lookups are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergedConfig {
    classes: BTreeMap<String, Value>,
}

impl MergedConfig {
    pub fn get(&self, type_name: &str, property: &str) -> Option<&Value> {
        self.classes
            .get(NameKey::new(type_name).as_str())?
            .get(property)
    }

    pub fn class(&self, type_name: &str) -> Option<&Value> {
        self.classes.get(NameKey::new(type_name).as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn classes(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.classes.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Static configuration defaults per type, the lowest-priority layer.
pub type TypeDefaults = BTreeMap<NameKey, BTreeMap<String, Value>>;

/// Owns the merged configuration for the currently active variant.
///
/// Holds the prefiltered, sorted fragment list (environment-independent)
/// and rebuilds [`MergedConfig`] only when the computed variant key differs
/// from the one it was last built for. History of prior variants is not
/// retained here — that is the cache store's job.
#[derive(Debug, Clone)]
pub struct VariantResolver {
    fragments: Vec<ConfigFragment>,
    key_spec: VariantKeySpec,
    current: Option<(CacheKey, MergedConfig)>,
}

impl VariantResolver {
    /// `fragments` must already be prefiltered and sorted.
    pub fn new(fragments: Vec<ConfigFragment>) -> Self {
        let key_spec = VariantKeySpec::collect(
            fragments
                .iter()
                .flat_map(|f| f.only.iter().chain(f.except.iter()))
                .flat_map(|set| set.variants.iter()),
        );
        Self {
            fragments,
            key_spec,
            current: None,
        }
    }

    pub fn fragments(&self) -> &[ConfigFragment] {
        &self.fragments
    }

    pub fn key_spec(&self) -> &VariantKeySpec {
        &self.key_spec
    }

    /// Deterministic hash of the current values of everything the key spec
    /// names. Facts never referenced by any fragment cannot influence it.
    pub fn variant_key(&self, env: &Environment) -> CacheKey {
        let mut hasher = CacheKey::hasher();
        for entry in self.key_spec.entries() {
            hasher = match entry {
                VariantKeyEntry::Environment => {
                    hasher.update("environment").update(env.kind.as_str())
                }
                VariantKeyEntry::EnvVar(name) => hasher
                    .update("envvar")
                    .update(name)
                    .update(env.env_vars.get(name).map(String::as_str).unwrap_or("\0")),
                VariantKeyEntry::Constant(name) => hasher
                    .update("constant")
                    .update(name)
                    .update(env.constants.get(name).map(String::as_str).unwrap_or("\0")),
                VariantKeyEntry::NameValue(name) => hasher.update("value").update(name).update(
                    env.env_vars
                        .get(name)
                        .or_else(|| env.constants.get(name))
                        .map(String::as_str)
                        .unwrap_or("\0"),
                ),
            };
        }
        hasher.finish()
    }

    /// The merged configuration for `env`, rebuilding only on variant
    /// change.
    pub fn merged(&mut self, env: &Environment, defaults: &TypeDefaults) -> &MergedConfig {
        let key = self.variant_key(env);
        let stale = match &self.current {
            Some((current_key, _)) => current_key != &key,
            None => true,
        };
        if stale {
            tracing::debug!(
                target = "strata.config",
                variant = %key,
                "building merged configuration"
            );
            let merged = build_merged(&self.fragments, env, defaults);
            self.current = Some((key, merged));
        }
        &self
            .current
            .as_ref()
            .expect("merged configuration just ensured")
            .1
    }

    /// Adopt a previously cached merged configuration for `key`.
    pub fn restore(&mut self, key: CacheKey, merged: MergedConfig) {
        self.current = Some((key, merged));
    }

    pub fn cached(&self) -> Option<(&CacheKey, &MergedConfig)> {
        self.current.as_ref().map(|(key, merged)| (key, merged))
    }
}

/// Apply every fragment matching `env` in order, highest priority first,
/// then the static type defaults as the lowest layer.
pub fn build_merged(
    fragments: &[ConfigFragment],
    env: &Environment,
    defaults: &TypeDefaults,
) -> MergedConfig {
    let mut classes: BTreeMap<String, Value> = BTreeMap::new();

    for fragment in fragments {
        if !applies(fragment, env) {
            continue;
        }
        let Value::Object(payload) = &fragment.payload else {
            continue;
        };
        for (class, properties) in payload {
            let entry = classes
                .entry(NameKey::new(class).as_str().to_string())
                .or_insert_with(|| Value::Object(serde_json::Map::new()));
            deep_merge(entry, properties);
        }
    }

    for (key, properties) in defaults {
        let incoming = Value::Object(
            properties
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        );
        let entry = classes
            .entry(key.as_str().to_string())
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
        deep_merge(entry, &incoming);
    }

    MergedConfig { classes }
}
