//! Fragment data model.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::predicate::PredicateSet;

pub const WILDCARD: &str = "*";

/// Matches other fragments by `(module, file, name)`, each part a literal or
/// the wildcard `*`. Written in rules as `module/file#name` with missing
/// parts defaulting to the wildcard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentMatcher {
    pub module: String,
    pub file: String,
    pub name: String,
}

impl Default for FragmentMatcher {
    fn default() -> Self {
        Self {
            module: WILDCARD.to_string(),
            file: WILDCARD.to_string(),
            name: WILDCARD.to_string(),
        }
    }
}

impl FragmentMatcher {
    /// Parse one rule string.
    ///
    /// `framework/routes#core` names all three parts; `framework/*` any
    /// fragment of the module; `#core` any fragment named `core`; a bare
    /// segment is a module name.
    pub fn parse(rule: &str) -> Self {
        let rule = rule.trim();
        let (path, name) = match rule.split_once('#') {
            Some((path, name)) => (path, name.trim()),
            None => (rule, WILDCARD),
        };
        let (module, file) = match path.split_once('/') {
            Some((module, file)) => (module.trim(), file.trim()),
            None => (path.trim(), WILDCARD),
        };

        let part = |raw: &str| {
            if raw.is_empty() {
                WILDCARD.to_string()
            } else {
                raw.to_string()
            }
        };
        Self {
            module: part(module),
            file: part(file),
            name: part(name),
        }
    }

    /// How specifically this matcher matches `fragment`.
    ///
    /// Wildcard parts contribute 0 and exact (case-insensitive) matches 1
    /// each; any explicit non-matching part disqualifies the matcher
    /// entirely.
    pub fn specificity(&self, fragment: &ConfigFragment) -> Option<u32> {
        let mut score = 0;
        for (part, target) in [
            (&self.module, &fragment.module),
            (&self.file, &fragment.file),
            (&self.name, &fragment.name),
        ] {
            if part == WILDCARD {
                continue;
            }
            if part.eq_ignore_ascii_case(target) {
                score += 1;
            } else {
                return None;
            }
        }
        Some(score)
    }
}

impl fmt::Display for FragmentMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.module, self.file, self.name)
    }
}

/// One named, conditionally-applicable unit of configuration payload.
///
/// Fragments are immutable once loaded; ordering is a property of the whole
/// set (see the sorter), not of an individual fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigFragment {
    /// Name of the module the fragment file belongs to.
    pub module: String,
    /// Fragment file stem within the module's config directory.
    pub file: String,
    /// Header `name`, or a synthesized `anonymous-N`.
    pub name: String,
    /// The configuration tree: class → property → value.
    pub payload: Value,
    pub before: Vec<FragmentMatcher>,
    pub after: Vec<FragmentMatcher>,
    pub only: Option<PredicateSet>,
    pub except: Option<PredicateSet>,
}

impl ConfigFragment {
    /// `module/file#name`, the identity used in errors and diagnostics.
    pub fn id(&self) -> String {
        format!("{}/{}#{}", self.module, self.file, self.name)
    }
}
