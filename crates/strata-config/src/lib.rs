//! Layered configuration: fragment loading, ordering, and variant
//! resolution.
//!
//! Configuration arrives as YAML fragment files scattered across modules.
//! Loading produces immutable [`ConfigFragment`]s; a build-time pipeline
//! prefilters (static predicates) and sorts them (ordering rules); request
//! time picks the applicable subset for the current [`Environment`] and
//! deep-merges it into a [`MergedConfig`], cached per variant key.

mod error;
mod fragment;
mod loader;
mod merge;
mod predicate;
mod sort;
mod variant;

pub use error::{ConfigError, ResidualGraph, Result};
pub use fragment::{ConfigFragment, FragmentMatcher, WILDCARD};
pub use loader::load_fragment_file;
pub use merge::deep_merge;
pub use predicate::{
    EnvKind, Environment, PredicateSet, StaticContext, StaticPredicate, VariantKeyEntry,
    VariantKeySpec, VariantPredicate,
};
pub use sort::{relative_order, sort_fragments, RelativeOrder};
pub use variant::{build_merged, prefilter, MergedConfig, TypeDefaults, VariantResolver};

#[cfg(test)]
mod pipeline_tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeSet;

    struct Statics {
        modules: BTreeSet<String>,
    }

    impl StaticContext for Statics {
        fn class_exists(&self, _name: &str) -> bool {
            false
        }
        fn module_exists(&self, name: &str) -> bool {
            self.modules.contains(name)
        }
    }

    /// The end-to-end shape: `F1 { name: a, after: #b }` and `F2 { name: b }`
    /// sort to `[F2, F1]`; `F3 { only: { moduleexists: missing } }` is
    /// dropped during the prefilter and never appears anywhere.
    #[test]
    fn prefilter_then_sort_end_to_end() {
        let f1 = load_fragment_file("app", "one", "---\nname: a\nafter: '#b'\n---\nX: {a: 1}\n")
            .unwrap();
        let f2 = load_fragment_file("app", "two", "---\nname: b\n---\nX: {b: 2}\n").unwrap();
        let f3 = load_fragment_file(
            "app",
            "three",
            "---\nname: c\nonly:\n  moduleexists: missing\n---\nX: {c: 3}\n",
        )
        .unwrap();

        let all: Vec<ConfigFragment> = f1.into_iter().chain(f2).chain(f3).collect();
        let ctx = Statics {
            modules: BTreeSet::from(["app".to_string()]),
        };
        let sorted = sort_fragments(prefilter(all, &ctx)).unwrap();

        let names: Vec<&str> = sorted.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);

        let mut resolver = VariantResolver::new(sorted);
        let merged = resolver.merged(&Environment::new(EnvKind::Live), &TypeDefaults::new());
        assert_eq!(merged.get("X", "a"), Some(&json!(1)));
        assert_eq!(merged.get("X", "b"), Some(&json!(2)));
        assert_eq!(merged.get("X", "c"), None);
    }
}
