//! Total ordering of fragments from their `before`/`after` rules.
//!
//! The sort is a pure, environment-independent precomputation: it looks only
//! at fragment identities and rules, never at live environment values.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{ConfigError, ResidualGraph, Result};
use crate::fragment::ConfigFragment;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelativeOrder {
    Before,
    After,
    Undefined,
}

/// Where `fragment` wants to sit relative to `other`, judged from
/// `fragment`'s own rules.
///
/// Each rule is scored by how specifically it matches `other`; the best
/// `before` score competes with the best `after` score. Equal non-trivial
/// scores are a contradiction — the fragment demands both directions with
/// equal force. Equal trivial (all-wildcard) scores cancel out instead:
/// `before: '*'` plus `after: '*'` expresses no preference about any one
/// fragment.
pub fn relative_order(fragment: &ConfigFragment, other: &ConfigFragment) -> Result<RelativeOrder> {
    let best = |rules: &[crate::fragment::FragmentMatcher]| {
        rules
            .iter()
            .filter_map(|rule| rule.specificity(other))
            .max()
    };

    let before = best(&fragment.before);
    let after = best(&fragment.after);

    Ok(match (before, after) {
        (None, None) => RelativeOrder::Undefined,
        (Some(_), None) => RelativeOrder::Before,
        (None, Some(_)) => RelativeOrder::After,
        (Some(b), Some(a)) if b > a => RelativeOrder::Before,
        (Some(b), Some(a)) if a > b => RelativeOrder::After,
        (Some(score), Some(_)) => {
            if score == 0 {
                RelativeOrder::Undefined
            } else {
                return Err(ConfigError::ContradictoryOrder {
                    fragment: fragment.id(),
                    other: other.id(),
                });
            }
        }
    })
}

/// Sort fragments into processing order (highest priority first).
///
/// Builds the directed constraint graph — an edge `i → j` meaning `i` is
/// processed before `j`, derived from explicit `before` rules and the
/// inverse of `after` rules — and runs a topological sort. Ties break by
/// load order, so the result is deterministic. A cycle aborts the sort and
/// surfaces the residual subgraph; no partial ordering is ever produced.
pub fn sort_fragments(fragments: Vec<ConfigFragment>) -> Result<Vec<ConfigFragment>> {
    let n = fragments.len();
    let mut edges: BTreeSet<(usize, usize)> = BTreeSet::new();

    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            match relative_order(&fragments[i], &fragments[j])? {
                RelativeOrder::Before => {
                    edges.insert((i, j));
                }
                RelativeOrder::After => {
                    edges.insert((j, i));
                }
                RelativeOrder::Undefined => {}
            }
        }
    }

    // Kahn's algorithm, always taking the lowest-index available root.
    let mut in_degree = vec![0usize; n];
    for &(_, to) in &edges {
        in_degree[to] += 1;
    }

    let mut ready: BTreeSet<usize> = (0..n).filter(|&idx| in_degree[idx] == 0).collect();
    let mut order = Vec::with_capacity(n);

    while let Some(&next) = ready.iter().next() {
        ready.remove(&next);
        order.push(next);
        for &(from, to) in &edges {
            if from == next {
                in_degree[to] -= 1;
                if in_degree[to] == 0 {
                    ready.insert(to);
                }
            }
        }
    }

    if order.len() != n {
        let placed: BTreeSet<usize> = order.iter().copied().collect();
        let residual_nodes: Vec<usize> = (0..n).filter(|idx| !placed.contains(idx)).collect();
        let residual = ResidualGraph {
            nodes: residual_nodes
                .iter()
                .map(|&idx| fragments[idx].id())
                .collect(),
            edges: edges
                .iter()
                .filter(|(from, to)| !placed.contains(from) && !placed.contains(to))
                .map(|&(from, to)| (fragments[from].id(), fragments[to].id()))
                .collect(),
        };
        return Err(ConfigError::Cycle { residual });
    }

    let mut by_index: BTreeMap<usize, ConfigFragment> =
        fragments.into_iter().enumerate().collect();
    Ok(order
        .into_iter()
        .map(|idx| by_index.remove(&idx).expect("index placed exactly once"))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::FragmentMatcher;
    use pretty_assertions::assert_eq;
    use serde_json::Value;

    fn fragment(module: &str, file: &str, name: &str) -> ConfigFragment {
        ConfigFragment {
            module: module.to_string(),
            file: file.to_string(),
            name: name.to_string(),
            payload: Value::Null,
            before: Vec::new(),
            after: Vec::new(),
            only: None,
            except: None,
        }
    }

    fn named(name: &str) -> ConfigFragment {
        fragment("app", "config", name)
    }

    fn ids(fragments: &[ConfigFragment]) -> Vec<String> {
        fragments.iter().map(|f| f.name.clone()).collect()
    }

    #[test]
    fn after_rule_orders_pair() {
        // F1 { name: a, after: #b }, F2 { name: b } => [b, a]
        let mut a = named("a");
        a.after.push(FragmentMatcher::parse("#b"));
        let b = named("b");

        let sorted = sort_fragments(vec![a, b]).unwrap();
        assert_eq!(ids(&sorted), vec!["b", "a"]);
    }

    #[test]
    fn before_rule_orders_pair() {
        let mut a = named("a");
        a.before.push(FragmentMatcher::parse("#b"));
        let b = named("b");

        let sorted = sort_fragments(vec![b, a]).unwrap();
        assert_eq!(ids(&sorted), vec!["a", "b"]);
    }

    #[test]
    fn unconstrained_fragments_keep_load_order() {
        let sorted = sort_fragments(vec![named("x"), named("y"), named("z")]).unwrap();
        assert_eq!(ids(&sorted), vec!["x", "y", "z"]);
    }

    #[test]
    fn every_definite_constraint_is_satisfied() {
        let mut routes = named("routes");
        routes.after.push(FragmentMatcher::parse("#base"));
        let mut admin = named("admin");
        admin.after.push(FragmentMatcher::parse("#routes"));
        let base = named("base");

        let sorted = sort_fragments(vec![admin, routes, base]).unwrap();
        let order = ids(&sorted);
        let pos = |name: &str| order.iter().position(|n| n == name).unwrap();
        assert!(pos("base") < pos("routes"));
        assert!(pos("routes") < pos("admin"));
    }

    #[test]
    fn specificity_breaks_rule_ties() {
        // `b` loses to the specific `before` even though a wildcard `after`
        // also matches.
        let mut a = named("a");
        a.before.push(FragmentMatcher::parse("app/config#b"));
        a.after.push(FragmentMatcher::parse("*"));
        let b = named("b");

        let sorted = sort_fragments(vec![b, a]).unwrap();
        assert_eq!(ids(&sorted), vec!["a", "b"]);
    }

    #[test]
    fn wildcard_before_and_after_cancel_out() {
        let mut a = named("a");
        a.before.push(FragmentMatcher::parse("*"));
        a.after.push(FragmentMatcher::parse("*"));
        let b = named("b");

        let sorted = sort_fragments(vec![a, b]).unwrap();
        assert_eq!(ids(&sorted).len(), 2);
    }

    #[test]
    fn equal_specific_rules_are_a_contradiction() {
        let mut a = named("a");
        a.before.push(FragmentMatcher::parse("#b"));
        a.after.push(FragmentMatcher::parse("#b"));
        let b = named("b");

        let err = sort_fragments(vec![a, b]).unwrap_err();
        match err {
            ConfigError::ContradictoryOrder { fragment, other } => {
                assert_eq!(fragment, "app/config#a");
                assert_eq!(other, "app/config#b");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn cycle_reports_residual_graph() {
        let mut a = named("a");
        a.before.push(FragmentMatcher::parse("#b"));
        let mut b = named("b");
        b.before.push(FragmentMatcher::parse("#a"));
        let free = named("free");

        let err = sort_fragments(vec![a, b, free]).unwrap_err();
        match err {
            ConfigError::Cycle { residual } => {
                assert_eq!(
                    residual.nodes,
                    vec!["app/config#a".to_string(), "app/config#b".to_string()]
                );
                assert!(residual
                    .edges
                    .contains(&("app/config#a".into(), "app/config#b".into())));
                assert!(residual
                    .edges
                    .contains(&("app/config#b".into(), "app/config#a".into())));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn after_everything_sorts_last() {
        let mut last = named("catchall");
        last.after.push(FragmentMatcher::parse("*"));
        let x = named("x");
        let y = named("y");

        let sorted = sort_fragments(vec![last, x, y]).unwrap();
        assert_eq!(ids(&sorted), vec!["x", "y", "catchall"]);
    }
}
