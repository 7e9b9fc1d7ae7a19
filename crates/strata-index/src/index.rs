//! The derived type index and its builder.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strata_core::NameKey;

use crate::error::{IndexError, Result};
use crate::facts::{FileFacts, TypeKind};

/// One indexed type: original-case name plus where it was declared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeEntry {
    pub name: String,
    pub path: String,
}

/// The whole-tree index derived from every file's [`FileFacts`].
///
/// All maps are keyed case-insensitively. The structure is deterministic:
/// builders feed files in sorted-path order and every derived list is
/// sorted, so two builds over the same tree are byte-identical regardless of
/// discovery order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeIndex {
    pub classes: BTreeMap<NameKey, TypeEntry>,
    pub interfaces: BTreeMap<NameKey, TypeEntry>,
    /// Direct subtypes per supertype (class `extends` plus interface
    /// parent edges).
    pub children: BTreeMap<NameKey, Vec<String>>,
    /// All transitive subtypes per supertype; always the closure of
    /// [`TypeIndex::children`].
    pub descendants: BTreeMap<NameKey, Vec<String>>,
    /// Classes directly declaring each interface.
    pub implementors: BTreeMap<NameKey, Vec<String>>,
    /// Static configuration defaults per type.
    pub defaults: BTreeMap<NameKey, BTreeMap<String, Value>>,
}

impl TypeIndex {
    /// Source path for a class or interface, case-insensitive.
    pub fn path_for_type(&self, name: &str) -> Option<&str> {
        let key = NameKey::new(name);
        self.classes
            .get(key.as_str())
            .or_else(|| self.interfaces.get(key.as_str()))
            .map(|entry| entry.path.as_str())
    }

    pub fn descendants_of(&self, name: &str) -> &[String] {
        self.descendants
            .get(NameKey::new(name).as_str())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn implementors_of(&self, name: &str) -> &[String] {
        self.implementors
            .get(NameKey::new(name).as_str())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn defaults_of(&self, name: &str) -> Option<&BTreeMap<String, Value>> {
        self.defaults.get(NameKey::new(name).as_str())
    }

    /// True if `name` is a known class or interface.
    pub fn has_type(&self, name: &str) -> bool {
        let key = NameKey::new(name);
        self.classes.contains_key(key.as_str()) || self.interfaces.contains_key(key.as_str())
    }
}

/// Accumulates [`FileFacts`] into a [`TypeIndex`].
///
/// Call [`TypeIndexBuilder::add_file`] once per file — in sorted-path order
/// for deterministic output — then [`TypeIndexBuilder::finish`] to derive
/// the descendants closure.
#[derive(Debug, Default)]
pub struct TypeIndexBuilder {
    index: TypeIndex,
}

impl TypeIndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, facts: &FileFacts) -> Result<()> {
        for record in &facts.records {
            let key = NameKey::new(&record.qualified_name);
            let entry = TypeEntry {
                name: record.qualified_name.clone(),
                path: facts.path.clone(),
            };

            let target = match record.kind {
                TypeKind::Class => &mut self.index.classes,
                TypeKind::Interface => &mut self.index.interfaces,
            };
            if let Some(existing) = target.get(key.as_str()) {
                return Err(IndexError::DuplicateType {
                    name: record.qualified_name.clone(),
                    first: existing.path.clone(),
                    second: facts.path.clone(),
                });
            }
            target.insert(key.clone(), entry);

            if let Some(superclass) = &record.superclass {
                self.index
                    .children
                    .entry(NameKey::new(superclass))
                    .or_default()
                    .push(record.qualified_name.clone());
            }
            for parent in &record.interfaces {
                match record.kind {
                    TypeKind::Class => {
                        self.index
                            .implementors
                            .entry(NameKey::new(parent))
                            .or_default()
                            .push(record.qualified_name.clone());
                    }
                    // An interface's parents are hierarchy edges, not
                    // implementations.
                    TypeKind::Interface => {}
                }
                self.index
                    .children
                    .entry(NameKey::new(parent))
                    .or_default()
                    .push(record.qualified_name.clone());
            }

            if !record.defaults.is_empty() {
                self.index.defaults.insert(key, record.defaults.clone());
            }
        }
        Ok(())
    }

    pub fn finish(mut self) -> Result<TypeIndex> {
        for list in self.index.children.values_mut() {
            list.sort();
            list.dedup();
        }
        for list in self.index.implementors.values_mut() {
            list.sort();
            list.dedup();
        }
        self.index.descendants = resolve_descendants(&self.index.children)?;
        Ok(self.index)
    }
}

/// Expand the direct-children map into its transitive closure.
///
/// Memoized per type; a visiting set turns malformed self-referential
/// hierarchies into [`IndexError::InheritanceCycle`] instead of looping.
pub fn resolve_descendants(
    children: &BTreeMap<NameKey, Vec<String>>,
) -> Result<BTreeMap<NameKey, Vec<String>>> {
    let mut resolved: BTreeMap<NameKey, Vec<String>> = BTreeMap::new();
    let mut visiting: BTreeSet<NameKey> = BTreeSet::new();

    for key in children.keys() {
        expand(key, children, &mut resolved, &mut visiting)?;
    }
    Ok(resolved)
}

fn expand(
    key: &NameKey,
    children: &BTreeMap<NameKey, Vec<String>>,
    resolved: &mut BTreeMap<NameKey, Vec<String>>,
    visiting: &mut BTreeSet<NameKey>,
) -> Result<()> {
    if resolved.contains_key(key.as_str()) {
        return Ok(());
    }
    if !visiting.insert(key.clone()) {
        return Err(IndexError::InheritanceCycle {
            name: key.to_string(),
        });
    }

    let direct = children.get(key.as_str()).cloned().unwrap_or_default();
    let mut all = Vec::new();
    for child in &direct {
        all.push(child.clone());
        let child_key = NameKey::new(child);
        expand(&child_key, children, resolved, visiting)?;
        if let Some(grand) = resolved.get(child_key.as_str()) {
            all.extend(grand.iter().cloned());
        }
    }
    // A deep hierarchy can reach the same type through several interface
    // edges; report each descendant once.
    let mut seen = BTreeSet::new();
    all.retain(|name| seen.insert(NameKey::new(name)));

    visiting.remove(key.as_str());
    resolved.insert(key.clone(), all);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::extract_file_facts;
    use pretty_assertions::assert_eq;

    fn build(files: &[(&str, &str)]) -> Result<TypeIndex> {
        let mut facts: Vec<_> = files
            .iter()
            .map(|(path, text)| extract_file_facts(path, text).unwrap())
            .collect();
        facts.sort_by(|a, b| a.path.cmp(&b.path));
        let mut builder = TypeIndexBuilder::new();
        for file in &facts {
            builder.add_file(file)?;
        }
        builder.finish()
    }

    #[test]
    fn descendants_are_transitive() {
        let index = build(&[
            ("a.php", "<?php class A {}"),
            ("b.php", "<?php class B extends A {}"),
            ("c.php", "<?php class C extends B {}"),
            ("d.php", "<?php class D extends A {}"),
        ])
        .unwrap();

        assert_eq!(index.descendants_of("A"), &["B", "C", "D"]);
        assert_eq!(index.descendants_of("B"), &["C"]);
        assert_eq!(index.descendants_of("C"), &[] as &[String]);
    }

    #[test]
    fn descendants_are_stable_under_input_reordering() {
        let forward = build(&[
            ("a.php", "<?php class A {}"),
            ("b.php", "<?php class B extends A {}"),
            ("c.php", "<?php class C extends B {}"),
        ])
        .unwrap();
        let reversed = build(&[
            ("c.php", "<?php class C extends B {}"),
            ("b.php", "<?php class B extends A {}"),
            ("a.php", "<?php class A {}"),
        ])
        .unwrap();
        assert_eq!(forward, reversed);
    }

    #[test]
    fn duplicate_type_names_both_paths() {
        let err = build(&[
            ("a.php", "<?php class Foo {}"),
            ("b.php", "<?php class Foo {}"),
        ])
        .unwrap_err();
        match err {
            IndexError::DuplicateType {
                name,
                first,
                second,
            } => {
                assert_eq!(name, "Foo");
                assert_eq!(first, "a.php");
                assert_eq!(second, "b.php");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn duplicate_detection_is_case_insensitive() {
        let err = build(&[
            ("a.php", "<?php class Foo {}"),
            ("b.php", "<?php class FOO {}"),
        ])
        .unwrap_err();
        assert!(matches!(err, IndexError::DuplicateType { .. }));
    }

    #[test]
    fn inheritance_cycle_is_an_error() {
        let err = build(&[
            ("a.php", "<?php class A extends B {}"),
            ("b.php", "<?php class B extends A {}"),
        ])
        .unwrap_err();
        assert!(matches!(err, IndexError::InheritanceCycle { .. }));
    }

    #[test]
    fn implementors_are_direct_only() {
        let index = build(&[
            ("i.php", "<?php interface Flushable {}"),
            ("a.php", "<?php class A implements Flushable {}"),
            ("b.php", "<?php class B extends A {}"),
        ])
        .unwrap();

        assert_eq!(index.implementors_of("Flushable"), &["A"]);
        // ...but descendants follow the interface edge.
        assert_eq!(index.descendants_of("Flushable"), &["A", "B"]);
    }

    #[test]
    fn interface_hierarchy_contributes_children_not_implementors() {
        let index = build(&[
            ("i.php", "<?php interface I {}"),
            ("j.php", "<?php interface J extends I {}"),
        ])
        .unwrap();
        assert_eq!(index.implementors_of("I"), &[] as &[String]);
        assert_eq!(index.descendants_of("I"), &["J"]);
    }

    #[test]
    fn lookups_are_case_insensitive_and_keep_paths() {
        let index = build(&[(
            "src/Page.php",
            "<?php namespace App;\nclass Page {}",
        )])
        .unwrap();
        assert_eq!(index.path_for_type("app\\page"), Some("src/Page.php"));
        assert_eq!(index.path_for_type("App\\Page"), Some("src/Page.php"));
        assert_eq!(index.path_for_type("App\\Missing"), None);
    }
}
