//! Core shared types for Strata.
//!
//! This crate is intentionally small and dependency-free.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Namespace separator in qualified PHP names.
pub const NAME_SEPARATOR: char = '\\';

/// A half-open byte range into a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[inline]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Case-insensitive lookup key for a qualified type name.
///
/// PHP type names compare case-insensitively, but records keep the casing the
/// declaration used. The lookup key is the lower-cased form with any leading
/// root separator stripped; the original spelling lives on the record, never
/// on the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NameKey(String);

impl NameKey {
    pub fn new(name: &str) -> Self {
        let name = name.strip_prefix(NAME_SEPARATOR).unwrap_or(name);
        Self(name.to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NameKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Borrow<str> for NameKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NameKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// True if `name` starts with the root separator and is therefore absolute
/// regardless of the namespace it appears in.
pub fn is_rooted(name: &str) -> bool {
    name.starts_with(NAME_SEPARATOR)
}

/// Join a namespace and a local name into a qualified name.
///
/// A rooted `name` ignores the namespace; its leading separator is dropped
/// from the stored form.
pub fn qualify(namespace: &str, name: &str) -> String {
    if let Some(rooted) = name.strip_prefix(NAME_SEPARATOR) {
        return rooted.to_string();
    }
    if namespace.is_empty() {
        return name.to_string();
    }
    let mut out = String::with_capacity(namespace.len() + 1 + name.len());
    out.push_str(namespace);
    out.push(NAME_SEPARATOR);
    out.push_str(name);
    out
}

/// The final segment of a qualified name.
pub fn local_name(qualified: &str) -> &str {
    qualified
        .rsplit(NAME_SEPARATOR)
        .next()
        .unwrap_or(qualified)
}
