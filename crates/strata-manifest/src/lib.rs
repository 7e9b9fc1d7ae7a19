//! Manifest building: scan a module tree, derive type and configuration
//! indexes, and serve queries from them.
//!
//! The pipeline per scan root:
//!
//! 1. [`modules::discover_modules`] finds the modules;
//! 2. [`walker::FileWalker`] enumerates source files (ignore rules applied);
//! 3. `strata-index` extracts per-file facts (cached by content hash) and
//!    folds them into a [`strata_index::TypeIndex`];
//! 4. `strata-config` loads, prefilters and sorts the configuration
//!    fragments;
//! 5. the [`Manifest`] answers lookups, resolving the merged configuration
//!    per environment variant on demand.
//!
//! Every derived artifact round-trips through an injected
//! [`strata_cache::CacheStore`].

mod error;
mod manifest;
pub mod modules;
pub mod walker;

pub use error::{ManifestError, Result};
pub use manifest::{Manifest, RebuildOptions};
pub use modules::Module;
pub use walker::{FileWalker, WalkOptions};
