//! Type indexing: from per-file declaration facts to the whole-tree
//! hierarchy maps the manifest serves queries from.

mod error;
mod facts;
mod index;

pub use error::{IndexError, Result};
pub use facts::{extract_file_facts, FileFacts, TypeKind, TypeRecord};
pub use index::{resolve_descendants, TypeEntry, TypeIndex, TypeIndexBuilder};
