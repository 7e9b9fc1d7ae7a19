//! Tokenization and token-pattern matching for PHP declaration shapes.
//!
//! The manifest never parses PHP properly; it lexes a file into a flat token
//! stream and runs a handful of fixed [`matcher::Pattern`]s over it to pull
//! out namespaces, class/interface declarations, and static configuration
//! defaults. See [`patterns`] for the patterns themselves and [`literal`]
//! for the restricted default-value evaluator.

mod error;
pub mod lexer;
pub mod literal;
pub mod matcher;
pub mod patterns;
mod token;

pub use error::{Result, SyntaxError};
pub use lexer::tokenize;
pub use matcher::{Pattern, PatternMatch, Step};
pub use token::{Token, TokenKind};
