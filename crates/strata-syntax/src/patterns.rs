//! The fixed declaration patterns.
//!
//! Continuations are tried before jump targets, so each pattern keeps the
//! "stay in the current clause" path on the continuation and uses forward
//! jumps to leave a clause. Qualified names (`A\B\C`) and comma lists are
//! expressed with backward jumps; every backward jump follows a consumed
//! token, so the matcher state always advances.
//!
//! Capture names used by the index builder:
//! - `name`: the declared local name
//! - `namespace`: the full namespace path
//! - `extends`: superclass (classes) or comma-joined parent list (interfaces)
//! - `implements`: comma-joined interface list

use crate::matcher::{Pattern, Step};
use crate::token::TokenKind;

pub const CAPTURE_NAME: &str = "name";
pub const CAPTURE_NAMESPACE: &str = "namespace";
pub const CAPTURE_EXTENDS: &str = "extends";
pub const CAPTURE_IMPLEMENTS: &str = "implements";

/// `namespace Foo\Bar;`
pub fn namespace_pattern() -> Pattern {
    Pattern::new(
        "namespace",
        vec![
            /* 0 */ Step::new(TokenKind::Namespace),
            /* 1 */
            Step::new(TokenKind::Ident)
                .capture_append(CAPTURE_NAMESPACE)
                .jumps(&[3]),
            /* 2 */
            Step::new(TokenKind::Backslash)
                .capture_append(CAPTURE_NAMESPACE)
                .jumps(&[1]),
            /* 3 */ Step::new(TokenKind::Semi),
        ],
    )
}

/// `class Foo extends \A\B implements I, \C\D {`
///
/// The `extends` clause captures one qualified name; `implements` captures a
/// comma-joined list (delimiters included, split by the consumer). The
/// trailing `{` anchors the match so a list is always consumed to its end.
pub fn class_pattern() -> Pattern {
    Pattern::new(
        "class",
        vec![
            /* 0 */ Step::new(TokenKind::Class),
            /* 1 */
            Step::new(TokenKind::Ident)
                .capture(CAPTURE_NAME)
                .jumps(&[6, 11]),
            /* 2 */ Step::new(TokenKind::Extends),
            /* 3 */
            Step::new(TokenKind::Backslash)
                .optional()
                .capture_append(CAPTURE_EXTENDS),
            /* 4 */
            Step::new(TokenKind::Ident)
                .capture_append(CAPTURE_EXTENDS)
                .jumps(&[6, 11]),
            /* 5 */
            Step::new(TokenKind::Backslash)
                .capture_append(CAPTURE_EXTENDS)
                .jumps(&[4]),
            /* 6 */ Step::new(TokenKind::Implements),
            /* 7 */
            Step::new(TokenKind::Backslash)
                .optional()
                .capture_append(CAPTURE_IMPLEMENTS),
            /* 8 */
            Step::new(TokenKind::Ident)
                .capture_append(CAPTURE_IMPLEMENTS)
                .jumps(&[10, 11]),
            /* 9 */
            Step::new(TokenKind::Backslash)
                .capture_append(CAPTURE_IMPLEMENTS)
                .jumps(&[8]),
            /* 10 */
            Step::new(TokenKind::Comma)
                .capture_append(CAPTURE_IMPLEMENTS)
                .jumps(&[7]),
            /* 11 */ Step::new(TokenKind::LBrace),
        ],
    )
}

/// `interface I extends A, B\C {`
///
/// PHP interfaces may extend several parents, so `extends` here is a
/// comma-joined list like a class's `implements`.
pub fn interface_pattern() -> Pattern {
    Pattern::new(
        "interface",
        vec![
            /* 0 */ Step::new(TokenKind::Interface),
            /* 1 */
            Step::new(TokenKind::Ident).capture(CAPTURE_NAME).jumps(&[7]),
            /* 2 */ Step::new(TokenKind::Extends),
            /* 3 */
            Step::new(TokenKind::Backslash)
                .optional()
                .capture_append(CAPTURE_EXTENDS),
            /* 4 */
            Step::new(TokenKind::Ident)
                .capture_append(CAPTURE_EXTENDS)
                .jumps(&[6, 7]),
            /* 5 */
            Step::new(TokenKind::Backslash)
                .capture_append(CAPTURE_EXTENDS)
                .jumps(&[4]),
            /* 6 */
            Step::new(TokenKind::Comma)
                .capture_append(CAPTURE_EXTENDS)
                .jumps(&[3]),
            /* 7 */ Step::new(TokenKind::LBrace),
        ],
    )
}

/// `static $name` — the anchor for configuration-default harvesting.
///
/// The surrounding context (class body depth, the `= literal` tail) is the
/// index builder's job; the pattern only finds candidates.
pub fn static_property_pattern() -> Pattern {
    Pattern::new(
        "static-property",
        vec![
            Step::new(TokenKind::Static),
            Step::new(TokenKind::Variable).capture(CAPTURE_NAME),
        ],
    )
}

/// Split a comma-joined capture (`A,\B\C,D`) into its items.
pub fn split_list(capture: &str) -> Vec<String> {
    capture
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}
