//! Per-file fact extraction.
//!
//! [`FileFacts`] is everything the manifest learns from one source file and
//! the unit of incremental caching: a file whose content hash is unchanged
//! reuses its serialized facts instead of being re-tokenized.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strata_core::qualify;
use strata_syntax::literal;
use strata_syntax::patterns::{
    class_pattern, interface_pattern, namespace_pattern, split_list, static_property_pattern,
    CAPTURE_EXTENDS, CAPTURE_IMPLEMENTS, CAPTURE_NAME, CAPTURE_NAMESPACE,
};
use strata_syntax::{tokenize, PatternMatch, SyntaxError, Token, TokenKind};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    Class,
    Interface,
}

/// One declared type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeRecord {
    /// Qualified name as written (original casing; no leading separator).
    pub qualified_name: String,
    pub kind: TypeKind,
    pub namespace: String,
    /// Superclass qualified name. Always `None` for interfaces — their
    /// parents go in [`TypeRecord::interfaces`].
    pub superclass: Option<String>,
    /// Implemented interfaces (classes) or extended parents (interfaces),
    /// qualified. All of these become hierarchy edges; only a class's
    /// entries count as implementations.
    pub interfaces: Vec<String>,
    /// Static configuration defaults: property name → literal value.
    pub defaults: BTreeMap<String, Value>,
}

/// Everything extracted from one source file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileFacts {
    /// Path relative to the scan root, `/`-separated.
    pub path: String,
    pub records: Vec<TypeRecord>,
}

/// Extract all facts from one file's text.
///
/// Fails only on pattern-engine errors; files with no recognizable
/// declarations simply produce no records.
pub fn extract_file_facts(path: &str, text: &str) -> Result<FileFacts> {
    let tokens = tokenize(text);

    let namespaces = namespace_pattern().find_all(&tokens)?;
    let classes = class_pattern().find_all(&tokens)?;
    let interfaces = interface_pattern().find_all(&tokens)?;
    let statics = static_property_pattern().find_all(&tokens)?;

    let depths = brace_depths(&tokens);

    let mut records = Vec::new();
    for m in &classes {
        let namespace = namespace_at(&namespaces, m.start);
        let name = match m.capture(CAPTURE_NAME) {
            Some(name) => name,
            None => continue,
        };
        let qualified_name = qualify(namespace, name);
        let superclass = m
            .capture(CAPTURE_EXTENDS)
            .map(|target| qualify(namespace, target));
        let interfaces = m
            .capture(CAPTURE_IMPLEMENTS)
            .map(|list| {
                split_list(list)
                    .iter()
                    .map(|target| qualify(namespace, target))
                    .collect()
            })
            .unwrap_or_default();
        let defaults = harvest_defaults(&tokens, &depths, &statics, m, &qualified_name)?;

        records.push(TypeRecord {
            qualified_name,
            kind: TypeKind::Class,
            namespace: namespace.to_string(),
            superclass,
            interfaces,
            defaults,
        });
    }

    for m in &interfaces {
        let namespace = namespace_at(&namespaces, m.start);
        let name = match m.capture(CAPTURE_NAME) {
            Some(name) => name,
            None => continue,
        };
        let parents = m
            .capture(CAPTURE_EXTENDS)
            .map(|list| {
                split_list(list)
                    .iter()
                    .map(|target| qualify(namespace, target))
                    .collect()
            })
            .unwrap_or_default();

        records.push(TypeRecord {
            qualified_name: qualify(namespace, name),
            kind: TypeKind::Interface,
            namespace: namespace.to_string(),
            superclass: None,
            interfaces: parents,
            defaults: BTreeMap::new(),
        });
    }

    Ok(FileFacts {
        path: path.to_string(),
        records,
    })
}

/// The namespace in effect at token index `at`: the last `namespace`
/// declaration that starts before it.
fn namespace_at(namespaces: &[PatternMatch], at: usize) -> &str {
    namespaces
        .iter()
        .take_while(|m| m.start < at)
        .last()
        .and_then(|m| m.capture(CAPTURE_NAMESPACE))
        .unwrap_or("")
}

/// Brace nesting level *before* each token.
fn brace_depths(tokens: &[Token]) -> Vec<usize> {
    let mut depths = Vec::with_capacity(tokens.len());
    let mut depth = 0usize;
    for token in tokens {
        depths.push(depth);
        match token.kind {
            TokenKind::LBrace => depth += 1,
            TokenKind::RBrace => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    depths
}

/// Collect `static $name = <literal>` defaults declared directly in the body
/// of the class whose pattern match is `class_match`.
///
/// `statics` are the static-property anchors found over the whole file; only
/// those at the class's own body depth count. Statics nested deeper (inside
/// methods, closures, nested types) belong to something else. Defaults that
/// are not pure literals are skipped with a debug log — the manifest must
/// never evaluate real expressions.
fn harvest_defaults(
    tokens: &[Token],
    depths: &[usize],
    statics: &[PatternMatch],
    class_match: &PatternMatch,
    qualified_name: &str,
) -> Result<BTreeMap<String, Value>> {
    let open_brace = class_match.end - 1;
    debug_assert_eq!(tokens[open_brace].kind, TokenKind::LBrace);
    let body_depth = depths[open_brace] + 1;
    let body_end = body_end(tokens, depths, open_brace);

    let mut defaults = BTreeMap::new();
    for anchor in statics {
        if anchor.start <= open_brace
            || anchor.start >= body_end
            || depths[anchor.start] != body_depth
        {
            continue;
        }

        // One `static` statement can declare several properties:
        // `static $a = 1, $b = 2;`
        let mut pos = anchor.end;
        let mut property = match anchor.capture(CAPTURE_NAME) {
            Some(name) => name.to_string(),
            None => continue,
        };
        loop {
            match next_significant(tokens, &mut pos).map(|t| t.kind) {
                Some(TokenKind::Eq) => {
                    pos += 1;
                    let expr_start = pos;
                    let expr_end = expression_end(tokens, expr_start);
                    match literal::evaluate(&tokens[expr_start..expr_end], qualified_name) {
                        Ok(value) => {
                            defaults.insert(property.clone(), value);
                        }
                        Err(
                            err @ (SyntaxError::UnsupportedExpression { .. }
                            | SyntaxError::UnterminatedLiteral),
                        ) => {
                            tracing::debug!(
                                target = "strata.index",
                                type_name = qualified_name,
                                property,
                                error = %err,
                                "skipping non-literal static default"
                            );
                        }
                        Err(err) => return Err(err.into()),
                    }
                    pos = expr_end;
                }
                _ => {
                    // No initializer: nothing to record.
                }
            }

            // A comma continues the declaration with another `$property`.
            match next_significant(tokens, &mut pos).map(|t| t.kind) {
                Some(TokenKind::Comma) => {
                    pos += 1;
                }
                _ => break,
            }
            match next_significant(tokens, &mut pos) {
                Some(token) if token.kind == TokenKind::Variable => {
                    property = token.text.clone();
                    pos += 1;
                }
                _ => break,
            }
        }
    }

    Ok(defaults)
}

/// Index of the `}` closing the brace opened at `open_brace`.
fn body_end(tokens: &[Token], depths: &[usize], open_brace: usize) -> usize {
    let open_depth = depths[open_brace];
    for idx in open_brace + 1..tokens.len() {
        if tokens[idx].kind == TokenKind::RBrace && depths[idx] == open_depth + 1 {
            return idx;
        }
    }
    tokens.len()
}

fn next_significant<'a>(tokens: &'a [Token], pos: &mut usize) -> Option<&'a Token> {
    while let Some(token) = tokens.get(*pos) {
        if token.kind.is_trivia() {
            *pos += 1;
        } else {
            return Some(token);
        }
    }
    None
}

/// One past the last token of an initializer expression: the next `;` or `,`
/// outside any brackets.
fn expression_end(tokens: &[Token], start: usize) -> usize {
    let mut nesting = 0i32;
    for (idx, token) in tokens.iter().enumerate().skip(start) {
        match token.kind {
            TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => nesting += 1,
            TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => nesting -= 1,
            TokenKind::Semi | TokenKind::Comma if nesting == 0 => return idx,
            _ => {}
        }
    }
    tokens.len()
}
