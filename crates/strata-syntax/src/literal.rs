//! Restricted, literal-only evaluation of default-value expressions.
//!
//! Static configuration defaults are written as PHP expressions. Evaluating
//! arbitrary expressions is out of the question for a manifest build, so this
//! evaluator accepts exactly the literal subset: strings, numbers, booleans,
//! null, `array(...)` / `[...]` literals (with optional `key => value`
//! pairs), unary minus, and `self::class` — which substitutes the owning
//! type's qualified name. Everything else is a structured error and the
//! caller decides whether that default is skipped or fatal.

use serde_json::{Map, Value};

use crate::error::SyntaxError;
use crate::token::{Token, TokenKind};

/// Evaluate the token slice of one default-value expression.
///
/// `self_name` is the qualified name of the type that owns the expression,
/// used for `self::class`.
pub fn evaluate(tokens: &[Token], self_name: &str) -> Result<Value, SyntaxError> {
    let mut parser = LiteralParser {
        tokens,
        pos: 0,
        self_name,
    };
    let value = parser.parse_value()?;
    parser.expect_end()?;
    Ok(value)
}

struct LiteralParser<'a> {
    tokens: &'a [Token],
    pos: usize,
    self_name: &'a str,
}

impl<'a> LiteralParser<'a> {
    fn peek(&mut self) -> Option<&'a Token> {
        while let Some(token) = self.tokens.get(self.pos) {
            if token.kind.is_trivia() {
                self.pos += 1;
            } else {
                return Some(token);
            }
        }
        None
    }

    fn bump(&mut self) -> Option<&'a Token> {
        let token = self.peek()?;
        self.pos += 1;
        Some(token)
    }

    fn unsupported(&mut self) -> SyntaxError {
        let found = match self.peek() {
            Some(token) => token.text.clone(),
            None => "<end of expression>".to_string(),
        };
        SyntaxError::UnsupportedExpression { found }
    }

    fn expect_end(&mut self) -> Result<(), SyntaxError> {
        match self.peek() {
            None => Ok(()),
            Some(_) => Err(self.unsupported()),
        }
    }

    fn parse_value(&mut self) -> Result<Value, SyntaxError> {
        let Some(token) = self.peek() else {
            return Err(SyntaxError::UnterminatedLiteral);
        };

        match token.kind {
            TokenKind::Null => {
                self.bump();
                Ok(Value::Null)
            }
            TokenKind::True => {
                self.bump();
                Ok(Value::Bool(true))
            }
            TokenKind::False => {
                self.bump();
                Ok(Value::Bool(false))
            }
            TokenKind::Int | TokenKind::Float | TokenKind::Minus => self.parse_number(false),
            TokenKind::Str => {
                let text = &self.bump().expect("peeked").text;
                Ok(Value::String(unquote(text)))
            }
            TokenKind::SelfKw => {
                self.bump();
                let colons = self.bump().ok_or(SyntaxError::UnterminatedLiteral)?;
                let class = self.bump().ok_or(SyntaxError::UnterminatedLiteral)?;
                if colons.kind == TokenKind::DoubleColon && class.kind == TokenKind::Class {
                    Ok(Value::String(self.self_name.to_string()))
                } else {
                    Err(SyntaxError::UnsupportedExpression {
                        found: format!("self::{}", class.text),
                    })
                }
            }
            TokenKind::Array => {
                self.bump();
                match self.bump() {
                    Some(open) if open.kind == TokenKind::LParen => {
                        self.parse_items(TokenKind::RParen)
                    }
                    _ => Err(self.unsupported()),
                }
            }
            TokenKind::LBracket => {
                self.bump();
                self.parse_items(TokenKind::RBracket)
            }
            _ => Err(self.unsupported()),
        }
    }

    fn parse_number(&mut self, negated: bool) -> Result<Value, SyntaxError> {
        let token = self.bump().ok_or(SyntaxError::UnterminatedLiteral)?;
        match token.kind {
            TokenKind::Minus if !negated => self.parse_number(true),
            TokenKind::Int => {
                let raw = token.text.replace('_', "");
                let value: i64 = raw
                    .parse()
                    .map_err(|_| SyntaxError::UnsupportedExpression {
                        found: token.text.clone(),
                    })?;
                Ok(Value::from(if negated { -value } else { value }))
            }
            TokenKind::Float => {
                let raw = token.text.replace('_', "");
                let value: f64 = raw
                    .parse()
                    .map_err(|_| SyntaxError::UnsupportedExpression {
                        found: token.text.clone(),
                    })?;
                Ok(Value::from(if negated { -value } else { value }))
            }
            _ => Err(SyntaxError::UnsupportedExpression {
                found: token.text.clone(),
            }),
        }
    }

    /// Items of an array literal, after the opening delimiter.
    ///
    /// Keyless items build a JSON list; any `key => value` pair switches the
    /// whole literal to an object, with earlier positional items keyed by
    /// their index the way PHP does.
    fn parse_items(&mut self, close: TokenKind) -> Result<Value, SyntaxError> {
        let mut list: Vec<Value> = Vec::new();
        let mut map: Option<Map<String, Value>> = None;
        let mut next_index = 0usize;

        loop {
            match self.peek() {
                None => return Err(SyntaxError::UnterminatedLiteral),
                Some(token) if token.kind == close => {
                    self.bump();
                    break;
                }
                Some(_) => {}
            }

            let value = self.parse_value()?;
            let key = match self.peek() {
                Some(token) if token.kind == TokenKind::DoubleArrow => {
                    self.bump();
                    let key = match &value {
                        Value::String(s) => s.clone(),
                        Value::Number(n) => n.to_string(),
                        other => {
                            return Err(SyntaxError::UnsupportedExpression {
                                found: other.to_string(),
                            })
                        }
                    };
                    Some((key, self.parse_value()?))
                }
                _ => None,
            };

            match key {
                Some((key, keyed_value)) => {
                    let map = map.get_or_insert_with(|| {
                        list.drain(..)
                            .enumerate()
                            .map(|(idx, item)| (idx.to_string(), item))
                            .collect()
                    });
                    map.insert(key, keyed_value);
                }
                None => {
                    match &mut map {
                        Some(map) => {
                            map.insert(next_index.to_string(), value);
                        }
                        None => list.push(value),
                    }
                    next_index += 1;
                }
            }

            match self.peek() {
                Some(token) if token.kind == TokenKind::Comma => {
                    self.bump();
                }
                Some(token) if token.kind == close => {}
                Some(_) => return Err(self.unsupported()),
                None => return Err(SyntaxError::UnterminatedLiteral),
            }
        }

        Ok(match map {
            Some(map) => Value::Object(map),
            None => Value::Array(list),
        })
    }
}

/// Strip quotes and resolve escapes from a raw string token.
///
/// Single-quoted PHP strings only escape `\'` and `\\`; double-quoted
/// strings get the common escapes and pass anything else through verbatim.
fn unquote(raw: &str) -> String {
    let mut chars = raw.chars();
    let Some(quote) = chars.next() else {
        return String::new();
    };
    let body: String = chars.collect();
    let body = body.strip_suffix(quote).unwrap_or(&body);

    let mut out = String::with_capacity(body.len());
    let mut iter = body.chars();
    while let Some(c) = iter.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match iter.next() {
            Some('n') if quote == '"' => out.push('\n'),
            Some('t') if quote == '"' => out.push('\t'),
            Some('r') if quote == '"' => out.push('\r'),
            Some('"') if quote == '"' => out.push('"'),
            Some('$') if quote == '"' => out.push('$'),
            Some('\'') if quote == '\'' => out.push('\''),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn eval(expr: &str) -> Result<Value, SyntaxError> {
        let tokens: Vec<Token> = tokenize(&format!("<?php {expr}"))
            .into_iter()
            .filter(|t| t.kind != TokenKind::InlineHtml)
            .collect();
        evaluate(&tokens, "App\\Page")
    }

    #[test]
    fn scalars() {
        assert_eq!(eval("null").unwrap(), Value::Null);
        assert_eq!(eval("true").unwrap(), json!(true));
        assert_eq!(eval("FALSE").unwrap(), json!(false));
        assert_eq!(eval("42").unwrap(), json!(42));
        assert_eq!(eval("-7").unwrap(), json!(-7));
        assert_eq!(eval("3.5").unwrap(), json!(3.5));
        assert_eq!(eval("'single'").unwrap(), json!("single"));
        assert_eq!(eval("\"double\\n\"").unwrap(), json!("double\n"));
    }

    #[test]
    fn self_class_substitutes_owner() {
        assert_eq!(eval("self::class").unwrap(), json!("App\\Page"));
    }

    #[test]
    fn plain_lists() {
        assert_eq!(eval("[1, 2, 3]").unwrap(), json!([1, 2, 3]));
        assert_eq!(eval("array('a', 'b')").unwrap(), json!(["a", "b"]));
        assert_eq!(eval("[]").unwrap(), json!([]));
    }

    #[test]
    fn keyed_arrays_become_objects() {
        assert_eq!(
            eval("['Title' => 'Varchar', 'Sort' => 'Int']").unwrap(),
            json!({"Title": "Varchar", "Sort": "Int"})
        );
        assert_eq!(
            eval("array(0 => 'a', 'x' => 1)").unwrap(),
            json!({"0": "a", "x": 1})
        );
    }

    #[test]
    fn mixed_positional_and_keyed_items() {
        assert_eq!(
            eval("['a', 'k' => 'v', 'b']").unwrap(),
            json!({"0": "a", "k": "v", "1": "b"})
        );
    }

    #[test]
    fn nested_arrays() {
        assert_eq!(
            eval("['has_one' => ['Parent' => self::class], 'flags' => [true, null]]").unwrap(),
            json!({"has_one": {"Parent": "App\\Page"}, "flags": [true, null]})
        );
    }

    #[test]
    fn trailing_commas_are_fine() {
        assert_eq!(eval("[1, 2,]").unwrap(), json!([1, 2]));
    }

    #[test]
    fn non_literals_are_rejected() {
        assert!(matches!(
            eval("Foo::create()"),
            Err(SyntaxError::UnsupportedExpression { .. })
        ));
        assert!(matches!(
            eval("1 + 2"),
            Err(SyntaxError::UnsupportedExpression { .. })
        ));
        assert!(matches!(
            eval("[1"),
            Err(SyntaxError::UnterminatedLiteral)
        ));
    }
}
