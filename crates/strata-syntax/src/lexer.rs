//! Hand-written lexer for the narrow PHP shapes the manifest needs.
//!
//! This is deliberately not a general-purpose PHP tokenizer: it understands
//! exactly enough (tags, trivia, identifiers, the declaration keywords,
//! string/number literals, declaration punctuation) to feed the pattern
//! matcher. Everything it does not understand becomes an `Unknown` token and
//! flows through harmlessly.

use strata_core::Span;

use crate::token::{keyword_kind, Token, TokenKind};

/// Tokenize a whole PHP source file.
///
/// Text outside `<?php ... ?>` regions is emitted as `InlineHtml` trivia so
/// token indices always cover the full file.
pub fn tokenize(text: &str) -> Vec<Token> {
    Lexer::new(text).run()
}

struct Lexer<'a> {
    text: &'a str,
    pos: usize,
    in_php: bool,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(text: &'a str) -> Self {
        Lexer {
            text,
            pos: 0,
            in_php: false,
            tokens: Vec::new(),
        }
    }

    fn remaining(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn peek_char(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn bump_char(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn push(&mut self, kind: TokenKind, text: impl Into<String>, start: usize) {
        self.tokens.push(Token {
            kind,
            text: text.into(),
            span: Span::new(start, self.pos),
        });
    }

    fn run(mut self) -> Vec<Token> {
        while self.pos < self.text.len() {
            if self.in_php {
                self.next_php_token();
            } else {
                self.lex_inline_html();
            }
        }
        self.tokens
    }

    fn lex_inline_html(&mut self) {
        let start = self.pos;
        match self.remaining().find("<?php") {
            Some(0) => {
                self.pos += "<?php".len();
                self.in_php = true;
                self.push(TokenKind::InlineHtml, "<?php", start);
            }
            Some(offset) => {
                let html = &self.text[start..start + offset];
                self.pos += offset;
                self.push(TokenKind::InlineHtml, html, start);
            }
            None => {
                let html = &self.text[start..];
                self.pos = self.text.len();
                self.push(TokenKind::InlineHtml, html, start);
            }
        }
    }

    fn next_php_token(&mut self) {
        let start = self.pos;

        if self.remaining().starts_with("?>") {
            self.pos += 2;
            self.in_php = false;
            self.push(TokenKind::InlineHtml, "?>", start);
            return;
        }

        let ch = match self.peek_char() {
            Some(c) => c,
            None => return,
        };

        if ch.is_whitespace() {
            while matches!(self.peek_char(), Some(c) if c.is_whitespace()) {
                self.bump_char();
            }
            let text = self.text[start..self.pos].to_string();
            self.push(TokenKind::Whitespace, text, start);
            return;
        }

        let rem = self.remaining();
        if rem.starts_with("//") || rem.starts_with('#') {
            while let Some(c) = self.peek_char() {
                if c == '\n' {
                    break;
                }
                self.bump_char();
            }
            let text = self.text[start..self.pos].to_string();
            self.push(TokenKind::Comment, text, start);
            return;
        }
        if rem.starts_with("/*") {
            self.pos += 2;
            while !self.remaining().is_empty() && !self.remaining().starts_with("*/") {
                self.bump_char();
            }
            if self.remaining().starts_with("*/") {
                self.pos += 2;
            }
            let text = self.text[start..self.pos].to_string();
            self.push(TokenKind::Comment, text, start);
            return;
        }

        self.bump_char();

        match ch {
            '\\' => self.push(TokenKind::Backslash, "\\", start),
            '{' => self.push(TokenKind::LBrace, "{", start),
            '}' => self.push(TokenKind::RBrace, "}", start),
            '(' => self.push(TokenKind::LParen, "(", start),
            ')' => self.push(TokenKind::RParen, ")", start),
            '[' => self.push(TokenKind::LBracket, "[", start),
            ']' => self.push(TokenKind::RBracket, "]", start),
            ';' => self.push(TokenKind::Semi, ";", start),
            ',' => self.push(TokenKind::Comma, ",", start),
            '-' => self.push(TokenKind::Minus, "-", start),
            '=' => {
                if self.peek_char() == Some('>') {
                    self.bump_char();
                    self.push(TokenKind::DoubleArrow, "=>", start);
                } else {
                    self.push(TokenKind::Eq, "=", start);
                }
            }
            ':' => {
                if self.peek_char() == Some(':') {
                    self.bump_char();
                    self.push(TokenKind::DoubleColon, "::", start);
                } else {
                    self.push(TokenKind::Unknown, ":", start);
                }
            }
            '$' => {
                let name = self.lex_ident_tail(String::new());
                if name.is_empty() {
                    self.push(TokenKind::Unknown, "$", start);
                } else {
                    self.push(TokenKind::Variable, name, start);
                }
            }
            '\'' | '"' => {
                let lit = self.lex_string_literal(ch);
                self.push(TokenKind::Str, lit, start);
            }
            c if c.is_ascii_digit() => {
                let (kind, num) = self.lex_number(c);
                self.push(kind, num, start);
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::new();
                ident.push(c);
                let ident = self.lex_ident_tail(ident);
                let kind = keyword_kind(&ident.to_lowercase()).unwrap_or(TokenKind::Ident);
                self.push(kind, ident, start);
            }
            other => self.push(TokenKind::Unknown, other.to_string(), start),
        }
    }

    fn lex_ident_tail(&mut self, mut out: String) -> String {
        while let Some(c) = self.peek_char() {
            if c.is_ascii_alphanumeric() || c == '_' {
                out.push(c);
                self.bump_char();
            } else {
                break;
            }
        }
        out
    }

    fn lex_number(&mut self, first: char) -> (TokenKind, String) {
        let mut out = String::new();
        out.push(first);
        let mut kind = TokenKind::Int;
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() || c == '_' {
                out.push(c);
                self.bump_char();
            } else if c == '.' && kind == TokenKind::Int {
                // Only a digit after the dot makes this a float; `1.foo` is
                // not a literal shape we care about.
                let mut ahead = self.remaining().chars();
                ahead.next();
                if matches!(ahead.next(), Some(d) if d.is_ascii_digit()) {
                    kind = TokenKind::Float;
                    out.push(c);
                    self.bump_char();
                } else {
                    break;
                }
            } else {
                break;
            }
        }
        (kind, out)
    }

    fn lex_string_literal(&mut self, quote: char) -> String {
        let mut out = String::new();
        out.push(quote);
        while let Some(c) = self.bump_char() {
            out.push(c);
            if c == quote {
                break;
            }
            if c == '\\' {
                if let Some(escaped) = self.bump_char() {
                    out.push(escaped);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<TokenKind> {
        tokenize(text)
            .into_iter()
            .filter(|t| !t.kind.is_trivia())
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn lexes_class_declaration() {
        let text = "<?php\nclass Foo extends Bar implements Baz {}\n";
        assert_eq!(
            kinds(text),
            vec![
                TokenKind::Class,
                TokenKind::Ident,
                TokenKind::Extends,
                TokenKind::Ident,
                TokenKind::Implements,
                TokenKind::Ident,
                TokenKind::LBrace,
                TokenKind::RBrace,
            ]
        );
    }

    #[test]
    fn keywords_are_case_insensitive() {
        let tokens = tokenize("<?php CLASS Foo {}");
        let class = tokens.iter().find(|t| t.kind == TokenKind::Class).unwrap();
        assert_eq!(class.text, "CLASS");
    }

    #[test]
    fn inline_html_is_trivia() {
        let text = "before <?php namespace A; ?> after";
        let tokens = tokenize(text);
        assert_eq!(tokens[0].kind, TokenKind::InlineHtml);
        assert_eq!(tokens[0].text, "before ");
        assert!(tokens.iter().any(|t| t.kind == TokenKind::Namespace));
        assert_eq!(tokens.last().unwrap().text, " after");
    }

    #[test]
    fn variables_drop_the_sigil() {
        let tokens = tokenize("<?php static $db = 1;");
        let var = tokens
            .iter()
            .find(|t| t.kind == TokenKind::Variable)
            .unwrap();
        assert_eq!(var.text, "db");
    }

    #[test]
    fn strings_keep_quotes_and_escapes() {
        let tokens = tokenize(r#"<?php 'a\'b' "c\"d""#);
        let strs: Vec<&str> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Str)
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(strs, vec![r"'a\'b'", r#""c\"d""#]);
    }

    #[test]
    fn numbers_split_int_and_float() {
        let tokens = tokenize("<?php 42 3.25 -1");
        let kinds: Vec<TokenKind> = tokens
            .iter()
            .filter(|t| !t.kind.is_trivia())
            .map(|t| t.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Int,
                TokenKind::Float,
                TokenKind::Minus,
                TokenKind::Int
            ]
        );
    }

    #[test]
    fn spans_cover_the_whole_input() {
        let text = "x <?php class A {} ?> y";
        let tokens = tokenize(text);
        assert_eq!(tokens.first().unwrap().span.start, 0);
        assert_eq!(tokens.last().unwrap().span.end, text.len());
        for pair in tokens.windows(2) {
            assert_eq!(pair[0].span.end, pair[1].span.start);
        }
    }
}
