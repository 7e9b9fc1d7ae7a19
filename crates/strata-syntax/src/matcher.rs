//! Backtracking matcher over flat token streams.
//!
//! A [`Pattern`] is an ordered list of [`Step`]s, each expecting one token
//! kind. Steps may be optional, may name alternate continuation points
//! (`jumps`), and may capture the matched text. Trivia tokens are skipped
//! transparently at every position unless a step asks for a trivia kind.
//!
//! Patterns are small and fixed, so the engine is pure backtracking with no
//! memoization. Termination is enforced with an explicit recursion-depth
//! bound rather than by restricting jump shapes: jump targets may point
//! backwards to express lists, and a consumed token between visits keeps the
//! `(token, step)` state advancing.

use std::collections::BTreeMap;

use crate::error::SyntaxError;
use crate::token::{Token, TokenKind};

/// Upper bound on backtracking depth.
///
/// Each recursion level consumes a token or advances a step, so legitimate
/// matches over declaration-sized patterns stay far below this. Hitting the
/// bound means a pathological pattern, and surfaces as a structured error
/// instead of a stack overflow.
const MAX_DEPTH: usize = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    /// Overwrite any previous value for the capture name.
    Set,
    /// Concatenate onto the previous value. Comma lists are captured with
    /// their delimiters and split by the consumer.
    Append,
}

#[derive(Debug, Clone)]
pub struct Capture {
    pub name: &'static str,
    pub mode: CaptureMode,
}

#[derive(Debug, Clone)]
pub struct Step {
    pub kind: TokenKind,
    pub optional: bool,
    pub jumps: &'static [usize],
    pub capture: Option<Capture>,
}

impl Step {
    pub fn new(kind: TokenKind) -> Self {
        Step {
            kind,
            optional: false,
            jumps: &[],
            capture: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn jumps(mut self, targets: &'static [usize]) -> Self {
        self.jumps = targets;
        self
    }

    pub fn capture(mut self, name: &'static str) -> Self {
        self.capture = Some(Capture {
            name,
            mode: CaptureMode::Set,
        });
        self
    }

    pub fn capture_append(mut self, name: &'static str) -> Self {
        self.capture = Some(Capture {
            name,
            mode: CaptureMode::Append,
        });
        self
    }
}

#[derive(Debug, Clone)]
pub struct Pattern {
    pub name: &'static str,
    pub steps: Vec<Step>,
}

/// One successful match: the token range it covered and its captures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    /// Index of the first matched token.
    pub start: usize,
    /// Index one past the last consumed token.
    pub end: usize,
    pub captures: BTreeMap<&'static str, String>,
}

impl PatternMatch {
    pub fn capture(&self, name: &str) -> Option<&str> {
        self.captures.get(name).map(String::as_str)
    }
}

#[derive(Debug, Clone)]
struct CaptureEvent {
    name: &'static str,
    mode: CaptureMode,
    text: String,
}

impl Pattern {
    pub fn new(name: &'static str, steps: Vec<Step>) -> Self {
        debug_assert!(!steps.is_empty(), "pattern {name} has no steps");
        debug_assert!(
            steps
                .iter()
                .all(|step| step.jumps.iter().all(|&j| j < steps.len())),
            "pattern {name} has a jump past the final step"
        );
        Pattern { name, steps }
    }

    /// Find every match in `tokens`.
    ///
    /// A match is attempted at each token whose kind equals the first step's
    /// kind; overlapping matches are all kept, so several declarations in one
    /// file each produce their own match.
    pub fn find_all(&self, tokens: &[Token]) -> Result<Vec<PatternMatch>, SyntaxError> {
        let first_kind = self.steps[0].kind;
        let mut matches = Vec::new();

        for start in 0..tokens.len() {
            if tokens[start].kind != first_kind {
                continue;
            }
            let mut trail = Vec::new();
            if let Some(end) = self.match_from(tokens, start, 0, &mut trail, 0)? {
                let mut captures = BTreeMap::new();
                for event in &trail {
                    match event.mode {
                        CaptureMode::Set => {
                            captures.insert(event.name, event.text.clone());
                        }
                        CaptureMode::Append => {
                            captures
                                .entry(event.name)
                                .or_insert_with(String::new)
                                .push_str(&event.text);
                        }
                    }
                }
                matches.push(PatternMatch {
                    start,
                    end,
                    captures,
                });
            }
        }

        Ok(matches)
    }

    /// Try to satisfy `steps[step_idx..]` starting at `tokens[pos..]`.
    ///
    /// Returns the index one past the last consumed token on success. Capture
    /// events are pushed onto `trail`; failed branches truncate back to their
    /// entry mark, so on success the trail holds exactly the winning branch.
    fn match_from(
        &self,
        tokens: &[Token],
        mut pos: usize,
        step_idx: usize,
        trail: &mut Vec<CaptureEvent>,
        depth: usize,
    ) -> Result<Option<usize>, SyntaxError> {
        if depth > MAX_DEPTH {
            return Err(SyntaxError::MatchDepthExceeded { pattern: self.name });
        }
        // Running past the final step is success.
        let Some(step) = self.steps.get(step_idx) else {
            return Ok(Some(pos));
        };

        loop {
            let Some(token) = tokens.get(pos) else {
                // Out of tokens: only skippable steps can remain.
                if step.optional {
                    return self.match_from(tokens, pos, step_idx + 1, trail, depth + 1);
                }
                return Ok(None);
            };

            if token.kind == step.kind {
                break;
            }
            if token.kind.is_trivia() {
                pos += 1;
                continue;
            }
            // Kind mismatch: an optional step advances without consuming.
            if step.optional {
                return self.match_from(tokens, pos, step_idx + 1, trail, depth + 1);
            }
            return Ok(None);
        }

        // Kind match: record the capture and explore continuations with the
        // token consumed, then (for optional steps) without it.
        let mark = trail.len();
        if let Some(capture) = &step.capture {
            trail.push(CaptureEvent {
                name: capture.name,
                mode: capture.mode,
                text: tokens[pos].text.clone(),
            });
        }

        if let Some(end) = self.match_from(tokens, pos + 1, step_idx + 1, trail, depth + 1)? {
            return Ok(Some(end));
        }
        for &target in step.jumps {
            if let Some(end) = self.match_from(tokens, pos + 1, target, trail, depth + 1)? {
                return Ok(Some(end));
            }
        }

        // Un-consume: drop this step's capture and retry at the same token.
        trail.truncate(mark);
        if step.optional {
            if let Some(end) = self.match_from(tokens, pos, step_idx + 1, trail, depth + 1)? {
                return Ok(Some(end));
            }
            for &target in step.jumps {
                if let Some(end) = self.match_from(tokens, pos, target, trail, depth + 1)? {
                    return Ok(Some(end));
                }
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::token::TokenKind;

    fn ident_semi_pattern() -> Pattern {
        Pattern::new(
            "ident-semi",
            vec![
                Step::new(TokenKind::Ident).capture("name"),
                Step::new(TokenKind::Semi),
            ],
        )
    }

    #[test]
    fn matches_across_trivia() {
        let tokens = tokenize("<?php foo /* gap */ ;");
        let matches = ident_semi_pattern().find_all(&tokens).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].capture("name"), Some("foo"));
    }

    #[test]
    fn optional_step_is_skipped_on_mismatch() {
        let pattern = Pattern::new(
            "opt",
            vec![
                Step::new(TokenKind::Ident).capture("name"),
                Step::new(TokenKind::Comma).optional(),
                Step::new(TokenKind::Semi),
            ],
        );
        let tokens = tokenize("<?php foo;");
        assert_eq!(pattern.find_all(&tokens).unwrap().len(), 1);
        let tokens = tokenize("<?php foo,;");
        assert_eq!(pattern.find_all(&tokens).unwrap().len(), 1);
    }

    #[test]
    fn backward_jump_consumes_a_list() {
        // ident (, ident)* ;
        let pattern = Pattern::new(
            "list",
            vec![
                Step::new(TokenKind::Ident).capture_append("items"),
                Step::new(TokenKind::Comma)
                    .optional()
                    .capture_append("items")
                    .jumps(&[0]),
                Step::new(TokenKind::Semi),
            ],
        );
        let tokens = tokenize("<?php a, b, c;");
        let matches = pattern.find_all(&tokens).unwrap();
        // One full match anchored at `a`, plus suffix matches at `b` and `c` —
        // overlapping matches are all kept.
        assert_eq!(matches[0].capture("items"), Some("a,b,c"));
        assert_eq!(matches.len(), 3);
    }

    #[test]
    fn failed_branches_do_not_leak_captures() {
        // Matches `a , ;` never happens; ensure the comma capture from the
        // failed consuming branch is rolled back before the skip branch wins.
        let pattern = Pattern::new(
            "rollback",
            vec![
                Step::new(TokenKind::Ident).capture("name"),
                Step::new(TokenKind::Comma).optional().capture("sep"),
                Step::new(TokenKind::Semi),
            ],
        );
        let tokens = tokenize("<?php foo , x;");
        let matches = pattern.find_all(&tokens).unwrap();
        // `foo , x ;` — the comma branch consumes `,` but then `x` is not a
        // semi; skipping the comma also fails on `,`. No match anchored at
        // foo; the only match anchors at `x`.
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].capture("name"), Some("x"));
        assert_eq!(matches[0].capture("sep"), None);
    }

    #[test]
    fn overlapping_matches_are_kept() {
        let tokens = tokenize("<?php a; b;");
        let matches = ident_semi_pattern().find_all(&tokens).unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].capture("name"), Some("a"));
        assert_eq!(matches[1].capture("name"), Some("b"));
    }

    #[test]
    fn unconsumed_jump_loops_hit_the_depth_guard() {
        // An optional self-jump never consumes on the retry path; the depth
        // bound turns the loop into an error instead of a hang.
        let pattern = Pattern::new(
            "loop",
            vec![
                Step::new(TokenKind::Ident).optional().jumps(&[0]),
                Step::new(TokenKind::Semi),
            ],
        );
        let tokens = tokenize("<?php foo bar baz");
        let err = pattern.find_all(&tokens).unwrap_err();
        assert!(matches!(err, SyntaxError::MatchDepthExceeded { .. }));
    }

    #[test]
    fn match_reports_token_range() {
        let tokens = tokenize("<?php  foo ;");
        let matches = ident_semi_pattern().find_all(&tokens).unwrap();
        let m = &matches[0];
        assert_eq!(tokens[m.start].text, "foo");
        assert_eq!(tokens[m.end - 1].kind, TokenKind::Semi);
    }
}
