pub type Result<T> = std::result::Result<T, SyntaxError>;

#[derive(Debug, thiserror::Error)]
pub enum SyntaxError {
    #[error("pattern {pattern:?} exceeded the backtracking depth bound")]
    MatchDepthExceeded { pattern: &'static str },

    #[error("unsupported expression in static default: {found}")]
    UnsupportedExpression { found: String },

    #[error("unterminated literal in static default")]
    UnterminatedLiteral,
}
