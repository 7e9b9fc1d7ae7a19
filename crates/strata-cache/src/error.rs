pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors produced by cache persistence.
///
/// Read-side problems (missing key, corrupt blob, oversized payload) are
/// deliberately *not* represented here: they degrade to a cache miss at the
/// call site. Only write failures and encoding bugs surface as errors.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
