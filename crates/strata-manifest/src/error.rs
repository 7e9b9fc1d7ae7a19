use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, ManifestError>;

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error(transparent)]
    Index(#[from] strata_index::IndexError),

    #[error(transparent)]
    Config(#[from] strata_config::ConfigError),

    #[error(transparent)]
    Cache(#[from] strata_cache::CacheError),
}
