use std::fmt;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::Result;

/// A stable SHA-256 cache key stored as a lowercase hex string.
///
/// Keys are pure functions of their inputs: the same bytes always produce the
/// same key, on any host. Multi-part keys are built with [`KeyHasher`], which
/// length-prefixes each part so `("ab", "c")` and `("a", "bc")` never collide.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Compute the key of an arbitrary byte slice.
    pub fn of_bytes(bytes: impl AsRef<[u8]>) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes.as_ref());
        Self(hex::encode(hasher.finalize()))
    }

    /// Compute the key of a file's contents.
    ///
    /// Streams in fixed-size chunks so large sources are never read into
    /// memory at once.
    pub fn of_file(path: impl AsRef<Path>) -> Result<Self> {
        let mut file = std::fs::File::open(path)?;
        let mut hasher = Sha256::new();
        let mut buf = [0_u8; 64 * 1024];
        loop {
            let read = file.read(&mut buf)?;
            if read == 0 {
                break;
            }
            hasher.update(&buf[..read]);
        }
        Ok(Self(hex::encode(hasher.finalize())))
    }

    /// Start a multi-part key.
    pub fn hasher() -> KeyHasher {
        KeyHasher::default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Incremental builder for keys derived from several inputs.
#[derive(Default)]
pub struct KeyHasher {
    inner: Sha256,
}

impl KeyHasher {
    pub fn update(mut self, part: impl AsRef<[u8]>) -> Self {
        let part = part.as_ref();
        self.inner.update((part.len() as u64).to_le_bytes());
        self.inner.update(part);
        self
    }

    pub fn finish(self) -> CacheKey {
        CacheKey(hex::encode(self.inner.finalize()))
    }
}
