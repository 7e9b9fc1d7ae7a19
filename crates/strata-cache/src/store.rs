use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::Result;
use crate::key::CacheKey;
use crate::util;

/// An opaque key→blob store used for everything the manifest persists
/// between builds.
///
/// Implementations must make single-key writes atomic: a concurrent reader
/// sees either the old blob or the whole new one, never a torn write. No
/// cross-key transactional guarantees exist, and none are needed — every
/// blob the manifest stores is independently recomputable.
pub trait CacheStore: Send + Sync {
    /// Fetch a blob. Any failure (missing key, corrupt entry, IO error) is a
    /// miss.
    fn load(&self, key: &CacheKey) -> Option<Vec<u8>>;

    /// Persist a blob. Concurrent writers for the same key are
    /// last-writer-wins.
    fn save(&self, key: &CacheKey, bytes: &[u8]) -> Result<()>;

    /// Drop every stored blob.
    fn clear(&self) -> Result<()>;
}

/// Filesystem-backed store: one file per key under a root directory.
///
/// Keys are hex digests, so they are always safe file names. Blobs are
/// sharded by the first two key characters to keep directories small.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &CacheKey) -> PathBuf {
        let hex = key.as_str();
        let shard = &hex[..2.min(hex.len())];
        self.root.join(shard).join(hex)
    }
}

impl CacheStore for FileStore {
    fn load(&self, key: &CacheKey) -> Option<Vec<u8>> {
        util::read_file_limited(&self.path_for(key))
    }

    fn save(&self, key: &CacheKey, bytes: &[u8]) -> Result<()> {
        util::atomic_write(&self.path_for(key), bytes)
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_dir_all(&self.root) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// In-memory store for tests and one-shot builds that should not touch disk.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<CacheKey, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryStore {
    fn load(&self, key: &CacheKey) -> Option<Vec<u8>> {
        self.entries
            .lock()
            .expect("cache mutex poisoned")
            .get(key)
            .cloned()
    }

    fn save(&self, key: &CacheKey, bytes: &[u8]) -> Result<()> {
        self.entries
            .lock()
            .expect("cache mutex poisoned")
            .insert(key.clone(), bytes.to_vec());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.entries.lock().expect("cache mutex poisoned").clear();
        Ok(())
    }
}
