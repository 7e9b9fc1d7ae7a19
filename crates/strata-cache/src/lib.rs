//! Persistent key→blob storage for manifest builds.
//!
//! Everything the manifest derives (type indexes, per-file parse facts,
//! sorted fragment lists, merged configurations) round-trips through a
//! [`CacheStore`]. Stores are content-addressed: callers hash their inputs
//! into a [`CacheKey`], and a stale or corrupt entry is indistinguishable
//! from an absent one — reads never fail, they miss.

mod error;
mod key;
mod store;
mod util;

pub use error::{CacheError, Result};
pub use key::{CacheKey, KeyHasher};
pub use store::{CacheStore, FileStore, MemoryStore};
pub use util::{atomic_write, decode, encode, PAYLOAD_LIMIT_BYTES};
