//! Content-addressed cache for step outputs.
//!
//! Values are stored as codec-encoded bytes under a SHA-256 digest of the
//! cache key, next to a single JSON index holding per-entry metadata.

mod backend;
mod entry;
mod store;

pub use backend::{CacheBackend, FsCacheBackend, MemoryCacheBackend};
pub use entry::{CacheEntryMeta, CacheIndex, CacheStats, StepCacheStats};
pub use store::CacheStore;
