//! Cache entry metadata and statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metadata recorded for one stored value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntryMeta {
    /// The cache key as computed by the step.
    pub key: String,
    /// Filesystem-safe digest of the key; names the stored blob.
    pub digest: String,
    /// The step that produced the value.
    pub step_name: String,
    /// The producing step's code fingerprint.
    pub code_fingerprint: String,
    /// Codec tag the bytes were written with.
    pub type_tag: String,
    /// Size of the encoded value in bytes.
    pub size_bytes: u64,
    /// When the entry was written.
    pub created_at: DateTime<Utc>,
}

/// Every entry's metadata, keyed by digest.
pub type CacheIndex = BTreeMap<String, CacheEntryMeta>;

/// Per-step slice of [`CacheStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepCacheStats {
    /// Number of entries owned by the step.
    pub count: usize,
    /// Total encoded size of those entries.
    pub size_bytes: u64,
}

/// Cache usage statistics.
///
/// Entry counts and sizes come from the persisted index; hits and misses are
/// counters on the store instance and start at zero for every new store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of stored entries.
    pub total_entries: usize,
    /// Total encoded size of all entries.
    pub total_size_bytes: u64,
    /// Lookups that returned a value.
    pub hits: u64,
    /// Lookups that returned nothing.
    pub misses: u64,
    /// `hits / (hits + misses)`, or 0 before any lookup.
    pub hit_rate: f64,
    /// Breakdown by owning step.
    pub by_step: BTreeMap<String, StepCacheStats>,
}

impl CacheStats {
    /// Builds statistics from an index and the lookup counters.
    #[must_use]
    pub fn from_index(index: &CacheIndex, hits: u64, misses: u64) -> Self {
        let mut by_step: BTreeMap<String, StepCacheStats> = BTreeMap::new();
        for meta in index.values() {
            let slot = by_step.entry(meta.step_name.clone()).or_default();
            slot.count += 1;
            slot.size_bytes += meta.size_bytes;
        }

        let lookups = hits + misses;
        #[allow(clippy::cast_precision_loss)]
        let hit_rate = if lookups == 0 {
            0.0
        } else {
            hits as f64 / lookups as f64
        };

        Self {
            total_entries: index.len(),
            total_size_bytes: index.values().map(|m| m.size_bytes).sum(),
            hits,
            misses,
            hit_rate,
            by_step,
        }
    }
}
