//! The cache store.

use super::{CacheBackend, CacheEntryMeta, CacheStats, FsCacheBackend, MemoryCacheBackend};
use crate::core::{Bindings, StepOutput};
use crate::errors::CacheError;
use crate::step::ValueCodec;
use crate::utils::{digest_hex, now_utc};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Persists step outputs across runs.
///
/// Lookups never fail: an unknown key, an unreadable blob, a codec tag
/// mismatch or a decode error are all reported as a miss.
///
/// Each write reads, modifies and rewrites the whole index. Two stores
/// sharing a directory can lose each other's index updates; no locking is
/// attempted.
#[derive(Debug)]
pub struct CacheStore {
    backend: Arc<dyn CacheBackend>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheStore {
    /// Creates a store over any backend.
    #[must_use]
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Creates a store persisting to `dir`.
    #[must_use]
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FsCacheBackend::new(dir)))
    }

    /// Creates a store that lives only as long as the process.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCacheBackend::new()))
    }

    /// Returns the filesystem-safe digest naming the entry for `key`.
    #[must_use]
    pub fn digest_for(key: &str) -> String {
        digest_hex(key.as_bytes())
    }

    /// Looks up a value.
    pub fn get(&self, key: &str, codec: &dyn ValueCodec) -> Option<StepOutput> {
        let value = self.lookup(key, codec);
        self.record(value.is_some());
        value
    }

    /// Looks up a value and binds it to `step`'s declared output names.
    ///
    /// A stored value whose shape no longer fits `declared` counts as a miss.
    pub fn get_bound(
        &self,
        key: &str,
        codec: &dyn ValueCodec,
        step: &str,
        declared: &[String],
    ) -> Option<(StepOutput, Bindings)> {
        let bound = self.lookup(key, codec).and_then(|value| {
            match value.bind(step, declared) {
                Ok(assets) => Some((value, assets)),
                Err(e) => {
                    debug!(cache_key = %key, error = %e, "Cached value no longer fits outputs");
                    None
                }
            }
        });
        self.record(bound.is_some());
        bound
    }

    fn record(&self, hit: bool) {
        let counter = if hit { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn lookup(&self, key: &str, codec: &dyn ValueCodec) -> Option<StepOutput> {
        let digest = Self::digest_for(key);

        let index = match self.backend.load_index() {
            Ok(index) => index,
            Err(e) => {
                warn!(error = %e, "Cache index unreadable, treating lookup as miss");
                return None;
            }
        };
        let meta = index.get(&digest)?;
        if meta.type_tag != codec.type_tag() {
            debug!(
                cache_key = %key,
                stored = %meta.type_tag,
                expected = %codec.type_tag(),
                "Cache entry has a different codec"
            );
            return None;
        }

        let bytes = match self.backend.read_blob(&digest) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!(cache_key = %key, error = %e, "Cache blob unreadable");
                return None;
            }
        };

        match codec.decode(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(cache_key = %key, error = %e, "Cache entry failed to decode");
                None
            }
        }
    }

    /// Stores a value and records its metadata.
    ///
    /// An unreadable index is replaced rather than preventing the write.
    pub fn set(
        &self,
        key: &str,
        value: &StepOutput,
        codec: &dyn ValueCodec,
        step_name: &str,
        code_fingerprint: &str,
    ) -> Result<(), CacheError> {
        let digest = Self::digest_for(key);
        let bytes = codec.encode(value)?;
        self.backend.write_blob(&digest, &bytes)?;

        let mut index = self.backend.load_index().unwrap_or_else(|e| {
            warn!(error = %e, "Cache index unreadable, starting a new one");
            super::CacheIndex::new()
        });
        index.insert(
            digest.clone(),
            CacheEntryMeta {
                key: key.to_string(),
                digest,
                step_name: step_name.to_string(),
                code_fingerprint: code_fingerprint.to_string(),
                type_tag: codec.type_tag().to_string(),
                size_bytes: bytes.len() as u64,
                created_at: now_utc(),
            },
        );
        self.backend.save_index(&index)?;
        debug!(cache_key = %key, step = %step_name, size_bytes = bytes.len(), "Cached step output");
        Ok(())
    }

    /// Removes entries and returns how many were removed.
    ///
    /// With a `key`, removes that entry only. Otherwise, with a `step_name`,
    /// removes every entry owned by that step. With neither, removes everything,
    /// including blobs an unreadable index no longer accounts for.
    pub fn invalidate(
        &self,
        key: Option<&str>,
        step_name: Option<&str>,
    ) -> Result<usize, CacheError> {
        let mut index = match self.backend.load_index() {
            Ok(index) => index,
            Err(e) if key.is_none() && step_name.is_none() => {
                warn!(error = %e, "Cache index unreadable, removing every stored blob");
                return self.wipe();
            }
            Err(e) => return Err(e),
        };

        let doomed: Vec<String> = match (key, step_name) {
            (Some(key), _) => {
                let digest = Self::digest_for(key);
                if index.contains_key(&digest) {
                    vec![digest]
                } else {
                    Vec::new()
                }
            }
            (None, Some(step)) => index
                .values()
                .filter(|m| m.step_name == step)
                .map(|m| m.digest.clone())
                .collect(),
            (None, None) => index.keys().cloned().collect(),
        };

        for digest in &doomed {
            self.backend.remove_blob(digest)?;
            index.remove(digest);
        }
        self.backend.save_index(&index)?;
        debug!(removed = doomed.len(), "Invalidated cache entries");
        Ok(doomed.len())
    }

    /// Removes every entry.
    pub fn clear(&self) -> Result<usize, CacheError> {
        self.invalidate(None, None)
    }

    fn wipe(&self) -> Result<usize, CacheError> {
        let digests = self.backend.list_blobs()?;
        for digest in &digests {
            self.backend.remove_blob(digest)?;
        }
        self.backend.save_index(&super::CacheIndex::new())?;
        debug!(removed = digests.len(), "Wiped cache");
        Ok(digests.len())
    }

    /// Returns true if an entry is recorded for `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.backend
            .load_index()
            .is_ok_and(|index| index.contains_key(&Self::digest_for(key)))
    }

    /// Lists recorded entries, newest first.
    pub fn entries(&self) -> Result<Vec<CacheEntryMeta>, CacheError> {
        let mut entries: Vec<CacheEntryMeta> =
            self.backend.load_index()?.into_values().collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    /// Returns usage statistics. An unreadable index reports no entries.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let index = self.backend.load_index().unwrap_or_default();
        CacheStats::from_index(
            &index,
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::JsonCodec;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    #[derive(Debug)]
    struct OtherCodec;

    impl ValueCodec for OtherCodec {
        fn type_tag(&self) -> &str {
            "other/v1"
        }

        fn encode(&self, value: &StepOutput) -> Result<Vec<u8>, crate::errors::CodecError> {
            JsonCodec.encode(value)
        }

        fn decode(&self, bytes: &[u8]) -> Result<StepOutput, crate::errors::CodecError> {
            JsonCodec.decode(bytes)
        }
    }

    #[test]
    fn test_round_trip_counts_hits_and_misses() {
        let store = CacheStore::in_memory();
        let value = StepOutput::single(json!({"rows": 3}));

        assert_eq!(store.get("a:fp", &JsonCodec), None);
        assert_eq!(store.stats().misses, 1);

        store.set("a:fp", &value, &JsonCodec, "a", "fp").unwrap();
        assert_eq!(store.get("a:fp", &JsonCodec), Some(value.clone()));
        assert_eq!(store.get("a:fp", &JsonCodec), Some(value));

        let stats = store.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 1);
    }

    #[test]
    fn test_fs_store_persists_across_instances() {
        let tmp = TempDir::new().unwrap();
        let value = StepOutput::tuple([json!(1), json!("two")]);

        CacheStore::open(tmp.path())
            .set("s:fp", &value, &JsonCodec, "s", "fp")
            .unwrap();

        let reopened = CacheStore::open(tmp.path());
        assert_eq!(reopened.stats().hits, 0);
        assert!(reopened.contains("s:fp"));
        assert_eq!(reopened.get("s:fp", &JsonCodec), Some(value));

        let digest = CacheStore::digest_for("s:fp");
        assert!(tmp.path().join(format!("{digest}.bin")).exists());
        assert!(tmp.path().join("index.json").exists());
    }

    #[test]
    fn test_corrupt_blob_is_a_miss() {
        let backend = Arc::new(MemoryCacheBackend::new());
        let store = CacheStore::new(backend.clone());
        store
            .set("k", &StepOutput::single(1), &JsonCodec, "s", "fp")
            .unwrap();

        backend
            .write_blob(&CacheStore::digest_for("k"), b"\xffgarbage")
            .unwrap();

        assert_eq!(store.get("k", &JsonCodec), None);
        assert_eq!(store.stats().misses, 1);
    }

    #[test]
    fn test_corrupt_index_is_a_miss() {
        let tmp = TempDir::new().unwrap();
        let store = CacheStore::open(tmp.path());
        store
            .set("k", &StepOutput::single(1), &JsonCodec, "s", "fp")
            .unwrap();
        fs::write(tmp.path().join("index.json"), "garbage").unwrap();

        assert_eq!(store.get("k", &JsonCodec), None);
        assert_eq!(store.stats().total_entries, 0);
    }

    #[test]
    fn test_clear_recovers_from_corrupt_index() {
        let tmp = TempDir::new().unwrap();
        let store = CacheStore::open(tmp.path());
        store
            .set("k", &StepOutput::single(1), &JsonCodec, "s", "fp")
            .unwrap();
        fs::write(tmp.path().join(FsCacheBackend::INDEX_FILE), "{oops").unwrap();

        assert!(store.invalidate(None, Some("s")).is_err());
        assert_eq!(store.clear().unwrap(), 1);

        let digest = CacheStore::digest_for("k");
        assert!(!tmp.path().join(format!("{digest}.bin")).exists());
        assert!(store.entries().unwrap().is_empty());
        assert!(!store.contains("k"));
        assert_eq!(store.get("k", &JsonCodec), None);
    }

    #[test]
    fn test_shape_mismatch_counts_as_miss() {
        let store = CacheStore::in_memory();
        store
            .set("k", &StepOutput::single(1), &JsonCodec, "s", "fp")
            .unwrap();
        let pair = vec!["x".to_string(), "y".to_string()];
        let one = vec!["x".to_string()];

        assert_eq!(store.get_bound("k", &JsonCodec, "s", &pair), None);
        let stats = store.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 1);

        let (value, assets) = store.get_bound("k", &JsonCodec, "s", &one).unwrap();
        assert_eq!(value, StepOutput::single(1));
        assert_eq!(assets.get("x"), Some(&json!(1)));
        assert_eq!(store.stats().hits, 1);
    }

    #[test]
    fn test_codec_mismatch_is_a_miss() {
        let store = CacheStore::in_memory();
        store
            .set("k", &StepOutput::single(1), &JsonCodec, "s", "fp")
            .unwrap();
        assert_eq!(store.get("k", &OtherCodec), None);
        assert!(store.get("k", &JsonCodec).is_some());
    }

    #[test]
    fn test_invalidate_by_key_step_and_all() {
        let store = CacheStore::in_memory();
        for (key, step) in [("a:1", "a"), ("a:2", "a"), ("b:1", "b"), ("c:1", "c")] {
            store
                .set(key, &StepOutput::single(json!(key)), &JsonCodec, step, "fp")
                .unwrap();
        }

        assert_eq!(store.invalidate(Some("b:1"), None).unwrap(), 1);
        assert!(!store.contains("b:1"));
        assert_eq!(store.invalidate(Some("missing"), None).unwrap(), 0);

        assert_eq!(store.invalidate(None, Some("a")).unwrap(), 2);
        assert_eq!(store.get("a:1", &JsonCodec), None);
        assert!(store.contains("c:1"));

        assert_eq!(store.clear().unwrap(), 1);
        assert_eq!(store.stats().total_entries, 0);
    }

    #[test]
    fn test_stats_break_down_by_step() {
        let store = CacheStore::in_memory();
        store
            .set("a:1", &StepOutput::single(json!("x")), &JsonCodec, "a", "fp")
            .unwrap();
        store
            .set("b:1", &StepOutput::single(json!("yy")), &JsonCodec, "b", "fp")
            .unwrap();

        let stats = store.stats();
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.by_step.len(), 2);
        assert_eq!(stats.by_step.get("a").map(|s| s.count), Some(1));
        assert_eq!(
            stats.total_size_bytes,
            stats.by_step.values().map(|s| s.size_bytes).sum::<u64>()
        );
    }

    #[test]
    fn test_entries_record_metadata() {
        let store = CacheStore::in_memory();
        store
            .set("a:fp", &StepOutput::Unit, &JsonCodec, "a", "fp")
            .unwrap();

        let entries = store.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, "a:fp");
        assert_eq!(entries[0].step_name, "a");
        assert_eq!(entries[0].code_fingerprint, "fp");
        assert_eq!(entries[0].type_tag, JsonCodec::TAG);
        assert_eq!(entries[0].digest, CacheStore::digest_for("a:fp"));
    }
}
