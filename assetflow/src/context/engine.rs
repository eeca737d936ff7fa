//! The engine context.

use super::CONTEXT_PARAMS;
use crate::cache::CacheStore;
use crate::config::EngineConfig;
use crate::core::{AcceleratorTiers, Bindings};
use crate::events::{EventSink, NoOpEventSink};
use crate::executor::{RetryConfig, Sleeper, TokioSleeper};
use crate::hooks::{ArtifactMaterializer, RunMetadataSink};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Components shared by every run of a pipeline.
///
/// A default context has no cache, no hooks, discards events and sleeps on
/// the tokio timer.
#[derive(Clone)]
pub struct EngineContext {
    cache: Option<Arc<CacheStore>>,
    materializer: Option<Arc<dyn ArtifactMaterializer>>,
    metadata_sink: Option<Arc<dyn RunMetadataSink>>,
    event_sink: Arc<dyn EventSink>,
    sleeper: Arc<dyn Sleeper>,
    tiers: AcceleratorTiers,
    retry: RetryConfig,
    params: Bindings,
}

impl Default for EngineContext {
    fn default() -> Self {
        Self {
            cache: None,
            materializer: None,
            metadata_sink: None,
            event_sink: Arc::new(NoOpEventSink),
            sleeper: Arc::new(TokioSleeper),
            tiers: AcceleratorTiers::default(),
            retry: RetryConfig::default(),
            params: Bindings::new(),
        }
    }
}

impl EngineContext {
    /// Creates a default context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context from loaded configuration.
    ///
    /// With caching enabled, the cache lives in `cache_dir` when one is set
    /// and in memory otherwise.
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        let cache = config.cache_enabled.then(|| {
            Arc::new(match &config.cache_dir {
                Some(dir) => CacheStore::open(dir),
                None => CacheStore::in_memory(),
            })
        });
        Self {
            cache,
            retry: config.retry.clone(),
            ..Self::default()
        }
    }

    /// Sets the cache store.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Removes the cache store; every policy then behaves as disabled.
    #[must_use]
    pub fn without_cache(mut self) -> Self {
        self.cache = None;
        self
    }

    /// Sets the artifact materializer.
    #[must_use]
    pub fn with_materializer(mut self, materializer: Arc<dyn ArtifactMaterializer>) -> Self {
        self.materializer = Some(materializer);
        self
    }

    /// Sets the run-metadata sink.
    #[must_use]
    pub fn with_metadata_sink(mut self, sink: Arc<dyn RunMetadataSink>) -> Self {
        self.metadata_sink = Some(sink);
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Sets the sleeper used for retry backoff.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Sets the accelerator capability table.
    #[must_use]
    pub fn with_accelerator_tiers(mut self, tiers: AcceleratorTiers) -> Self {
        self.tiers = tiers;
        self
    }

    /// Sets the retry delay schedule.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Registers a named run parameter that conditions may read.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Returns the cache store.
    #[must_use]
    pub fn cache(&self) -> Option<&Arc<CacheStore>> {
        self.cache.as_ref()
    }

    /// Returns the artifact materializer.
    #[must_use]
    pub fn materializer(&self) -> Option<&Arc<dyn ArtifactMaterializer>> {
        self.materializer.as_ref()
    }

    /// Returns the run-metadata sink.
    #[must_use]
    pub fn metadata_sink(&self) -> Option<&Arc<dyn RunMetadataSink>> {
        self.metadata_sink.as_ref()
    }

    /// Returns the event sink.
    #[must_use]
    pub fn event_sink(&self) -> &Arc<dyn EventSink> {
        &self.event_sink
    }

    /// Returns the sleeper.
    #[must_use]
    pub fn sleeper(&self) -> &Arc<dyn Sleeper> {
        &self.sleeper
    }

    /// Returns the accelerator capability table.
    #[must_use]
    pub fn accelerator_tiers(&self) -> &AcceleratorTiers {
        &self.tiers
    }

    /// Returns the retry delay schedule.
    #[must_use]
    pub fn retry(&self) -> &RetryConfig {
        &self.retry
    }

    /// Returns the registered run parameters.
    #[must_use]
    pub fn params(&self) -> &Bindings {
        &self.params
    }

    /// Returns true if a condition may read `name` without it being a step input.
    #[must_use]
    pub fn provides_param(&self, name: &str) -> bool {
        CONTEXT_PARAMS.contains(&name) || self.params.contains_key(name)
    }
}

impl fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineContext")
            .field("cache", &self.cache.is_some())
            .field("materializer", &self.materializer.is_some())
            .field("metadata_sink", &self.metadata_sink.is_some())
            .field("event_sink", &self.event_sink)
            .field("sleeper", &self.sleeper)
            .field("retry", &self.retry)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    #[test]
    fn test_default_context_has_no_cache() {
        let ctx = EngineContext::new();
        assert!(ctx.cache().is_none());
        assert!(ctx.materializer().is_none());
        assert!(ctx.metadata_sink().is_none());
        assert_eq!(ctx.retry().base_delay_ms, 1000);
    }

    #[test]
    fn test_params_are_provided() {
        let ctx = EngineContext::new().with_param("threshold", 0.5);
        assert!(ctx.provides_param("threshold"));
        assert!(ctx.provides_param("run_id"));
        assert!(ctx.provides_param("step_name"));
        assert!(!ctx.provides_param("other"));
        assert_eq!(ctx.params().get("threshold"), Some(&json!(0.5)));
    }

    #[test]
    fn test_from_config_respects_cache_switch() {
        let mut config = EngineConfig::default();
        assert!(EngineContext::from_config(&config).cache().is_some());

        config.cache_enabled = false;
        config.cache_dir = Some(PathBuf::from("/nonexistent"));
        assert!(EngineContext::from_config(&config).cache().is_none());
    }

    #[test]
    fn test_from_config_copies_retry() {
        let mut config = EngineConfig::default();
        config.retry.base_delay_ms = 5;
        assert_eq!(EngineContext::from_config(&config).retry().base_delay_ms, 5);
    }
}
