//! Engine fixtures for tests.

use std::sync::Arc;

use super::{InMemoryMaterializer, InMemoryMetadataSink, RecordingSleeper};
use crate::cache::CacheStore;
use crate::context::EngineContext;
use crate::events::CollectingEventSink;

/// An engine context wired to inspectable in-memory components.
///
/// Backoff sleeps are recorded instead of waited for.
#[derive(Debug, Clone)]
pub struct TestHarness {
    /// Records retry delays.
    pub sleeper: Arc<RecordingSleeper>,
    /// Collects emitted events.
    pub events: Arc<CollectingEventSink>,
    /// In-memory cache store.
    pub cache: Arc<CacheStore>,
    /// Collects materialized assets.
    pub materializer: Arc<InMemoryMaterializer>,
    /// Collects run records.
    pub metadata: Arc<InMemoryMetadataSink>,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    /// Creates a harness with fresh components.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sleeper: Arc::new(RecordingSleeper::new()),
            events: Arc::new(CollectingEventSink::new()),
            cache: Arc::new(CacheStore::in_memory()),
            materializer: Arc::new(InMemoryMaterializer::new()),
            metadata: Arc::new(InMemoryMetadataSink::new()),
        }
    }

    /// Returns a context using every harness component.
    #[must_use]
    pub fn context(&self) -> EngineContext {
        self.context_without_cache().with_cache(self.cache.clone())
    }

    /// Returns a context using every harness component except the cache.
    #[must_use]
    pub fn context_without_cache(&self) -> EngineContext {
        EngineContext::new()
            .with_sleeper(self.sleeper.clone())
            .with_event_sink(self.events.clone())
            .with_materializer(self.materializer.clone())
            .with_metadata_sink(self.metadata.clone())
    }
}
