//! Event emission for pipeline observability.
//!
//! The engine reports lifecycle events to the [`EventSink`] carried by its
//! [`EngineContext`](crate::context::EngineContext). There is no process-wide
//! sink; each context owns its own.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink, RecordedEvent};

/// Event type names emitted by the engine.
pub mod types {
    /// A run has started.
    pub const PIPELINE_STARTED: &str = "pipeline.started";
    /// A run finished with every executed step successful.
    pub const PIPELINE_COMPLETED: &str = "pipeline.completed";
    /// A run stopped at a failed step.
    pub const PIPELINE_FAILED: &str = "pipeline.failed";
    /// A step is about to be checked and executed.
    pub const STEP_STARTED: &str = "step.started";
    /// A step's condition prevented it from running.
    pub const STEP_SKIPPED: &str = "step.skipped";
    /// A step's output was served from the cache.
    pub const STEP_CACHE_HIT: &str = "step.cache_hit";
    /// A step attempt failed and another will follow.
    pub const STEP_RETRYING: &str = "step.retrying";
    /// A step produced its output.
    pub const STEP_COMPLETED: &str = "step.completed";
    /// A step exhausted its attempts.
    pub const STEP_FAILED: &str = "step.failed";
    /// A group member was not executed because an earlier member failed.
    pub const GROUP_MEMBER_SKIPPED: &str = "group.member_skipped";
}
