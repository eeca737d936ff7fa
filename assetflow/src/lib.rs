//! # Assetflow
//!
//! A DAG step-execution engine driven by named assets.
//!
//! Steps declare which assets they consume and produce; the engine derives
//! their order from those declarations and runs them with:
//!
//! - **Deterministic ordering**: Kahn's algorithm over producer/consumer edges
//! - **Content-addressed caching**: keys from code and input fingerprints
//! - **Conditional skipping**: run conditions over inputs and run parameters
//! - **Bounded retry**: exponential backoff with optional jitter
//! - **Step grouping**: adjacent same-label steps co-scheduled with merged resources
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use assetflow::prelude::*;
//!
//! let pipeline = Pipeline::new("etl", EngineContext::new())
//!     .with_step(Step::builder("load", load_task).output("raw").build())
//!     .with_step(Step::builder("clean", clean_task).input("raw").output("table").build());
//!
//! let result = pipeline.run(Bindings::new()).await?;
//! println!("{}", result.to_json()?);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cache;
pub mod config;
pub mod context;
pub mod core;
pub mod errors;
pub mod events;
pub mod executor;
pub mod graph;
pub mod hooks;
pub mod observability;
pub mod pipeline;
pub mod schedule;
pub mod step;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cache::{CacheStats, CacheStore};
    pub use crate::config::EngineConfig;
    pub use crate::context::{EngineContext, RunInfo};
    pub use crate::core::{
        AcceleratorTiers, Bindings, ExecutionResult, ResourceRequest, StepOutput, StepStatus,
    };
    pub use crate::errors::{
        AssetflowError, CycleDetectedError, GraphValidationError, PipelineBuildError,
    };
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::executor::{BackoffStrategy, JitterStrategy, RetryConfig};
    pub use crate::graph::{ExecutionUnit, StepGroup};
    pub use crate::hooks::{ArtifactMaterializer, RunMetadataSink};
    pub use crate::pipeline::{Pipeline, PipelineResult};
    pub use crate::schedule::{spawn_scheduled, ScheduleHandle};
    pub use crate::step::{
        AsyncFnTask, CachePolicy, Condition, FnTask, Step, StepBuilder, Task,
    };
    pub use crate::utils::{generate_uuid, iso_timestamp, Timestamp};
}
