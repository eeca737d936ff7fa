//! Testing utilities for assetflow pipelines.
//!
//! This module provides:
//! - Mock tasks (counting, flaky, failing, panicking)
//! - In-memory hooks and a recording sleeper
//! - A harness wiring them into an engine context
//! - Assertions on step results

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{
    assert_step_cached, assert_step_failed, assert_step_skipped, assert_step_succeeded,
    assert_steps_ran,
};
pub use fixtures::TestHarness;
pub use mocks::{
    CountingTask, FailingTask, FlakyTask, InMemoryMaterializer, InMemoryMetadataSink,
    MaterializedAsset, PanickingTask, RecordingSleeper,
};
