//! Assertions on step results.

use crate::core::{ExecutionResult, StepStatus};
use crate::pipeline::PipelineResult;

/// Asserts that the step ran (or was served from cache) successfully.
pub fn assert_step_succeeded(result: &ExecutionResult) {
    assert!(
        result.success && !result.skipped,
        "Expected step '{}' to succeed, got {:?}: {:?}",
        result.step_name,
        result.status,
        result.error
    );
}

/// Asserts that the step failed.
pub fn assert_step_failed(result: &ExecutionResult) {
    assert!(
        !result.success,
        "Expected step '{}' to fail, got {:?}",
        result.step_name, result.status
    );
}

/// Asserts that the step was skipped.
pub fn assert_step_skipped(result: &ExecutionResult) {
    assert!(
        result.skipped && result.success && result.output.is_none(),
        "Expected step '{}' to be skipped, got {:?}",
        result.step_name,
        result.status
    );
}

/// Asserts that the step's output came from the cache.
pub fn assert_step_cached(result: &ExecutionResult) {
    assert!(
        result.cached && result.status == StepStatus::CacheHit,
        "Expected step '{}' to be a cache hit, got {:?}",
        result.step_name,
        result.status
    );
}

/// Asserts that a run contains exactly these steps, in this order.
pub fn assert_steps_ran(result: &PipelineResult, expected: &[&str]) {
    let actual: Vec<&str> = result.steps.iter().map(|s| s.step_name.as_str()).collect();
    assert_eq!(actual, expected, "Unexpected steps in run '{}'", result.run_id);
}
