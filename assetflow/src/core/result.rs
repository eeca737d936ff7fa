//! Per-step execution results.

use super::{Bindings, StepOutput, StepStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Outcome of one step (or one group member) in a run.
///
/// Skips are successes: a skipped step reports `success = true`,
/// `skipped = true` and no output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// The step this result belongs to.
    pub step_name: String,
    /// Terminal status.
    pub status: StepStatus,
    /// Whether the step counts as successful.
    pub success: bool,
    /// The raw value returned by the task (or served from the cache).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    /// The output bound to declared asset names.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub assets: Bindings,
    /// Last error message, if the step failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// One entry per failed attempt.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failure_trace: Vec<String>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: f64,
    /// Whether the output was served from the cache.
    pub cached: bool,
    /// Whether the task was never invoked because of a skip.
    pub skipped: bool,
    /// Number of retries performed (attempts minus one).
    pub retries: u32,
    /// Explanatory note (skip reason, group failure).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Group label, if the step ran as part of a group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// URIs returned by the artifact materializer, keyed by asset name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub artifact_uris: BTreeMap<String, String>,
}

impl ExecutionResult {
    fn base(step_name: &str, status: StepStatus, success: bool) -> Self {
        Self {
            step_name: step_name.to_string(),
            status,
            success,
            output: None,
            assets: Bindings::new(),
            error: None,
            failure_trace: Vec::new(),
            duration_ms: 0.0,
            cached: false,
            skipped: false,
            retries: 0,
            note: None,
            group: None,
            artifact_uris: BTreeMap::new(),
        }
    }

    /// Creates a result for a successful invocation.
    #[must_use]
    pub fn succeeded(step_name: &str, output: &StepOutput, assets: Bindings, retries: u32) -> Self {
        Self {
            output: Some(output.to_value()),
            assets,
            retries,
            ..Self::base(step_name, StepStatus::Success, true)
        }
    }

    /// Creates a result for an output served from the cache.
    #[must_use]
    pub fn from_cache(step_name: &str, output: &StepOutput, assets: Bindings) -> Self {
        Self {
            output: Some(output.to_value()),
            assets,
            cached: true,
            ..Self::base(step_name, StepStatus::CacheHit, true)
        }
    }

    /// Creates a result for a step whose condition prevented it from running.
    #[must_use]
    pub fn skipped(step_name: &str, reason: impl Into<String>) -> Self {
        Self {
            skipped: true,
            note: Some(reason.into()),
            ..Self::base(step_name, StepStatus::Skipped, true)
        }
    }

    /// Creates a result for a group member left unexecuted after an earlier member failed.
    ///
    /// Reported as `success = true` like any other skip, while the failed
    /// member itself stays `success = false`.
    #[must_use]
    pub fn skipped_after_group_failure(step_name: &str, group: &str, failed_member: &str) -> Self {
        Self {
            skipped: true,
            note: Some(format!(
                "not executed: member '{failed_member}' of group '{group}' failed"
            )),
            group: Some(group.to_string()),
            ..Self::base(step_name, StepStatus::Skipped, true)
        }
    }

    /// Creates a result for a step that exhausted its attempts.
    #[must_use]
    pub fn failed(
        step_name: &str,
        error: impl Into<String>,
        failure_trace: Vec<String>,
        retries: u32,
    ) -> Self {
        Self {
            error: Some(error.into()),
            failure_trace,
            retries,
            ..Self::base(step_name, StepStatus::Failed, false)
        }
    }

    /// Sets the duration.
    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Sets the group label.
    #[must_use]
    pub fn with_group(mut self, group: Option<&str>) -> Self {
        self.group = group.map(ToString::to_string);
        self
    }

    /// Returns true if the step failed.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        !self.success
    }

    /// Returns the summary persisted in run records.
    #[must_use]
    pub fn to_summary(&self) -> Value {
        serde_json::json!({
            "success": self.success,
            "duration": self.duration_ms / 1000.0,
            "cached": self.cached,
            "skipped": self.skipped,
            "retries": self.retries,
            "error": self.error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_succeeded_result() {
        let mut assets = Bindings::new();
        assets.insert("x".into(), json!(5));
        let result = ExecutionResult::succeeded("a", &StepOutput::single(5), assets, 2);

        assert!(result.success);
        assert_eq!(result.status, StepStatus::Success);
        assert_eq!(result.output, Some(json!(5)));
        assert_eq!(result.retries, 2);
        assert!(!result.cached);
    }

    #[test]
    fn test_skip_is_success_without_output() {
        let result = ExecutionResult::skipped("a", "condition returned false");
        assert!(result.success);
        assert!(result.skipped);
        assert!(result.output.is_none());
        assert_eq!(result.status, StepStatus::Skipped);
    }

    #[test]
    fn test_group_skip_note_names_failed_member() {
        let result = ExecutionResult::skipped_after_group_failure("c", "gpu", "b");
        assert!(result.success);
        assert!(result.skipped);
        assert_eq!(result.group.as_deref(), Some("gpu"));
        assert!(result.note.unwrap_or_default().contains("'b'"));
    }

    #[test]
    fn test_failed_summary() {
        let result = ExecutionResult::failed("a", "boom", vec!["attempt 1: boom".into()], 1)
            .with_duration_ms(1500.0);
        assert!(result.is_failure());
        assert_eq!(
            result.to_summary(),
            json!({
                "success": false,
                "duration": 1.5,
                "cached": false,
                "skipped": false,
                "retries": 1,
                "error": "boom",
            })
        );
    }
}
