//! Run results.

use crate::core::{Bindings, ExecutionResult};
use crate::utils::timestamps::format_timestamp;
use crate::utils::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Outcome of one pipeline run.
///
/// Holds a result for every step that was attempted, in execution order.
/// Steps after the first failed unit were never invoked and are absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Unique ID of the run.
    pub run_id: String,
    /// Name of the pipeline.
    pub pipeline_name: String,
    /// True if no step failed.
    pub success: bool,
    /// When the run started.
    pub start_time: Timestamp,
    /// When the run ended.
    pub end_time: Timestamp,
    /// Per-step results, in execution order.
    pub steps: Vec<ExecutionResult>,
    /// Produced assets, keyed by asset name.
    pub outputs: Bindings,
    /// Each step's raw output, keyed by step name.
    pub step_outputs: Bindings,
}

impl PipelineResult {
    /// Returns a produced asset.
    #[must_use]
    pub fn output(&self, asset: &str) -> Option<&Value> {
        self.outputs.get(asset)
    }

    /// Returns the raw output of a step.
    #[must_use]
    pub fn step_output(&self, step: &str) -> Option<&Value> {
        self.step_outputs.get(step)
    }

    /// Returns the result of a step, if it was attempted.
    #[must_use]
    pub fn step(&self, name: &str) -> Option<&ExecutionResult> {
        self.steps.iter().find(|s| s.step_name == name)
    }

    /// Returns the step that stopped the run.
    #[must_use]
    pub fn failed_step(&self) -> Option<&ExecutionResult> {
        self.steps.iter().find(|s| s.is_failure())
    }

    /// Returns the wall-clock duration of the run in seconds.
    #[must_use]
    pub fn duration_seconds(&self) -> f64 {
        let elapsed = self.end_time - self.start_time;
        #[allow(clippy::cast_precision_loss)]
        let seconds = elapsed
            .num_microseconds()
            .map_or(0.0, |us| us as f64 / 1_000_000.0);
        seconds
    }

    /// Returns the persisted run record.
    ///
    /// `{run_id, pipeline_name, success, start_time, end_time,
    /// duration_seconds, steps: {name: {success, duration, cached, skipped,
    /// retries, error}}}`
    #[must_use]
    pub fn to_dict(&self) -> Value {
        let steps: Map<String, Value> = self
            .steps
            .iter()
            .map(|s| (s.step_name.clone(), s.to_summary()))
            .collect();

        json!({
            "run_id": self.run_id,
            "pipeline_name": self.pipeline_name,
            "success": self.success,
            "start_time": format_timestamp(&self.start_time),
            "end_time": format_timestamp(&self.end_time),
            "duration_seconds": self.duration_seconds(),
            "steps": steps,
        })
    }

    /// Renders [`to_dict`](Self::to_dict) as pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.to_dict())
    }
}
