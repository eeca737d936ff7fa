//! Mock tasks and hooks for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::time::Duration;

use crate::core::{Bindings, StepOutput};
use crate::executor::Sleeper;
use crate::hooks::{ArtifactMaterializer, RunMetadataSink};
use crate::step::Task;

/// A task that records its inputs and returns a fixed output.
#[derive(Debug)]
pub struct CountingTask {
    output: Mutex<StepOutput>,
    calls: Mutex<Vec<Bindings>>,
}

impl CountingTask {
    /// Creates a task returning `output`.
    #[must_use]
    pub fn new(output: StepOutput) -> Self {
        Self {
            output: Mutex::new(output),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Creates a task returning a single value.
    #[must_use]
    pub fn returning(value: impl Into<Value>) -> Self {
        Self::new(StepOutput::single(value))
    }

    /// Replaces the output.
    pub fn set_output(&self, output: StepOutput) {
        *self.output.lock() = output;
    }

    /// Returns the number of invocations.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Returns the inputs of every invocation.
    #[must_use]
    pub fn recorded_inputs(&self) -> Vec<Bindings> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Task for CountingTask {
    async fn run(&self, inputs: &Bindings) -> anyhow::Result<StepOutput> {
        self.calls.lock().push(inputs.clone());
        Ok(self.output.lock().clone())
    }
}

/// A task that fails a fixed number of times, then succeeds.
#[derive(Debug)]
pub struct FlakyTask {
    failures: usize,
    output: StepOutput,
    calls: Mutex<usize>,
}

impl FlakyTask {
    /// Creates a task failing `failures` times before returning `output`.
    #[must_use]
    pub fn new(failures: usize, output: StepOutput) -> Self {
        Self {
            failures,
            output,
            calls: Mutex::new(0),
        }
    }

    /// Returns the number of invocations.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.calls.lock()
    }
}

#[async_trait]
impl Task for FlakyTask {
    async fn run(&self, _inputs: &Bindings) -> anyhow::Result<StepOutput> {
        let call = {
            let mut calls = self.calls.lock();
            *calls += 1;
            *calls
        };
        if call <= self.failures {
            anyhow::bail!("transient failure {call}");
        }
        Ok(self.output.clone())
    }
}

/// A task that always fails.
#[derive(Debug)]
pub struct FailingTask {
    error: String,
    calls: Mutex<usize>,
}

impl FailingTask {
    /// Creates a task failing with `error`.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            calls: Mutex::new(0),
        }
    }

    /// Returns the number of invocations.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.calls.lock()
    }
}

#[async_trait]
impl Task for FailingTask {
    async fn run(&self, _inputs: &Bindings) -> anyhow::Result<StepOutput> {
        *self.calls.lock() += 1;
        Err(anyhow::anyhow!(self.error.clone()))
    }
}

/// A task that panics.
#[derive(Debug)]
pub struct PanickingTask {
    message: String,
}

impl PanickingTask {
    /// Creates a task panicking with `message`.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl Task for PanickingTask {
    async fn run(&self, _inputs: &Bindings) -> anyhow::Result<StepOutput> {
        panic!("{}", self.message);
    }
}

/// A sleeper that records requested delays and returns immediately.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every requested delay, in order.
    #[must_use]
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }

    /// Returns the sum of requested delays.
    #[must_use]
    pub fn total(&self) -> Duration {
        self.sleeps.lock().iter().sum()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().push(duration);
    }
}

/// A materialized asset.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterializedAsset {
    /// Asset name.
    pub name: String,
    /// Run the asset belongs to.
    pub run_id: String,
    /// Producing step.
    pub step_name: String,
    /// Stored value.
    pub value: Value,
}

/// Keeps materialized assets in memory.
#[derive(Debug, Default)]
pub struct InMemoryMaterializer {
    stored: Mutex<Vec<MaterializedAsset>>,
    fail_with: Option<String>,
}

impl InMemoryMaterializer {
    /// Creates an empty materializer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a materializer that rejects every asset.
    #[must_use]
    pub fn failing(error: impl Into<String>) -> Self {
        Self {
            stored: Mutex::new(Vec::new()),
            fail_with: Some(error.into()),
        }
    }

    /// Returns every stored asset.
    #[must_use]
    pub fn stored(&self) -> Vec<MaterializedAsset> {
        self.stored.lock().clone()
    }
}

impl ArtifactMaterializer for InMemoryMaterializer {
    fn materialize(
        &self,
        value: &Value,
        name: &str,
        run_id: &str,
        step_name: &str,
    ) -> anyhow::Result<String> {
        if let Some(error) = &self.fail_with {
            anyhow::bail!("{error}");
        }
        self.stored.lock().push(MaterializedAsset {
            name: name.to_string(),
            run_id: run_id.to_string(),
            step_name: step_name.to_string(),
            value: value.clone(),
        });
        Ok(format!("memory://{run_id}/{step_name}/{name}"))
    }
}

/// Keeps run records in memory.
#[derive(Debug, Default)]
pub struct InMemoryMetadataSink {
    runs: Mutex<Vec<(String, Value)>>,
}

impl InMemoryMetadataSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every saved record, in order.
    #[must_use]
    pub fn runs(&self) -> Vec<(String, Value)> {
        self.runs.lock().clone()
    }

    /// Returns the record saved for `run_id`.
    #[must_use]
    pub fn run(&self, run_id: &str) -> Option<Value> {
        self.runs
            .lock()
            .iter()
            .find(|(id, _)| id == run_id)
            .map(|(_, record)| record.clone())
    }
}

impl RunMetadataSink for InMemoryMetadataSink {
    fn save_run(&self, run_id: &str, metadata: &Value) -> anyhow::Result<()> {
        self.runs.lock().push((run_id.to_string(), metadata.clone()));
        Ok(())
    }
}
