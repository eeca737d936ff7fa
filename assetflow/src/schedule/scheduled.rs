//! Repeated pipeline runs on a fixed period.

use super::{CancellationToken, Ticker};
use crate::core::Bindings;
use crate::errors::AssetflowError;
use crate::pipeline::{Pipeline, PipelineResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Handle to a background schedule started by [`spawn_scheduled`].
#[derive(Debug)]
pub struct ScheduleHandle {
    token: Arc<CancellationToken>,
    handle: JoinHandle<Result<Vec<PipelineResult>, AssetflowError>>,
}

impl ScheduleHandle {
    /// Stops the schedule.
    ///
    /// A run already in progress completes; no further run starts.
    pub fn stop(&self, reason: impl Into<String>) {
        self.token.cancel(reason);
    }

    /// Returns whether a stop has been requested.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Waits for the schedule to end and returns every run's result.
    pub async fn join(self) -> Result<Vec<PipelineResult>, AssetflowError> {
        self.handle
            .await
            .map_err(|e| AssetflowError::Internal(format!("schedule task failed: {e}")))?
    }
}

/// Runs `pipeline` every `period` on a background task.
///
/// The first run starts immediately. The schedule ends when stopped, after
/// `max_runs` runs, or when the pipeline fails to build. Failed runs do not
/// end the schedule.
///
/// # Panics
///
/// Panics if `period` is zero.
pub fn spawn_scheduled(
    pipeline: Arc<Pipeline>,
    period: Duration,
    inputs: Bindings,
    max_runs: Option<usize>,
) -> ScheduleHandle {
    let token = Arc::new(CancellationToken::new());
    let mut ticker = Ticker::new(period, token.clone());

    let handle = tokio::spawn(async move {
        let mut results = Vec::new();
        info!(pipeline = %pipeline.name(), period_ms = period.as_millis(), "Schedule started");

        while max_runs.map_or(true, |max| results.len() < max) {
            if ticker.tick().await.is_none() {
                break;
            }
            let result = pipeline.run(inputs.clone()).await?;
            if !result.success {
                warn!(run_id = %result.run_id, "Scheduled run failed");
            }
            results.push(result);
        }

        info!(
            pipeline = %pipeline.name(),
            runs = results.len(),
            reason = ?ticker.token().reason(),
            "Schedule ended"
        );
        Ok::<_, AssetflowError>(results)
    });

    ScheduleHandle { token, handle }
}
