//! Wall-clock timing for steps and runs.

use std::time::{Duration, Instant};
use tracing::debug;

/// Measures a labelled stretch of work and logs it when finished.
#[derive(Debug)]
pub struct SpanTimer {
    label: String,
    started: Instant,
}

impl SpanTimer {
    /// Starts timing `label`.
    #[must_use]
    pub fn start(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            started: Instant::now(),
        }
    }

    /// Time since the timer started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// The label passed to [`start`](Self::start).
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Stops the timer, logs the elapsed time and returns it in milliseconds.
    pub fn finish(self) -> f64 {
        let elapsed_ms = self.elapsed().as_secs_f64() * 1000.0;
        debug!(span = %self.label, elapsed_ms, "Timed span finished");
        elapsed_ms
    }
}
