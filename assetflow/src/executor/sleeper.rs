//! Pluggable sleep used for retry backoff.

use async_trait::async_trait;
use std::fmt::Debug;
use std::time::Duration;

/// Suspends the current task between retry attempts.
///
/// The backoff sleep is the only suspension the engine introduces itself;
/// swapping the sleeper lets tests observe the schedule without waiting.
#[async_trait]
pub trait Sleeper: Send + Sync + Debug {
    /// Sleeps for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_tokio_sleeper_advances_clock() {
        let start = tokio::time::Instant::now();
        TokioSleeper.sleep(Duration::from_secs(2)).await;
        assert!(start.elapsed() >= Duration::from_secs(2));
    }
}
