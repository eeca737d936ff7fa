//! Cancellable interval ticker.

use super::CancellationToken;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, Instant, Interval, MissedTickBehavior};

/// Yields at a fixed period until its token is cancelled.
///
/// The first tick completes immediately. Ticks missed because a run took
/// longer than the period are delayed, not bunched.
#[derive(Debug)]
pub struct Ticker {
    interval: Interval,
    token: Arc<CancellationToken>,
}

impl Ticker {
    /// Creates a ticker with the given period.
    ///
    /// # Panics
    ///
    /// Panics if `period` is zero.
    #[must_use]
    pub fn new(period: Duration, token: Arc<CancellationToken>) -> Self {
        let mut interval = interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval, token }
    }

    /// Returns the ticker's token.
    #[must_use]
    pub fn token(&self) -> &Arc<CancellationToken> {
        &self.token
    }

    /// Waits for the next tick.
    ///
    /// Returns `None` once the token is cancelled, even if a tick is due.
    pub async fn tick(&mut self) -> Option<Instant> {
        if self.token.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            () = self.token.cancelled() => None,
            instant = self.interval.tick() => Some(instant),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_ticks_at_period() {
        let token = Arc::new(CancellationToken::new());
        let mut ticker = Ticker::new(Duration::from_secs(10), token);

        let first = ticker.tick().await.unwrap();
        let second = ticker.tick().await.unwrap();
        assert_eq!(second - first, Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_ticker() {
        let token = Arc::new(CancellationToken::new());
        let mut ticker = Ticker::new(Duration::from_secs(10), token.clone());

        assert!(ticker.tick().await.is_some());
        token.cancel("shutdown");
        assert!(ticker.tick().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_pending_tick() {
        let token = Arc::new(CancellationToken::new());
        let mut ticker = Ticker::new(Duration::from_secs(3600), token.clone());
        ticker.tick().await;

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            canceller.cancel("early");
        });

        assert!(ticker.tick().await.is_none());
        assert_eq!(token.reason().as_deref(), Some("early"));
    }
}
