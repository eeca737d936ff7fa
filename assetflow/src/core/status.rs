//! Step status enum.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The execution status of a step invocation.
///
/// A step moves `Pending -> Running -> (Retrying -> Running)* -> Success | Failed`,
/// or short-circuits to `Skipped` (condition) or `CacheHit` before running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Step is waiting to run.
    #[default]
    Pending,
    /// Step's condition prevented it from running.
    Skipped,
    /// Step output was served from the cache.
    CacheHit,
    /// Step is currently running.
    Running,
    /// Step failed an attempt and is waiting to retry.
    Retrying,
    /// Step completed successfully.
    Success,
    /// Step failed after exhausting its retries.
    Failed,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Skipped => write!(f, "skipped"),
            Self::CacheHit => write!(f, "cache_hit"),
            Self::Running => write!(f, "running"),
            Self::Retrying => write!(f, "retrying"),
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl StepStatus {
    /// Returns true if the status represents a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Skipped | Self::CacheHit | Self::Success | Self::Failed
        )
    }

    /// Returns true if the status indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Skipped | Self::CacheHit | Self::Success)
    }
}
