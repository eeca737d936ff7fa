//! Running steps and groups.
//!
//! The [`Executor`] walks one step through condition check, cache lookup
//! and bounded retry, or one group through its members in order.

mod assets;
mod retry;
mod runner;
mod sleeper;

pub use assets::AssetMap;
pub use retry::{BackoffStrategy, JitterStrategy, RetryConfig};
pub use runner::Executor;
pub use sleeper::{Sleeper, TokioSleeper};
