//! Step definitions: the units of work a pipeline schedules.
//!
//! A [`Step`] is built explicitly with [`Step::builder`] and is immutable
//! once built. It names the assets it consumes and produces, how its result
//! is cached, how often it is retried and, optionally, a run [`Condition`].

mod codec;
mod condition;
mod definition;
mod policy;
mod task;

pub use codec::{JsonCodec, ValueCodec};
pub use condition::Condition;
pub use definition::{input_fingerprint, Step, StepBuilder};
pub use policy::{CacheKeyFn, CachePolicy, KeyContext};
pub use task::{AsyncFnTask, FnTask, NoOpTask, Task};
