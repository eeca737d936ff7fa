//! Run identity and the engine's explicit component registry.
//!
//! Everything the engine needs besides the steps themselves (cache, hooks,
//! event sink, sleeper, accelerator tiers, run parameters) travels in an
//! [`EngineContext`] handed to the pipeline and executor constructors.

mod engine;
mod run;

pub use engine::EngineContext;
pub use run::{RunInfo, CONTEXT_PARAMS};
