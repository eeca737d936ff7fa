//! Logging setup and timing helpers.

mod logging;
mod timer;

pub use logging::{init_tracing, LogFormat, DEFAULT_FILTER, LOG_FORMAT_ENV};
pub use timer::SpanTimer;
