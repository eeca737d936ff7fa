//! Periodic pipeline runs.
//!
//! A [`Ticker`] yields on a fixed period until its [`CancellationToken`] is
//! cancelled; [`spawn_scheduled`] drives a pipeline from one.

mod scheduled;
mod ticker;
mod token;

pub use scheduled::{spawn_scheduled, ScheduleHandle};
pub use ticker::Ticker;
pub use token::CancellationToken;
