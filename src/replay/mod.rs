//! Replay of recorded streams
//!
//! # Main Types
//!
//! - [`EventSchedule`] - Every sample of every stream, merged into one
//!   timestamp-ordered sequence of [`Event`]s
//! - [`ReplayScheduler`] - Sends the schedule with its recorded timing
//! - [`CancelToken`] - Stops a running replay from another thread
//! - [`ReplayReport`] - Counts and lateness statistics of a run
//! - [`ReplayObserver`] - Progress callbacks during a run

pub mod report;
pub mod schedule;
pub mod scheduler;

pub use report::{Dispatch, ReplayObserver, ReplayReport};
pub use schedule::{Event, EventSchedule};
pub use scheduler::{CancelToken, ReplayScheduler};
