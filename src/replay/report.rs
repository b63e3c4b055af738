//! Replay progress and outcome

use chrono::{DateTime, Utc};
use std::time::Duration;

use super::schedule::Event;

/// One dispatched event with its timing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dispatch {
    /// The event that was sent
    pub event: Event,
    /// Position of the event in the schedule
    pub position: usize,
    /// Wall-clock offset at which the event was due
    pub due: Duration,
    /// Wall-clock offset at which it was sent
    pub sent: Duration,
}

impl Dispatch {
    /// How late the event went out
    pub fn lateness(&self) -> Duration {
        self.sent.saturating_sub(self.due)
    }
}

/// Receives progress from the replay scheduler
///
/// All methods default to doing nothing.
#[cfg_attr(test, mockall::automock)]
pub trait ReplayObserver {
    /// Called once before the first event with the number of events
    fn on_start(&mut self, _total_events: usize) {}

    /// Called after every successfully emitted event
    fn on_dispatch(&mut self, _dispatch: &Dispatch) {}

    /// Called once when the replay ends, cancelled or not
    fn on_finish(&mut self, _report: &ReplayReport) {}
}

impl ReplayObserver for () {}

/// Summary of a replay run
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayReport {
    /// Wall-clock time the dispatch loop started
    pub started_at: DateTime<Utc>,
    /// Number of events sent
    pub dispatched: usize,
    /// Events sent per stream index
    pub per_stream: Vec<usize>,
    /// Largest observed lateness
    pub max_lateness: Duration,
    /// Sum of all lateness values
    pub total_lateness: Duration,
    /// Wall time spent in the dispatch loop
    pub wall_time: Duration,
    /// Whether the run was cancelled before the schedule was exhausted
    pub cancelled: bool,
}

impl ReplayReport {
    /// Empty report for `stream_count` streams
    pub fn new(stream_count: usize) -> Self {
        Self {
            started_at: Utc::now(),
            dispatched: 0,
            per_stream: vec![0; stream_count],
            max_lateness: Duration::ZERO,
            total_lateness: Duration::ZERO,
            wall_time: Duration::ZERO,
            cancelled: false,
        }
    }

    /// Account for one dispatched event
    pub fn record(&mut self, dispatch: &Dispatch) {
        self.dispatched += 1;
        if let Some(count) = self.per_stream.get_mut(dispatch.event.stream_index) {
            *count += 1;
        }
        let lateness = dispatch.lateness();
        self.max_lateness = self.max_lateness.max(lateness);
        self.total_lateness += lateness;
    }

    /// Mean lateness over all dispatched events
    pub fn mean_lateness(&self) -> Duration {
        if self.dispatched == 0 {
            Duration::ZERO
        } else {
            self.total_lateness / self.dispatched as u32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispatch(stream: usize, due_ms: u64, sent_ms: u64) -> Dispatch {
        Dispatch {
            event: Event::new(0.0, stream, 0),
            position: 0,
            due: Duration::from_millis(due_ms),
            sent: Duration::from_millis(sent_ms),
        }
    }

    #[test]
    fn test_report_accumulates() {
        let mut report = ReplayReport::new(2);
        report.record(&dispatch(0, 10, 11));
        report.record(&dispatch(1, 20, 23));
        report.record(&dispatch(1, 30, 30));

        assert_eq!(report.dispatched, 3);
        assert_eq!(report.per_stream, vec![1, 2]);
        assert_eq!(report.max_lateness, Duration::from_millis(3));
        assert_eq!(report.mean_lateness(), Duration::from_nanos(1_333_333));
    }

    #[test]
    fn test_lateness_never_negative() {
        assert_eq!(dispatch(0, 10, 5).lateness(), Duration::ZERO);
        assert_eq!(ReplayReport::new(0).mean_lateness(), Duration::ZERO);
    }
}
