//! Real-time replay scheduler
//!
//! Walks an [`EventSchedule`] once, front to back, and emits each event's
//! sample on the channel of its stream as soon as the wall-clock time since
//! the start exceeds the event's recorded offset from the first event
//! (divided by the playback speed).
//!
//! # Pacing
//!
//! - [`PacingStrategy::BusyPoll`] re-reads the clock in a tight loop and
//!   keeps one core busy
//! - [`PacingStrategy::Hybrid`] sleeps until `safety_margin` before the
//!   deadline (in slices of at most `max_sleep`) and spins the rest
//!
//! An event is never sent before it is due.
//!
//! # Failure
//!
//! A sample that still cannot be emitted after the configured retries ends
//! the whole replay with an error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::report::{Dispatch, ReplayObserver, ReplayReport};
use super::schedule::EventSchedule;
use crate::config::{PacingSettings, PacingStrategy, ReplayConfig, RetrySettings, TimestampMode};
use crate::error::{ReplayError, Result, ResultExt};
use crate::outlet::{ChannelSet, OutputChannel};
use crate::types::{Sample, Stream};

/// Shared flag that stops a running replay
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token that is not cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Wall-clock offset for a recorded offset in seconds
fn wall_offset(secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs).map_err(|_| {
        ReplayError::Schedule(format!("offset of {}s is out of range", secs))
    })
}

/// Dispatches a schedule with its recorded timing
#[derive(Debug, Clone, Default)]
pub struct ReplayScheduler {
    pacing: PacingSettings,
    retry: RetrySettings,
    cancel: CancelToken,
}

impl ReplayScheduler {
    /// Create a scheduler
    pub fn new(pacing: PacingSettings, retry: RetrySettings) -> Self {
        Self {
            pacing,
            retry,
            cancel: CancelToken::new(),
        }
    }

    /// Create a scheduler from the pacing and retry parts of a config
    pub fn from_config(config: &ReplayConfig) -> Self {
        Self::new(config.pacing, config.retry)
    }

    /// Use an existing cancellation token
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that cancels this scheduler's runs
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Pacing in use
    pub fn pacing(&self) -> &PacingSettings {
        &self.pacing
    }

    /// Block until `due` has passed since `start`
    ///
    /// Returns false if cancelled while waiting.
    fn wait_until(&self, start: Instant, due: Duration) -> bool {
        let margin = self.pacing.safety_margin();
        let max_sleep = self.pacing.max_sleep();

        loop {
            if self.cancel.is_cancelled() {
                return false;
            }

            let elapsed = start.elapsed();
            if elapsed > due {
                return true;
            }
            let remaining = due - elapsed;

            match self.pacing.strategy {
                PacingStrategy::BusyPoll => std::hint::spin_loop(),
                PacingStrategy::Hybrid if remaining > margin => {
                    std::thread::sleep((remaining - margin).min(max_sleep));
                }
                PacingStrategy::Hybrid => std::hint::spin_loop(),
            }
        }
    }

    fn emit_with_retry<C: OutputChannel>(
        &self,
        channel: &mut C,
        sample: &Sample,
        timestamp: Option<f64>,
        stream_name: &str,
    ) -> Result<()> {
        let attempts = self.retry.attempts();
        let mut retry = 0;

        loop {
            match channel.emit(sample, timestamp) {
                Ok(()) => return Ok(()),
                Err(e) if retry + 1 < attempts => {
                    let backoff = self.retry.backoff(retry);
                    tracing::warn!(
                        "Emit on '{}' failed (attempt {}/{}), retrying in {:?}: {}",
                        stream_name,
                        retry + 1,
                        attempts,
                        backoff,
                        e
                    );
                    std::thread::sleep(backoff);
                    retry += 1;
                }
                Err(e) => {
                    return Err(e.with_context(format!(
                        "Giving up on '{}' after {} attempt(s)",
                        stream_name, attempts
                    )))
                }
            }
        }
    }

    /// Replay `schedule` over `channels`
    ///
    /// `channels` must be indexed like `streams`, and `schedule` built from
    /// the same `streams`. Events of streams without a channel are skipped.
    /// Runs to the end of the schedule unless cancelled; all channels are
    /// flushed before returning.
    pub fn run<C: OutputChannel>(
        &self,
        streams: &[Stream],
        channels: &mut ChannelSet<C>,
        schedule: &EventSchedule,
        observer: &mut dyn ReplayObserver,
    ) -> Result<ReplayReport> {
        let mut report = ReplayReport::new(streams.len());

        let Some(origin) = schedule.first_timestamp() else {
            tracing::info!("Schedule is empty, nothing to replay");
            observer.on_finish(&report);
            return Ok(report);
        };

        let speed = self.pacing.effective_speed();
        wall_offset(schedule.span_secs() / speed)
            .with_context(|| format!("Recorded span of {}s is too long", schedule.span_secs()))?;

        tracing::info!(
            "Replaying {} events over {:.3}s of recorded time (speed {}x, {:?})",
            schedule.len(),
            schedule.span_secs(),
            speed,
            self.pacing.strategy
        );
        observer.on_start(schedule.len());

        let wall_start = Instant::now();
        for (position, event) in schedule.iter().enumerate() {
            let offset = ((event.timestamp - origin) / speed).max(0.0);
            let due = wall_offset(offset)?;

            if !self.wait_until(wall_start, due) {
                tracing::info!(
                    "Replay cancelled after {} of {} events",
                    report.dispatched,
                    schedule.len()
                );
                report.cancelled = true;
                break;
            }

            let Some(channel) = channels.get_mut(event.stream_index) else {
                continue;
            };
            let Some(stream) = streams.get(event.stream_index) else {
                tracing::warn!("Event refers to unknown stream {}", event.stream_index);
                continue;
            };
            let Some(sample) = stream.sample(event.sample_index) else {
                tracing::warn!(
                    "Stream '{}' has no sample {}",
                    stream.name(),
                    event.sample_index
                );
                continue;
            };

            let sent = wall_start.elapsed();
            let timestamp = match self.pacing.timestamp_mode {
                TimestampMode::Unstamped => None,
                TimestampMode::LatencyCorrected => {
                    Some(event.timestamp - (sent.as_secs_f64() - offset))
                }
            };

            self.emit_with_retry(channel, sample, timestamp, stream.name())
                .with_context(|| format!("Replay aborted at event {}", position))?;

            let dispatch = Dispatch {
                event: *event,
                position,
                due,
                sent,
            };
            tracing::trace!("Sample at: {}", event.timestamp);
            report.record(&dispatch);
            observer.on_dispatch(&dispatch);
        }

        channels
            .flush_all()
            .context("Failed to flush channels after replay")?;

        report.wall_time = wall_start.elapsed();
        tracing::info!(
            "Replay finished: {} events in {:.3}s, max lateness {:?}, mean lateness {:?}",
            report.dispatched,
            report.wall_time.as_secs_f64(),
            report.max_lateness,
            report.mean_lateness()
        );
        observer.on_finish(&report);
        Ok(report)
    }
}
