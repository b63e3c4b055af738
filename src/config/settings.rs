//! Tuning settings for provisioning and replay
//!
//! # Main Types
//!
//! - [`OutletSettings`] - Sink-side batching (chunk size, buffer duration)
//! - [`PacingSettings`] - How the scheduler waits for each event's deadline
//! - [`RetrySettings`] - Bounded retry for sample emission
//! - [`LoggingSettings`] - Log filter and optional log file directory

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default transmission chunk size in samples
pub const DEFAULT_CHUNK_SIZE: u32 = 32;

/// Default maximum buffering duration in seconds
pub const DEFAULT_MAX_BUFFER_SECS: u64 = 360;

/// Slowest allowed replay speed
pub const MIN_SPEED: f64 = 0.1;

/// Fastest allowed replay speed
pub const MAX_SPEED: f64 = 10.0;

/// Output channel tuning passed to the sink on declaration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutletSettings {
    /// Samples buffered before a batched send
    pub chunk_size: u32,
    /// Maximum buffering duration in seconds
    pub max_buffer_secs: u64,
}

impl Default for OutletSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_buffer_secs: DEFAULT_MAX_BUFFER_SECS,
        }
    }
}

impl OutletSettings {
    /// Maximum buffering duration
    pub fn max_buffer(&self) -> Duration {
        Duration::from_secs(self.max_buffer_secs)
    }
}

/// How the scheduler waits until an event is due
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PacingStrategy {
    /// Re-check the clock in a tight loop; one core stays busy
    BusyPoll,
    /// Sleep until shortly before the deadline, then spin
    #[default]
    Hybrid,
}

/// Which timestamp accompanies an emitted sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimestampMode {
    /// No timestamp; the sink stamps samples on receipt
    #[default]
    Unstamped,
    /// Recorded timestamp shifted by the observed dispatch lateness
    LatencyCorrected,
}

/// Replay pacing settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingSettings {
    /// Waiting strategy
    pub strategy: PacingStrategy,
    /// Time before a deadline at which [`PacingStrategy::Hybrid`] stops sleeping (microseconds)
    pub safety_margin_us: u64,
    /// Longest single sleep, bounds how late a cancellation is noticed (milliseconds)
    pub max_sleep_ms: u64,
    /// Playback speed multiplier (1.0 = recorded speed)
    pub speed: f64,
    /// Timestamp attached to emitted samples
    pub timestamp_mode: TimestampMode,
}

impl Default for PacingSettings {
    fn default() -> Self {
        Self {
            strategy: PacingStrategy::Hybrid,
            safety_margin_us: 2_000,
            max_sleep_ms: 50,
            speed: 1.0,
            timestamp_mode: TimestampMode::Unstamped,
        }
    }
}

impl PacingSettings {
    /// Busy-poll pacing at recorded speed
    pub fn busy_poll() -> Self {
        Self {
            strategy: PacingStrategy::BusyPoll,
            ..Self::default()
        }
    }

    /// Set playback speed, clamped to the supported range
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self.speed = self.effective_speed();
        self
    }

    /// Speed actually used by the scheduler
    pub fn effective_speed(&self) -> f64 {
        if self.speed.is_finite() {
            self.speed.clamp(MIN_SPEED, MAX_SPEED)
        } else {
            1.0
        }
    }

    /// Hybrid strategy safety margin
    pub fn safety_margin(&self) -> Duration {
        Duration::from_micros(self.safety_margin_us)
    }

    /// Longest single sleep
    pub fn max_sleep(&self) -> Duration {
        Duration::from_millis(self.max_sleep_ms.max(1))
    }
}

/// Retry policy for sample emission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Total attempts per sample, including the first (minimum 1)
    pub max_attempts: u32,
    /// Delay before the first retry (milliseconds)
    pub initial_backoff_ms: u64,
    /// Upper bound for the doubled delay (milliseconds)
    pub max_backoff_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 5,
            max_backoff_ms: 100,
        }
    }
}

impl RetrySettings {
    /// Single attempt, no retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Attempts actually made
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay before retry number `retry` (0-based)
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u64.checked_shl(retry).unwrap_or(u64::MAX);
        let ms = self
            .initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter used when `RUST_LOG` is not set
    pub filter: String,
    /// Directory for daily rolling log files (none = stderr only)
    pub directory: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info,stream_replay=debug".to_string(),
            directory: None,
        }
    }
}
