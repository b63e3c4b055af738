//! Core data types for stream-replay
//!
//! This module contains the in-memory form of a recorded capture as the
//! recording adapter hands it to the replay core.
//!
//! # Main Types
//!
//! - [`Stream`] - One recorded data source: metadata plus index-aligned
//!   timestamps and samples
//! - [`StreamInfo`] - Stream metadata exactly as recorded (numeric fields are
//!   still text and need explicit parsing)
//! - [`Sample`] - One multi-channel sample payload
//! - [`SampleFormat`] - Channel value format of a stream
//!
//! Streams are read-only once loaded. The replay core never reorders or
//! mutates them; it only addresses samples by `(stream_index, sample_index)`.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::descriptor::RawNode;

/// Value format of every channel in a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    /// 32-bit floating point
    #[default]
    Float32,
    /// 64-bit floating point
    Float64,
    /// Variable length string
    String,
    /// 8-bit signed integer
    Int8,
    /// 16-bit signed integer
    Int16,
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
}

impl SampleFormat {
    /// All formats, in declaration order
    pub const ALL: [SampleFormat; 7] = [
        SampleFormat::Float32,
        SampleFormat::Float64,
        SampleFormat::String,
        SampleFormat::Int8,
        SampleFormat::Int16,
        SampleFormat::Int32,
        SampleFormat::Int64,
    ];

    /// Returns the size in bytes of one channel value (0 for strings)
    pub fn size_bytes(&self) -> usize {
        match self {
            SampleFormat::Int8 => 1,
            SampleFormat::Int16 => 2,
            SampleFormat::Float32 | SampleFormat::Int32 => 4,
            SampleFormat::Float64 | SampleFormat::Int64 => 8,
            SampleFormat::String => 0,
        }
    }

    /// Returns true if channel values are numbers
    pub fn is_numeric(&self) -> bool {
        !matches!(self, SampleFormat::String)
    }

    /// Canonical lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            SampleFormat::Float32 => "float32",
            SampleFormat::Float64 => "float64",
            SampleFormat::String => "string",
            SampleFormat::Int8 => "int8",
            SampleFormat::Int16 => "int16",
            SampleFormat::Int32 => "int32",
            SampleFormat::Int64 => "int64",
        }
    }
}

impl std::fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a channel format name is not recognized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSampleFormat(pub String);

impl std::fmt::Display for UnknownSampleFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown sample format '{}'", self.0)
    }
}

impl std::error::Error for UnknownSampleFormat {}

impl FromStr for SampleFormat {
    type Err = UnknownSampleFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "float32" => Ok(SampleFormat::Float32),
            // Recorders commonly write double64 for 64-bit floats
            "float64" | "double64" => Ok(SampleFormat::Float64),
            "string" => Ok(SampleFormat::String),
            "int8" => Ok(SampleFormat::Int8),
            "int16" => Ok(SampleFormat::Int16),
            "int32" => Ok(SampleFormat::Int32),
            "int64" => Ok(SampleFormat::Int64),
            _ => Err(UnknownSampleFormat(s.to_string())),
        }
    }
}

/// One sample: a value per channel
///
/// Integer payloads are kept as `i64` so that 64-bit integer streams load
/// without rounding; any fractional value makes the sample [`Sample::Numeric`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Sample {
    /// Integer channel values
    Integer(Vec<i64>),
    /// Numeric channel values
    Numeric(Vec<f64>),
    /// String channel values (markers, annotations)
    Text(Vec<String>),
}

impl Sample {
    /// Number of channel values in this sample
    pub fn len(&self) -> usize {
        match self {
            Sample::Integer(values) => values.len(),
            Sample::Numeric(values) => values.len(),
            Sample::Text(values) => values.len(),
        }
    }

    /// Returns true if the sample carries no values
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if this payload fits a stream of the given format
    pub fn matches_format(&self, format: SampleFormat) -> bool {
        match self {
            Sample::Integer(_) | Sample::Numeric(_) => format.is_numeric(),
            Sample::Text(_) => !format.is_numeric(),
        }
    }
}

/// Stream metadata as recorded
///
/// `channel_count`, `nominal_rate` and `sample_format` are kept as text;
/// the channel provisioner parses them and reports failures per field.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StreamInfo {
    /// Stream name
    pub name: String,
    /// Content type (EEG, Markers, ...)
    pub content_type: String,
    /// Number of channels, as recorded
    pub channel_count: String,
    /// Nominal sampling rate in Hz, as recorded (0 means irregular)
    pub nominal_rate: String,
    /// Channel format name, as recorded
    pub sample_format: String,
    /// Unique source identifier (may be empty)
    pub source_id: String,
    /// Generic descriptor tree
    pub descriptor: RawNode,
}

/// One recorded data source
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Stream {
    /// Recorded metadata
    pub info: StreamInfo,
    /// Recorded timestamps in seconds, one per sample
    pub timestamps: Vec<f64>,
    /// Sample payloads, index-aligned with `timestamps`
    pub samples: Vec<Sample>,
}

impl Stream {
    /// Stream name
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Number of recorded samples
    pub fn sample_count(&self) -> usize {
        self.timestamps.len()
    }

    /// Returns true if the stream has no samples
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Get the sample at an index
    pub fn sample(&self, index: usize) -> Option<&Sample> {
        self.samples.get(index)
    }

    /// Recorded time span between the first and last sample, in seconds
    pub fn span_secs(&self) -> f64 {
        match (self.timestamps.first(), self.timestamps.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }

    /// Check the timestamps/samples alignment invariant
    pub fn is_aligned(&self) -> bool {
        self.timestamps.len() == self.samples.len()
    }
}
