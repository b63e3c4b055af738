//! Live output channels
//!
//! This module is the seam between the replay core and whatever transports
//! samples to live consumers.
//!
//! # Main Types
//!
//! - [`ChannelSink`] - Declares output channels from a [`ChannelDeclaration`]
//! - [`OutputChannel`] - A declared channel that accepts samples
//! - [`ChannelSet`] - Channels indexed by stream index, one slot per stream
//! - [`ChannelProvisioner`] - Turns recorded streams into declared channels
//!
//! # Sinks
//!
//! - [`InProcessSink`] - Bounded crossbeam channels, one per output channel,
//!   for consumers running in the same process
//! - [`JsonLinesSink`] - Declarations and samples as JSON lines on any writer

pub mod in_process;
pub mod json_lines;
pub mod provision;

pub use in_process::{InProcessOutlet, InProcessSink, Inlet, StampedSample};
pub use json_lines::{JsonLinesOutlet, JsonLinesSink};
pub use provision::{build_declaration, ChannelProvisioner};

use serde::Serialize;
use std::time::Duration;

use crate::descriptor::DescriptorTree;
use crate::error::Result;
use crate::types::{Sample, SampleFormat};

/// Everything a sink needs to announce an output channel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelDeclaration {
    /// Channel name
    pub name: String,
    /// Content type (EEG, Markers, ...)
    #[serde(rename = "type")]
    pub content_type: String,
    /// Number of values per sample
    pub channel_count: u32,
    /// Nominal rate in Hz, 0 for irregular streams
    pub nominal_rate: f64,
    /// Value format
    pub sample_format: SampleFormat,
    /// Unique source identifier (may be empty)
    pub source_id: String,
    /// Reconstructed metadata tree
    pub descriptor: DescriptorTree,
}

impl ChannelDeclaration {
    /// Returns true for streams without a fixed sampling rate
    pub fn is_irregular(&self) -> bool {
        self.nominal_rate == 0.0
    }
}

/// A declared output channel
#[cfg_attr(test, mockall::automock)]
pub trait OutputChannel {
    /// Queue one sample for transmission
    ///
    /// `timestamp` is `None` when the sink should stamp the sample itself.
    fn emit(&mut self, sample: &Sample, timestamp: Option<f64>) -> Result<()>;

    /// Send everything still buffered
    fn flush(&mut self) -> Result<()>;
}

/// Factory for output channels
#[cfg_attr(test, mockall::automock(type Channel = MockOutputChannel;))]
pub trait ChannelSink {
    /// Channel type handed out by this sink
    type Channel: OutputChannel;

    /// Declare a new output channel
    ///
    /// `chunk_size` is the number of samples batched per send and
    /// `max_buffer` the longest span of data the channel may hold back.
    fn declare_channel(
        &mut self,
        declaration: &ChannelDeclaration,
        chunk_size: u32,
        max_buffer: Duration,
    ) -> Result<Self::Channel>;
}

/// Output channels indexed like the streams they were provisioned for
///
/// Slot `i` always belongs to stream `i`; a slot is empty when that stream
/// was skipped during provisioning.
#[derive(Debug)]
pub struct ChannelSet<C> {
    slots: Vec<Option<C>>,
}

impl<C> ChannelSet<C> {
    /// Create a set from per-stream slots
    pub fn from_slots(slots: Vec<Option<C>>) -> Self {
        Self { slots }
    }

    /// Number of slots (equals the number of streams)
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if the set has no slots
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of streams with a channel
    pub fn provisioned_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Whether stream `index` has a channel
    pub fn is_provisioned(&self, index: usize) -> bool {
        matches!(self.slots.get(index), Some(Some(_)))
    }

    /// Indices of streams without a channel
    pub fn skipped(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_none())
            .map(|(i, _)| i)
            .collect()
    }

    /// Channel of stream `index`
    pub fn get(&self, index: usize) -> Option<&C> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Mutable channel of stream `index`
    pub fn get_mut(&mut self, index: usize) -> Option<&mut C> {
        self.slots.get_mut(index).and_then(Option::as_mut)
    }

    /// Iterate over provisioned channels with their stream index
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut C)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_mut().map(|c| (i, c)))
    }
}

impl<C: OutputChannel> ChannelSet<C> {
    /// Flush every channel, stopping at the first failure
    pub fn flush_all(&mut self) -> Result<()> {
        for (_, channel) in self.iter_mut() {
            channel.flush()?;
        }
        Ok(())
    }
}
