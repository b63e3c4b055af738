//! In-process sink backed by crossbeam channels
//!
//! Every declared channel gets a bounded queue sized from its nominal rate
//! and the requested buffer duration. Consumers take the [`Inlet`]s from
//! the sink and read [`StampedSample`]s from them, on any thread.
//!
//! Samples are pushed into the queue in chunks of `chunk_size`. When the
//! queue is full the newest samples are dropped and counted; a queue whose
//! consumer went away makes the outlet fail with
//! [`ReplayError::SinkUnavailable`](crate::error::ReplayError::SinkUnavailable).

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::time::{Duration, Instant};

use super::{ChannelDeclaration, ChannelSink, OutputChannel};
use crate::error::{ReplayError, Result};
use crate::types::Sample;

/// Samples assumed per second of buffer for irregular streams
const IRREGULAR_SAMPLES_PER_SEC: f64 = 100.0;

/// Upper bound for a single queue, in samples
const MAX_QUEUE_CAPACITY: usize = 1 << 18;

/// A sample with the time it was stamped with
#[derive(Debug, Clone, PartialEq)]
pub struct StampedSample {
    /// Seconds on the sink clock (or the caller-provided timestamp)
    pub stamp: f64,
    /// Payload
    pub sample: Sample,
}

/// Receiving end of a declared channel
#[derive(Debug)]
pub struct Inlet {
    declaration: ChannelDeclaration,
    receiver: Receiver<StampedSample>,
}

impl Inlet {
    /// Declaration the channel was created with
    pub fn declaration(&self) -> &ChannelDeclaration {
        &self.declaration
    }

    /// Underlying receiver, for use with `crossbeam_channel::select!`
    pub fn receiver(&self) -> &Receiver<StampedSample> {
        &self.receiver
    }

    /// Wait for the next sample
    ///
    /// Returns `None` on timeout or once the outlet is gone and drained.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<StampedSample> {
        match self.receiver.recv_timeout(timeout) {
            Ok(sample) => Some(sample),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Take every sample currently queued
    pub fn drain(&self) -> Vec<StampedSample> {
        self.receiver.try_iter().collect()
    }
}

/// Sink creating crossbeam-backed channels
#[derive(Debug)]
pub struct InProcessSink {
    clock: Instant,
    inlets: Vec<Inlet>,
}

impl Default for InProcessSink {
    fn default() -> Self {
        Self::new()
    }
}

impl InProcessSink {
    /// Create a sink; its clock starts now
    pub fn new() -> Self {
        Self {
            clock: Instant::now(),
            inlets: Vec::new(),
        }
    }

    /// Take the inlets of all channels declared so far, in declaration order
    pub fn take_inlets(&mut self) -> Vec<Inlet> {
        std::mem::take(&mut self.inlets)
    }

    /// Queue capacity for a channel
    pub fn queue_capacity(declaration: &ChannelDeclaration, max_buffer: Duration) -> usize {
        let rate = if declaration.is_irregular() {
            IRREGULAR_SAMPLES_PER_SEC
        } else {
            declaration.nominal_rate
        };
        let samples = (rate * max_buffer.as_secs_f64()).ceil();
        if samples >= MAX_QUEUE_CAPACITY as f64 {
            MAX_QUEUE_CAPACITY
        } else {
            (samples as usize).max(1)
        }
    }
}

impl ChannelSink for InProcessSink {
    type Channel = InProcessOutlet;

    fn declare_channel(
        &mut self,
        declaration: &ChannelDeclaration,
        chunk_size: u32,
        max_buffer: Duration,
    ) -> Result<Self::Channel> {
        let capacity = Self::queue_capacity(declaration, max_buffer);
        let (sender, receiver) = bounded(capacity);

        self.inlets.push(Inlet {
            declaration: declaration.clone(),
            receiver,
        });

        tracing::debug!(
            "Declared in-process channel '{}' (capacity {}, chunk {})",
            declaration.name,
            capacity,
            chunk_size
        );

        Ok(InProcessOutlet {
            name: declaration.name.clone(),
            sender,
            pending: Vec::with_capacity(chunk_size as usize),
            chunk_size: chunk_size.max(1) as usize,
            clock: self.clock,
            dropped: 0,
        })
    }
}

/// Sending end of an in-process channel
#[derive(Debug)]
pub struct InProcessOutlet {
    name: String,
    sender: Sender<StampedSample>,
    pending: Vec<StampedSample>,
    chunk_size: usize,
    clock: Instant,
    dropped: u64,
}

impl InProcessOutlet {
    /// Samples dropped because the queue was full
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Samples waiting for the next chunk
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl OutputChannel for InProcessOutlet {
    fn emit(&mut self, sample: &Sample, timestamp: Option<f64>) -> Result<()> {
        let stamp = timestamp.unwrap_or_else(|| self.clock.elapsed().as_secs_f64());
        self.pending.push(StampedSample {
            stamp,
            sample: sample.clone(),
        });

        if self.pending.len() >= self.chunk_size {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        for stamped in self.pending.drain(..) {
            match self.sender.try_send(stamped) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    if self.dropped == 0 {
                        tracing::warn!("Channel '{}' queue full, dropping samples", self.name);
                    }
                    self.dropped += 1;
                }
                Err(TrySendError::Disconnected(_)) => {
                    return Err(ReplayError::sink(&self.name, "consumer disconnected"));
                }
            }
        }
        Ok(())
    }
}
