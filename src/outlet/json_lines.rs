//! JSON-lines sink
//!
//! Writes one JSON object per line to a shared writer:
//!
//! ```text
//! {"event":"declare","channel":0,"name":"BioSemi","type":"EEG",...,"descriptor":{...}}
//! {"event":"sample","channel":0,"stamp":0.0132,"data":[1.0,2.0]}
//! ```
//!
//! All outlets of one sink share the writer, so lines from different
//! channels interleave in dispatch order (per chunk).

use serde::Serialize;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use super::{ChannelDeclaration, ChannelSink, OutputChannel};
use crate::error::{ReplayError, Result};
use crate::types::Sample;

#[derive(Serialize)]
struct DeclareLine<'a> {
    event: &'static str,
    channel: usize,
    #[serde(flatten)]
    declaration: &'a ChannelDeclaration,
    chunk_size: u32,
    max_buffer_secs: f64,
}

#[derive(Serialize)]
struct SampleLine<'a> {
    event: &'static str,
    channel: usize,
    stamp: f64,
    data: &'a Sample,
}

fn write_line<W: Write, L: Serialize>(writer: &Mutex<W>, line: &L, channel: &str) -> Result<()> {
    let mut bytes = serde_json::to_vec(line).map_err(|e| ReplayError::sink(channel, e))?;
    bytes.push(b'\n');
    let mut guard = writer
        .lock()
        .map_err(|_| ReplayError::sink(channel, "writer lock poisoned"))?;
    guard
        .write_all(&bytes)
        .map_err(|e| ReplayError::sink(channel, e))
}

/// Sink writing JSON lines
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    writer: Arc<Mutex<W>>,
    clock: Instant,
    next_channel: usize,
}

impl<W: Write> JsonLinesSink<W> {
    /// Create a sink owning `writer`
    pub fn new(writer: W) -> Self {
        Self::with_shared(Arc::new(Mutex::new(writer)))
    }

    /// Create a sink on a writer shared with the caller
    pub fn with_shared(writer: Arc<Mutex<W>>) -> Self {
        Self {
            writer,
            clock: Instant::now(),
            next_channel: 0,
        }
    }

    /// Shared handle to the writer
    pub fn writer(&self) -> Arc<Mutex<W>> {
        Arc::clone(&self.writer)
    }
}

impl<W: Write> ChannelSink for JsonLinesSink<W> {
    type Channel = JsonLinesOutlet<W>;

    fn declare_channel(
        &mut self,
        declaration: &ChannelDeclaration,
        chunk_size: u32,
        max_buffer: Duration,
    ) -> Result<Self::Channel> {
        let channel = self.next_channel;
        let line = DeclareLine {
            event: "declare",
            channel,
            declaration,
            chunk_size,
            max_buffer_secs: max_buffer.as_secs_f64(),
        };
        write_line(&self.writer, &line, &declaration.name)?;
        self.next_channel += 1;

        Ok(JsonLinesOutlet {
            channel,
            name: declaration.name.clone(),
            writer: Arc::clone(&self.writer),
            clock: self.clock,
            chunk_size: chunk_size.max(1) as usize,
            pending: Vec::with_capacity(chunk_size as usize),
        })
    }
}

/// Output channel of a [`JsonLinesSink`]
#[derive(Debug)]
pub struct JsonLinesOutlet<W: Write> {
    channel: usize,
    name: String,
    writer: Arc<Mutex<W>>,
    clock: Instant,
    chunk_size: usize,
    pending: Vec<(f64, Sample)>,
}

impl<W: Write> JsonLinesOutlet<W> {
    /// Channel number used in the output lines
    pub fn channel(&self) -> usize {
        self.channel
    }
}

impl<W: Write> OutputChannel for JsonLinesOutlet<W> {
    fn emit(&mut self, sample: &Sample, timestamp: Option<f64>) -> Result<()> {
        let stamp = timestamp.unwrap_or_else(|| self.clock.elapsed().as_secs_f64());
        self.pending.push((stamp, sample.clone()));
        if self.pending.len() < self.chunk_size {
            return Ok(());
        }

        let queued = self.pending.len();
        match self.flush() {
            Ok(()) => Ok(()),
            // Chunk not written: take this sample back so a retry adds it once
            Err(e) if self.pending.len() == queued => {
                self.pending.pop();
                Err(e)
            }
            // Chunk written, only the writer's flush failed
            Err(e) => {
                tracing::warn!("Flushing '{}' failed after write: {}", self.name, e);
                Ok(())
            }
        }
    }

    /// Write all pending lines as one chunk
    ///
    /// Pending samples are kept if the chunk could not be written and
    /// dropped once the writer accepted it.
    fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let mut chunk = Vec::new();
        for (stamp, data) in &self.pending {
            let line = SampleLine {
                event: "sample",
                channel: self.channel,
                stamp: *stamp,
                data,
            };
            serde_json::to_writer(&mut chunk, &line)
                .map_err(|e| ReplayError::sink(&self.name, e))?;
            chunk.push(b'\n');
        }

        let mut guard = self
            .writer
            .lock()
            .map_err(|_| ReplayError::sink(&self.name, "writer lock poisoned"))?;
        guard
            .write_all(&chunk)
            .map_err(|e| ReplayError::sink(&self.name, e))?;
        self.pending.clear();
        guard.flush().map_err(|e| ReplayError::sink(&self.name, e))
    }
}

impl<W: Write> Drop for JsonLinesOutlet<W> {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            tracing::warn!("Dropping '{}' with unsent samples: {}", self.name, e);
        }
    }
}
