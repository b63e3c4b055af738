//! Mock sinks that record what the replay sends

use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use stream_replay::error::{ReplayError, Result};
use stream_replay::outlet::ChannelDeclaration;
use stream_replay::{ChannelSink, OutputChannel, Sample};

/// One sample as seen by a [`RecordingChannel`]
#[derive(Debug, Clone)]
pub struct Emitted {
    pub channel: usize,
    pub sample: Sample,
    pub timestamp: Option<f64>,
    pub at: Instant,
}

/// Log shared by all channels of a [`RecordingSink`]
pub type EmitLog = Arc<Mutex<Vec<Emitted>>>;

/// Sink that keeps every declaration and hands out [`RecordingChannel`]s
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub declarations: Vec<(ChannelDeclaration, u32, Duration)>,
    pub log: EmitLog,
    /// Channel names the sink refuses to declare
    pub refuse: Vec<String>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refusing(name: &str) -> Self {
        Self {
            refuse: vec![name.to_string()],
            ..Self::default()
        }
    }

    /// Snapshot of everything emitted so far
    pub fn emitted(&self) -> Vec<Emitted> {
        self.log.lock().unwrap().clone()
    }
}

impl ChannelSink for RecordingSink {
    type Channel = RecordingChannel;

    fn declare_channel(
        &mut self,
        declaration: &ChannelDeclaration,
        chunk_size: u32,
        max_buffer: Duration,
    ) -> Result<Self::Channel> {
        if self.refuse.contains(&declaration.name) {
            return Err(ReplayError::sink(&declaration.name, "refused"));
        }
        self.declarations
            .push((declaration.clone(), chunk_size, max_buffer));
        Ok(RecordingChannel {
            channel: self.declarations.len() - 1,
            log: Arc::clone(&self.log),
            flushes: 0,
        })
    }
}

/// Channel appending every emitted sample to the sink's log
#[derive(Debug)]
pub struct RecordingChannel {
    pub channel: usize,
    pub log: EmitLog,
    pub flushes: usize,
}

impl OutputChannel for RecordingChannel {
    fn emit(&mut self, sample: &Sample, timestamp: Option<f64>) -> Result<()> {
        self.log.lock().unwrap().push(Emitted {
            channel: self.channel,
            sample: sample.clone(),
            timestamp,
            at: Instant::now(),
        });
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.flushes += 1;
        Ok(())
    }
}

/// Writer that fails the next `failures` writes with a broken pipe
#[derive(Debug, Default)]
pub struct FlakyWriter {
    pub out: Vec<u8>,
    pub failures: usize,
}

impl FlakyWriter {
    pub fn text(&self) -> String {
        String::from_utf8(self.out.clone()).unwrap()
    }
}

impl Write for FlakyWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.failures > 0 {
            self.failures -= 1;
            return Err(io::ErrorKind::BrokenPipe.into());
        }
        self.out.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
