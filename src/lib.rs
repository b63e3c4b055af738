//! # stream-replay: recorded stream playback
//!
//! Replays a recorded multi-stream capture (EEG, physiological or other
//! sensor streams) through live output channels, keeping the recorded
//! relative timing and the per-stream sample order. Downstream consumers
//! see what looks like a set of real-time sources.
//!
//! ## Architecture
//!
//! - **Recording**: loads a capture into typed [`Stream`]s
//! - **Descriptor**: rebuilds each stream's metadata tree for its channel
//! - **Outlet**: declares one output channel per stream through a
//!   [`ChannelSink`](outlet::ChannelSink)
//! - **Replay**: merges all samples into one timestamp-ordered schedule and
//!   dispatches it against the wall clock
//!
//! ## Example
//!
//! ```no_run
//! use stream_replay::{
//!     outlet::{ChannelProvisioner, InProcessSink},
//!     replay::{EventSchedule, ReplayScheduler},
//!     Recording, ReplayConfig,
//! };
//!
//! fn main() -> stream_replay::Result<()> {
//!     let config = ReplayConfig::default();
//!     let recording = Recording::load_from_file("SampleData.json")?;
//!
//!     let mut sink = InProcessSink::new();
//!     let mut channels =
//!         ChannelProvisioner::from_config(&mut sink, &config).provision_all(&recording.streams)?;
//!     let inlets = sink.take_inlets();
//!
//!     let schedule =
//!         EventSchedule::build_for(&recording.streams, |s| channels.is_provisioned(s));
//!     let report = ReplayScheduler::from_config(&config).run(
//!         &recording.streams,
//!         &mut channels,
//!         &schedule,
//!         &mut (),
//!     )?;
//!
//!     println!("{} samples sent, {} inlets", report.dispatched, inlets.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod descriptor;
pub mod error;
pub mod outlet;
pub mod recording;
pub mod replay;
pub mod types;

// Re-export commonly used types
pub use config::ReplayConfig;
pub use descriptor::{reconstruct, DescriptorTree, RawNode};
pub use error::{ReplayError, Result};
pub use outlet::{ChannelProvisioner, ChannelSet, ChannelSink, OutputChannel};
pub use recording::Recording;
pub use replay::{EventSchedule, ReplayReport, ReplayScheduler};
pub use types::{Sample, SampleFormat, Stream, StreamInfo};
