//! stream-replay - Main Entry Point
//!
//! Replays a recording as JSON lines on stdout, one declaration per stream
//! followed by the samples in recorded timing. Logs go to stderr.

use anyhow::Context;
use clap::Parser;
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::time::Duration;
use stream_replay::{
    config::{config_path, ReplayConfig, DEFAULT_RECORDING},
    outlet::{ChannelProvisioner, JsonLinesSink},
    replay::{Dispatch, EventSchedule, ReplayObserver, ReplayReport, ReplayScheduler},
    Recording,
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Replay a recorded multi-stream capture with its original timing
#[derive(Debug, Parser)]
#[command(name = "stream-replay", version, about)]
struct Cli {
    /// Recording to replay
    #[arg(short, long, default_value = DEFAULT_RECORDING)]
    file: PathBuf,
}

/// Logs progress while the replay runs
struct ProgressLog {
    total: usize,
    step: usize,
}

impl ReplayObserver for ProgressLog {
    fn on_start(&mut self, total_events: usize) {
        self.total = total_events;
        self.step = (total_events / 10).max(1);
    }

    fn on_dispatch(&mut self, dispatch: &Dispatch) {
        let done = dispatch.position + 1;
        if done % self.step == 0 {
            tracing::info!("Progress: {}/{} samples", done, self.total);
        }
    }

    fn on_finish(&mut self, report: &ReplayReport) {
        for (stream, count) in report.per_stream.iter().enumerate() {
            tracing::debug!("Stream {}: {} samples sent", stream, count);
        }
    }
}

fn init_logging(config: &ReplayConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.filter))
    };
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_filter(filter());

    match &config.logging.directory {
        Some(directory) => {
            std::fs::create_dir_all(directory)
                .with_context(|| format!("Failed to create log directory {:?}", directory))?;
            let appender = tracing_appender::rolling::daily(directory, "stream-replay.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file_layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(filter());

            tracing_subscriber::registry()
                .with(stderr_layer)
                .with(file_layer)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry().with(stderr_layer).init();
            Ok(None)
        }
    }
}

fn countdown(secs: u32) {
    for remaining in (1..=secs).rev() {
        tracing::info!("Starting in {}...", remaining);
        std::thread::sleep(Duration::from_secs(1));
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = ReplayConfig::load_or_default();
    let _log_guard = init_logging(&config)?;

    if let Some(path) = config_path() {
        tracing::debug!("Config location: {:?}", path);
    }
    tracing::info!("Loading recording {:?}", cli.file);

    let recording = Recording::load_from_file(&cli.file)
        .with_context(|| format!("Failed to load recording {:?}", cli.file))?;
    let streams = &recording.streams;

    let mut sink: JsonLinesSink<Stdout> = JsonLinesSink::new(io::stdout());
    let mut channels = ChannelProvisioner::from_config(&mut sink, &config)
        .provision_all(streams)
        .context("Failed to provision output channels")?;
    tracing::info!(
        "Provisioned {} of {} streams",
        channels.provisioned_count(),
        channels.len()
    );

    let schedule = EventSchedule::build_for(streams, |s| channels.is_provisioned(s));
    if schedule.is_empty() {
        tracing::info!("Nothing to replay");
        return Ok(());
    }

    countdown(config.countdown_secs);
    tracing::info!("Now sending data...");

    let mut progress = ProgressLog { total: 0, step: 1 };
    let report = ReplayScheduler::from_config(&config)
        .run(streams, &mut channels, &schedule, &mut progress)
        .context("Replay failed")?;

    tracing::info!(
        "Replayed {} samples in {:.2}s (max lateness {:?}, mean {:?})",
        report.dispatched,
        report.wall_time.as_secs_f64(),
        report.max_lateness,
        report.mean_lateness()
    );
    Ok(())
}
