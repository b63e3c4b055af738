//! Channel provisioning
//!
//! Builds a [`ChannelDeclaration`] for each recorded stream, rebuilds its
//! descriptor tree and asks the sink for a live channel. All provisioning
//! happens before replay starts, so every metadata or sink problem surfaces
//! before a single sample is sent.

use std::time::Duration;

use super::{ChannelDeclaration, ChannelSet, ChannelSink};
use crate::config::{InvalidStreamPolicy, OutletSettings, ReplayConfig};
use crate::descriptor::{reconstruct, DescriptorIssue, DescriptorTree};
use crate::error::{ReplayError, Result, ResultExt};
use crate::types::{SampleFormat, Stream, StreamInfo};

fn invalid(info: &StreamInfo, field: &'static str, reason: impl Into<String>) -> ReplayError {
    ReplayError::InvalidStreamMetadata {
        stream: info.name.clone(),
        field,
        reason: reason.into(),
    }
}

fn parse_channel_count(info: &StreamInfo) -> Result<u32> {
    let text = info.channel_count.trim();
    match text.parse::<u32>() {
        Ok(0) => Err(invalid(info, "channel_count", "must be at least 1")),
        Ok(count) => Ok(count),
        Err(e) => Err(invalid(info, "channel_count", format!("'{}': {}", text, e))),
    }
}

fn parse_nominal_rate(info: &StreamInfo) -> Result<f64> {
    let text = info.nominal_rate.trim();
    let rate = text
        .parse::<f64>()
        .map_err(|e| invalid(info, "nominal_srate", format!("'{}': {}", text, e)))?;
    if !rate.is_finite() || rate < 0.0 {
        return Err(invalid(
            info,
            "nominal_srate",
            format!("'{}' is not a finite non-negative rate", text),
        ));
    }
    Ok(rate)
}

/// Build the channel declaration for one stream
///
/// Returns the declaration together with the descriptor issues found while
/// rebuilding its metadata tree. With `strict_descriptors`, an unsupported
/// descriptor branch fails the declaration instead.
pub fn build_declaration(
    info: &StreamInfo,
    strict_descriptors: bool,
) -> Result<(ChannelDeclaration, Vec<DescriptorIssue>)> {
    let channel_count = parse_channel_count(info)?;
    let nominal_rate = parse_nominal_rate(info)?;
    let sample_format: SampleFormat = info
        .sample_format
        .parse()
        .map_err(|e: crate::types::UnknownSampleFormat| {
            invalid(info, "channel_format", e.to_string())
        })?;

    let mut descriptor = DescriptorTree::new();
    let root = descriptor.root();
    let issues = reconstruct(&info.descriptor, &mut descriptor, root);

    if strict_descriptors {
        if let Some(DescriptorIssue::UnsupportedShape { path, reason }) =
            issues.iter().find(|i| i.is_unsupported())
        {
            return Err(ReplayError::UnsupportedDescriptorShape {
                stream: info.name.clone(),
                key: path.clone(),
                reason: reason.clone(),
            });
        }
    }

    let declaration = ChannelDeclaration {
        name: info.name.clone(),
        content_type: info.content_type.clone(),
        channel_count,
        nominal_rate,
        sample_format,
        source_id: info.source_id.clone(),
        descriptor,
    };

    Ok((declaration, issues))
}

/// Provisions one output channel per stream on a sink
pub struct ChannelProvisioner<'a, S: ChannelSink> {
    sink: &'a mut S,
    outlet: OutletSettings,
    policy: InvalidStreamPolicy,
    strict_descriptors: bool,
}

impl<'a, S: ChannelSink> ChannelProvisioner<'a, S> {
    /// Create a provisioner with default settings
    pub fn new(sink: &'a mut S) -> Self {
        Self {
            sink,
            outlet: OutletSettings::default(),
            policy: InvalidStreamPolicy::default(),
            strict_descriptors: false,
        }
    }

    /// Create a provisioner using the relevant parts of a config
    pub fn from_config(sink: &'a mut S, config: &ReplayConfig) -> Self {
        Self {
            sink,
            outlet: config.outlet,
            policy: config.invalid_stream_policy,
            strict_descriptors: config.strict_descriptors,
        }
    }

    /// Set outlet tuning
    pub fn with_outlet(mut self, outlet: OutletSettings) -> Self {
        self.outlet = outlet;
        self
    }

    /// Set the policy for streams with malformed metadata
    pub fn with_policy(mut self, policy: InvalidStreamPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Fail on unsupported descriptor shapes
    pub fn with_strict_descriptors(mut self, strict: bool) -> Self {
        self.strict_descriptors = strict;
        self
    }

    /// Build and log the declaration for a stream without touching the sink
    pub fn declare(&self, stream: &Stream) -> Result<ChannelDeclaration> {
        let (declaration, issues) = build_declaration(&stream.info, self.strict_descriptors)?;

        for issue in &issues {
            tracing::warn!("Stream '{}': {}", stream.name(), issue);
        }

        let misshaped = stream
            .samples
            .iter()
            .filter(|s| {
                s.len() != declaration.channel_count as usize
                    || !s.matches_format(declaration.sample_format)
            })
            .count();
        if misshaped > 0 {
            tracing::warn!(
                "Stream '{}': {} of {} samples do not match {} x {}",
                stream.name(),
                misshaped,
                stream.sample_count(),
                declaration.channel_count,
                declaration.sample_format
            );
        }

        Ok(declaration)
    }

    /// Provision the output channel for one stream
    pub fn provision(&mut self, stream: &Stream) -> Result<S::Channel> {
        let declaration = self.declare(stream)?;
        let chunk_size = self.outlet.chunk_size.max(1);
        let max_buffer: Duration = self.outlet.max_buffer();

        let channel = self
            .sink
            .declare_channel(&declaration, chunk_size, max_buffer)
            .with_context(|| format!("Failed to declare channel for stream '{}'", stream.name()))?;

        tracing::info!(
            "Provisioned '{}' ({}, {} ch @ {} Hz, {}, source '{}')",
            declaration.name,
            declaration.content_type,
            declaration.channel_count,
            declaration.nominal_rate,
            declaration.sample_format,
            declaration.source_id
        );
        Ok(channel)
    }

    /// Provision channels for all streams, in stream order
    ///
    /// Streams with malformed metadata are skipped or abort the whole
    /// operation depending on the configured policy. Sink failures always
    /// abort.
    pub fn provision_all(&mut self, streams: &[Stream]) -> Result<ChannelSet<S::Channel>> {
        let mut slots = Vec::with_capacity(streams.len());

        for (index, stream) in streams.iter().enumerate() {
            match self.provision(stream) {
                Ok(channel) => slots.push(Some(channel)),
                Err(e) if e.is_stream_local() && self.policy == InvalidStreamPolicy::Skip => {
                    tracing::warn!("Skipping stream {} ('{}'): {}", index, stream.name(), e);
                    slots.push(None);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(ChannelSet::from_slots(slots))
    }
}
