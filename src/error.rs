//! Error handling for stream-replay
//!
//! This module defines the error type shared by the recording adapter,
//! the channel provisioner and the replay scheduler, plus a Result alias.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for replay operations
#[derive(Error, Debug)]
pub enum ReplayError {
    /// The recording could not be read or parsed
    #[error("Unreadable recording {}: {reason}", path.display())]
    UnreadableRecording { path: PathBuf, reason: String },

    /// A stream metadata field could not be parsed
    #[error("Invalid metadata for stream '{stream}' (field '{field}'): {reason}")]
    InvalidStreamMetadata {
        stream: String,
        field: &'static str,
        reason: String,
    },

    /// A descriptor branch has a shape the reconstructor cannot express
    #[error("Unsupported descriptor shape in stream '{stream}' at '{key}': {reason}")]
    UnsupportedDescriptorShape {
        stream: String,
        key: String,
        reason: String,
    },

    /// The output sink refused to create a channel or emit a sample
    #[error("Sink unavailable for channel '{channel}': {reason}")]
    SinkUnavailable { channel: String, reason: String },

    /// The recorded timing cannot be replayed on the wall clock
    #[error("Cannot schedule replay: {0}")]
    Schedule(String),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ReplayError>,
    },
}

impl ReplayError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ReplayError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Build a sink error for the named channel
    pub fn sink(channel: impl Into<String>, reason: impl ToString) -> Self {
        ReplayError::SinkUnavailable {
            channel: channel.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error is tied to a single stream's metadata
    pub fn is_stream_local(&self) -> bool {
        match self {
            ReplayError::InvalidStreamMetadata { .. }
            | ReplayError::UnsupportedDescriptorShape { .. } => true,
            ReplayError::WithContext { source, .. } => source.is_stream_local(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for ReplayError {
    fn from(err: serde_json::Error) -> Self {
        ReplayError::Serialization(err.to_string())
    }
}

/// Result type alias for replay operations
pub type Result<T> = std::result::Result<T, ReplayError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ReplayError::InvalidStreamMetadata {
            stream: "BioSemi".to_string(),
            field: "channel_count",
            reason: "not a number".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid metadata for stream 'BioSemi' (field 'channel_count'): not a number"
        );
    }

    #[test]
    fn test_error_with_context() {
        let err = ReplayError::sink("EEG", "closed");
        let with_ctx = err.with_context("Failed to provision");
        assert!(with_ctx.to_string().contains("Failed to provision"));
        assert!(with_ctx.to_string().contains("closed"));
    }

    #[test]
    fn test_stream_local_classification() {
        let local = ReplayError::UnsupportedDescriptorShape {
            stream: "s".into(),
            key: "k".into(),
            reason: "r".into(),
        }
        .with_context("ctx");
        assert!(local.is_stream_local());
        assert!(!ReplayError::sink("s", "gone").is_stream_local());
    }
}
