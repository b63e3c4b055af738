//! Recording adapter
//!
//! Loads a recorded capture into typed [`Stream`]s. Recordings are JSON
//! documents in the layout generic XDF readers produce:
//!
//! ```json
//! {
//!   "header": { "version": "1.0" },
//!   "streams": [
//!     {
//!       "info": {
//!         "name": ["BioSemi"], "type": ["EEG"], "channel_count": ["8"],
//!         "nominal_srate": ["100"], "channel_format": ["float32"],
//!         "source_id": ["myuid2424"],
//!         "desc": [{ "manufacturer": ["BioSemi"] }]
//!       },
//!       "time_stamps": [0.0, 0.01],
//!       "time_series": [[1.0, 2.0], [1.5, 2.5]]
//!     }
//!   ]
//! }
//! ```
//!
//! Info fields may be given as plain strings or numbers as well as
//! single-element lists. The `desc` tree keeps its source order.
//!
//! Any failure here is [`ReplayError::UnreadableRecording`]: nothing can be
//! provisioned from a recording that did not load completely.

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

use crate::descriptor::RawNode;
use crate::error::{ReplayError, Result};
use crate::types::{Sample, Stream, StreamInfo};

/// Path reported for recordings parsed from memory
const IN_MEMORY: &str = "<memory>";

/// File-level metadata
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecordingHeader {
    /// Format version written by the recorder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// When the capture was made
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<DateTime<Utc>>,
}

fn scalar_field<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    match RawNode::deserialize(deserializer)? {
        RawNode::Scalar(text) => Ok(text),
        node if node.is_empty() => Ok(String::new()),
        RawNode::Mapping(_) => Err(de::Error::custom("expected a scalar metadata value")),
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct InfoDocument {
    #[serde(deserialize_with = "scalar_field")]
    name: String,
    #[serde(rename = "type", default, deserialize_with = "scalar_field")]
    content_type: String,
    #[serde(deserialize_with = "scalar_field")]
    channel_count: String,
    #[serde(deserialize_with = "scalar_field")]
    nominal_srate: String,
    #[serde(deserialize_with = "scalar_field")]
    channel_format: String,
    #[serde(default, deserialize_with = "scalar_field")]
    source_id: String,
    #[serde(default)]
    desc: RawNode,
}

#[derive(Debug, Serialize, Deserialize)]
struct StreamDocument {
    info: InfoDocument,
    #[serde(default)]
    time_stamps: Vec<f64>,
    #[serde(default)]
    time_series: Vec<Sample>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RecordingDocument {
    #[serde(default)]
    header: RecordingHeader,
    streams: Vec<StreamDocument>,
}

impl From<&Stream> for StreamDocument {
    fn from(stream: &Stream) -> Self {
        let info = &stream.info;
        Self {
            info: InfoDocument {
                name: info.name.clone(),
                content_type: info.content_type.clone(),
                channel_count: info.channel_count.clone(),
                nominal_srate: info.nominal_rate.clone(),
                channel_format: info.sample_format.clone(),
                source_id: info.source_id.clone(),
                desc: info.descriptor.clone(),
            },
            time_stamps: stream.timestamps.clone(),
            time_series: stream.samples.clone(),
        }
    }
}

/// A loaded recording
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Recording {
    /// File-level metadata
    pub header: RecordingHeader,
    /// Streams in file order; indices are used as stream indices
    pub streams: Vec<Stream>,
}

impl Recording {
    /// Create a recording from streams
    pub fn new(streams: Vec<Stream>) -> Self {
        Self {
            header: RecordingHeader::default(),
            streams,
        }
    }

    /// Load a recording from a file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ReplayError::UnreadableRecording {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let recording = Self::parse(&content, path)?;
        tracing::info!(
            "Loaded recording {:?}: {} stream(s), {} sample(s)",
            path,
            recording.streams.len(),
            recording.total_samples()
        );
        Ok(recording)
    }

    /// Parse a recording from JSON text
    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::parse(json, Path::new(IN_MEMORY))
    }

    fn parse(json: &str, path: &Path) -> Result<Self> {
        let unreadable = |reason: String| ReplayError::UnreadableRecording {
            path: path.to_path_buf(),
            reason,
        };

        let document: RecordingDocument =
            serde_json::from_str(json).map_err(|e| unreadable(e.to_string()))?;

        let mut streams = Vec::with_capacity(document.streams.len());
        for (index, doc) in document.streams.into_iter().enumerate() {
            if doc.time_stamps.len() != doc.time_series.len() {
                return Err(unreadable(format!(
                    "stream {} ('{}') has {} timestamps but {} samples",
                    index,
                    doc.info.name,
                    doc.time_stamps.len(),
                    doc.time_series.len()
                )));
            }
            if let Some(k) = doc.time_stamps.iter().position(|t| !t.is_finite()) {
                return Err(unreadable(format!(
                    "stream {} ('{}') has a non-finite timestamp at sample {}",
                    index, doc.info.name, k
                )));
            }

            let info = doc.info;
            streams.push(Stream {
                info: StreamInfo {
                    name: info.name,
                    content_type: info.content_type,
                    channel_count: info.channel_count,
                    nominal_rate: info.nominal_srate,
                    sample_format: info.channel_format,
                    source_id: info.source_id,
                    descriptor: info.desc,
                },
                timestamps: doc.time_stamps,
                samples: doc.time_series,
            });
        }

        Ok(Self {
            header: document.header,
            streams,
        })
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        let document = RecordingDocument {
            header: self.header.clone(),
            streams: self.streams.iter().map(StreamDocument::from).collect(),
        };
        Ok(serde_json::to_string_pretty(&document)?)
    }

    /// Save recording to a file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = self.to_json()?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Total number of samples over all streams
    pub fn total_samples(&self) -> usize {
        self.streams.iter().map(Stream::sample_count).sum()
    }

    /// Returns true if no stream has samples
    pub fn is_empty(&self) -> bool {
        self.total_samples() == 0
    }

    /// Recorded time span across all streams, in seconds
    pub fn span_secs(&self) -> f64 {
        let first = self
            .streams
            .iter()
            .filter_map(|s| s.timestamps.first())
            .copied()
            .fold(f64::INFINITY, f64::min);
        let last = self
            .streams
            .iter()
            .filter_map(|s| s.timestamps.last())
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        if first.is_finite() && last.is_finite() {
            last - first
        } else {
            0.0
        }
    }

    /// Path placeholder used for in-memory recordings
    pub fn in_memory_path() -> PathBuf {
        PathBuf::from(IN_MEMORY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "header": {"version": "1.0"},
        "streams": [
            {
                "info": {
                    "name": ["BioSemi"], "type": ["EEG"], "channel_count": ["2"],
                    "nominal_srate": ["100"], "channel_format": ["float32"],
                    "source_id": ["myuid2424"],
                    "desc": [{"manufacturer": ["BioSemi"],
                              "channels": [{"channel": [{"label": ["C3"]}, {"label": ["C4"]}]}]}]
                },
                "time_stamps": [1.0, 1.01],
                "time_series": [[0.5, 0.25], [0.75, 0.125]]
            },
            {
                "info": {
                    "name": "Markers", "type": "Markers", "channel_count": 1,
                    "nominal_srate": 0, "channel_format": "string"
                },
                "time_stamps": [1.005],
                "time_series": [["stim"]]
            }
        ]
    }"#;

    #[test]
    fn test_parse_recording() {
        let recording = Recording::from_json_str(SAMPLE).unwrap();
        assert_eq!(recording.header.version.as_deref(), Some("1.0"));
        assert_eq!(recording.streams.len(), 2);
        assert_eq!(recording.total_samples(), 3);
        assert!((recording.span_secs() - 0.01).abs() < 1e-9);

        let eeg = &recording.streams[0];
        assert_eq!(eeg.info.name, "BioSemi");
        assert_eq!(eeg.info.content_type, "EEG");
        assert_eq!(eeg.info.channel_count, "2");
        assert_eq!(eeg.info.source_id, "myuid2424");
        assert!(!eeg.info.descriptor.is_empty());

        let markers = &recording.streams[1];
        assert_eq!(markers.info.channel_count, "1");
        assert_eq!(markers.info.nominal_rate, "0");
        assert_eq!(markers.info.source_id, "");
        assert!(markers.info.descriptor.is_empty());
        assert_eq!(markers.samples[0], Sample::Text(vec!["stim".into()]));
    }

    #[test]
    fn test_misaligned_stream_is_unreadable() {
        let json = r#"{"streams": [{"info": {"name": "a", "channel_count": 1,
            "nominal_srate": 1, "channel_format": "float32"},
            "time_stamps": [0.0, 1.0], "time_series": [[1.0]]}]}"#;
        let err = Recording::from_json_str(json).unwrap_err();
        assert!(matches!(err, ReplayError::UnreadableRecording { .. }));
        assert!(err.to_string().contains("2 timestamps but 1 samples"));
    }

    #[test]
    fn test_int64_samples_survive_save_and_load() {
        let json = r#"{"streams": [{"info": {"name": "counter", "channel_count": 1,
            "nominal_srate": 10, "channel_format": "int64"},
            "time_stamps": [0.0], "time_series": [[9007199254740993]]}]}"#;
        let recording = Recording::from_json_str(json).unwrap();
        assert_eq!(
            recording.streams[0].samples[0],
            Sample::Integer(vec![9_007_199_254_740_993])
        );

        let reloaded = Recording::from_json_str(&recording.to_json().unwrap()).unwrap();
        assert_eq!(reloaded, recording);
    }

    #[test]
    fn test_malformed_json_is_unreadable() {
        let err = Recording::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ReplayError::UnreadableRecording { .. }));
    }

    #[test]
    fn test_save_and_load() {
        let recording = Recording::from_json_str(SAMPLE).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.json");

        recording.save_to_file(&path).unwrap();
        let loaded = Recording::load_from_file(&path).unwrap();
        assert_eq!(loaded, recording);
    }

    #[test]
    fn test_missing_file_is_unreadable() {
        let err = Recording::load_from_file("/definitely/not/here.json").unwrap_err();
        match err {
            ReplayError::UnreadableRecording { path, .. } => {
                assert_eq!(path, PathBuf::from("/definitely/not/here.json"))
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}
