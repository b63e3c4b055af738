//! Test data builders for creating test objects

use stream_replay::{RawNode, Sample, Stream, StreamInfo};

/// Builder for creating test Streams
pub struct StreamBuilder {
    info: StreamInfo,
    timestamps: Vec<f64>,
    samples: Vec<Sample>,
}

impl StreamBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            info: StreamInfo {
                name: name.to_string(),
                content_type: "EEG".to_string(),
                channel_count: "1".to_string(),
                nominal_rate: "100".to_string(),
                sample_format: "float32".to_string(),
                source_id: format!("{}-uid", name),
                descriptor: RawNode::default(),
            },
            timestamps: Vec::new(),
            samples: Vec::new(),
        }
    }

    pub fn content_type(mut self, content_type: &str) -> Self {
        self.info.content_type = content_type.to_string();
        self
    }

    pub fn channel_count(mut self, channel_count: &str) -> Self {
        self.info.channel_count = channel_count.to_string();
        self
    }

    pub fn nominal_rate(mut self, nominal_rate: &str) -> Self {
        self.info.nominal_rate = nominal_rate.to_string();
        self
    }

    pub fn sample_format(mut self, sample_format: &str) -> Self {
        self.info.sample_format = sample_format.to_string();
        self
    }

    pub fn descriptor(mut self, descriptor: RawNode) -> Self {
        self.info.descriptor = descriptor;
        self
    }

    /// Add one single-channel sample whose value is its index in the stream
    pub fn at(mut self, timestamp: f64) -> Self {
        let value = self.samples.len() as f64;
        self.timestamps.push(timestamp);
        self.samples.push(Sample::Numeric(vec![value]));
        self
    }

    /// Add one sample per timestamp
    pub fn timestamps(self, timestamps: &[f64]) -> Self {
        timestamps.iter().fold(self, |b, &t| b.at(t))
    }

    pub fn build(self) -> Stream {
        Stream {
            info: self.info,
            timestamps: self.timestamps,
            samples: self.samples,
        }
    }
}

