//! Temporal merge of all streams into one dispatch schedule

use crate::types::Stream;

/// One unit of replay work
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Event {
    /// Recorded timestamp in seconds
    pub timestamp: f64,
    /// Index of the owning stream
    pub stream_index: usize,
    /// Index of the sample within its stream
    pub sample_index: usize,
}

impl Event {
    /// Create an event
    pub fn new(timestamp: f64, stream_index: usize, sample_index: usize) -> Self {
        Self {
            timestamp,
            stream_index,
            sample_index,
        }
    }
}

/// All events of a recording in dispatch order
///
/// Sorted by `(timestamp, stream_index, sample_index)`: simultaneous events
/// go to the lower stream index first, and within a stream to the lower
/// sample index. The order is fully determined by the input.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventSchedule {
    events: Vec<Event>,
}

impl EventSchedule {
    /// Merge every stream
    pub fn build(streams: &[Stream]) -> Self {
        Self::build_for(streams, |_| true)
    }

    /// Merge the streams for which `include(stream_index)` holds
    ///
    /// Stream indices in the events stay those of `streams`.
    pub fn build_for(streams: &[Stream], include: impl Fn(usize) -> bool) -> Self {
        let total = streams
            .iter()
            .enumerate()
            .filter(|(s, _)| include(*s))
            .map(|(_, stream)| stream.timestamps.len())
            .sum();

        let mut events = Vec::with_capacity(total);
        for (s, stream) in streams.iter().enumerate() {
            if !include(s) {
                continue;
            }
            events.extend(
                stream
                    .timestamps
                    .iter()
                    .enumerate()
                    .map(|(k, &timestamp)| Event::new(timestamp, s, k)),
            );
        }

        events.sort_by(|a, b| {
            a.timestamp
                .total_cmp(&b.timestamp)
                .then(a.stream_index.cmp(&b.stream_index))
                .then(a.sample_index.cmp(&b.sample_index))
        });

        Self { events }
    }

    /// Number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if there is nothing to replay
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events in dispatch order
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Iterate over events in dispatch order
    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }

    /// Timestamp of the first event (the replay time origin)
    pub fn first_timestamp(&self) -> Option<f64> {
        self.events.first().map(|e| e.timestamp)
    }

    /// Recorded time between the first and last event, in seconds
    pub fn span_secs(&self) -> f64 {
        match (self.events.first(), self.events.last()) {
            (Some(first), Some(last)) => last.timestamp - first.timestamp,
            _ => 0.0,
        }
    }
}

impl<'a> IntoIterator for &'a EventSchedule {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
