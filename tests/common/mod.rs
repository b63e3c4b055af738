//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use std::time::Duration;

/// Create a test timeout duration
pub fn test_timeout() -> Duration {
    Duration::from_millis(100)
}

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}

/// Recording document with two interleaved streams and a channel descriptor
pub const TWO_STREAM_RECORDING: &str = r#"{
  "header": { "version": "1.0" },
  "streams": [
    {
      "info": {
        "name": ["BioSemi"],
        "type": ["EEG"],
        "channel_count": ["2"],
        "nominal_srate": ["100"],
        "channel_format": ["float32"],
        "source_id": ["myuid2424"],
        "desc": [{
          "manufacturer": ["BioSemi"],
          "channels": [{
            "channel": [
              { "label": ["C3"], "unit": ["microvolts"], "type": ["EEG"] },
              { "label": ["C4"], "unit": ["microvolts"], "type": ["EEG"] }
            ]
          }]
        }]
      },
      "time_stamps": [0.000, 0.010, 0.020, 0.030],
      "time_series": [[1.0, 2.0], [1.5, 2.5], [2.0, 3.0], [2.5, 3.5]]
    },
    {
      "info": {
        "name": ["Markers"],
        "type": ["Markers"],
        "channel_count": ["1"],
        "nominal_srate": ["0"],
        "channel_format": ["string"],
        "source_id": [""],
        "desc": null
      },
      "time_stamps": [0.005, 0.025],
      "time_series": [["start"], ["stop"]]
    }
  ]
}"#;
