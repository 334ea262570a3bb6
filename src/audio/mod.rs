//! Audio capture and analysis module

mod buffer;
mod capture;
mod endpoint;
mod fft;
mod smoothing;

pub use buffer::{downmix_stereo, SampleBuffer};
pub use capture::{CaptureError, CaptureSource, LoopbackCapture, SampleCallback};
pub use endpoint::{DefaultOutputEndpoint, EndpointId, EndpointMonitor, EndpointQuery};
pub use fft::{freq_to_index, index_to_freq, BandLayout, BandMetrics, SpectrumAnalyzer};
pub use smoothing::{band_ratio, RatioSmoother, SmoothedState};

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Audio processing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// FFT window size (power of two)
    pub window_size: usize,

    /// Loop cadence while the buffer is underfull, in milliseconds
    pub poll_interval_ms: u64,

    /// Bass range used for beat detection, `[low, high)` Hz
    pub bass_range_hz: (f64, f64),

    /// Lower band of the color ratio, `[low, high)` Hz
    pub lower_band_hz: (f64, f64),

    /// Upper band of the color ratio, `[low, high)` Hz
    pub upper_band_hz: (f64, f64),

    /// Normalization divisor applied to upper/lower band power
    pub ratio_divisor: f64,

    /// Peak bass magnitude above which a cycle counts as a beat
    pub beat_threshold: f64,

    /// Length of zero-ratio audio that marks the stream as silent
    pub silence_seconds: f64,

    /// Sample rate assumed until a capture source reports its own
    pub default_sample_rate: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            window_size: 16384,
            poll_interval_ms: 25,
            bass_range_hz: (20.0, 200.0),
            lower_band_hz: (200.0, 1000.0),
            upper_band_hz: (1000.0, 4000.0),
            ratio_divisor: 1.2,
            beat_threshold: 0.7,
            silence_seconds: 3.0,
            default_sample_rate: 48000,
        }
    }
}

impl AudioConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
