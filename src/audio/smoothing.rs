//! Band-ratio smoothing and silence detection

use super::{AudioConfig, BandMetrics};

/// Smoothed statistics carried across analysis cycles
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SmoothedState {
    /// Running mean of the band ratio since the last silence transition
    pub running_ratio_mean: f64,

    /// Number of ratios folded into the mean
    pub sample_count: u64,

    /// Zero-ratio cycles seen in a row
    pub consecutive_zero_ratio_frames: u64,

    /// Whether the stream is currently considered silent
    pub is_silent: bool,
}

/// Normalized upper/lower band power ratio; zero when the lower band is empty
pub fn band_ratio(metrics: &BandMetrics, divisor: f64) -> f64 {
    if metrics.lower_band_power == 0.0 {
        0.0
    } else {
        metrics.upper_band_power / metrics.lower_band_power / divisor
    }
}

/// Running-mean smoother over the band ratio with silence bookkeeping.
///
/// The mean is not time-weighted: every cycle since the last silence
/// transition counts equally.
#[derive(Debug, Clone)]
pub struct RatioSmoother {
    ratio_divisor: f64,
    silence_seconds: f64,
    window_size: usize,

    /// Zero-ratio cycles that must be exceeded before the stream is silent
    silence_frames: f64,

    state: SmoothedState,
}

impl RatioSmoother {
    pub fn new(config: &AudioConfig, sample_rate: u32) -> Self {
        let mut smoother = Self {
            ratio_divisor: config.ratio_divisor,
            silence_seconds: config.silence_seconds,
            window_size: config.window_size,
            silence_frames: 0.0,
            state: SmoothedState::default(),
        };
        smoother.set_sample_rate(sample_rate);
        smoother
    }

    /// Recompute the silence threshold in analysis cycles for a new rate
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        if sample_rate == 0 {
            return;
        }
        self.silence_frames =
            self.silence_seconds * self.window_size as f64 / f64::from(sample_rate);
    }

    pub fn silence_frames(&self) -> f64 {
        self.silence_frames
    }

    pub fn state(&self) -> &SmoothedState {
        &self.state
    }

    pub fn reset(&mut self) {
        self.state = SmoothedState::default();
    }

    /// Fold one cycle's band metrics into the smoothed state.
    ///
    /// Returns the raw ratio for this cycle.
    pub fn update(&mut self, metrics: &BandMetrics) -> f64 {
        let ratio = band_ratio(metrics, self.ratio_divisor);
        self.push_ratio(ratio);
        ratio
    }

    pub fn push_ratio(&mut self, ratio: f64) {
        let state = &mut self.state;

        if ratio == 0.0 {
            state.consecutive_zero_ratio_frames += 1;
        }

        if state.is_silent && ratio > 0.0 {
            state.is_silent = false;
            fold(state, ratio);
            state.consecutive_zero_ratio_frames = 0;
            log::debug!("Audio resumed, ratio {:.3}", ratio);
        } else if state.consecutive_zero_ratio_frames as f64 > self.silence_frames {
            if !state.is_silent {
                log::debug!(
                    "Silence after {} zero-ratio cycles",
                    state.consecutive_zero_ratio_frames
                );
            }
            state.is_silent = true;
            state.running_ratio_mean = 0.0;
            state.sample_count = 0;
        } else {
            fold(state, ratio);
            if ratio > 0.0 {
                state.consecutive_zero_ratio_frames = 0;
            }
        }
    }
}

fn fold(state: &mut SmoothedState, ratio: f64) {
    let count = state.sample_count as f64;
    state.running_ratio_mean = (state.running_ratio_mean * count + ratio) / (count + 1.0);
    state.sample_count += 1;
}
