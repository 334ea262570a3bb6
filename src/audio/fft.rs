//! Spectral analysis: FFT over one sample window and band energy extraction

use super::AudioConfig;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::ops::Range;
use std::sync::Arc;

/// Per-window band measurements
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BandMetrics {
    /// Maximum magnitude over the bass bins
    pub peak_bass_magnitude: f64,

    /// Sum of squared magnitudes over the lower band
    pub lower_band_power: f64,

    /// Sum of squared magnitudes over the upper band
    pub upper_band_power: f64,
}

/// Map a frequency to its FFT bin, truncating toward zero
pub fn freq_to_index(freq: f64, window_size: usize, sample_rate: u32) -> usize {
    (freq * window_size as f64 / f64::from(sample_rate)) as usize
}

/// Map an FFT bin back to the frequency at its lower edge
pub fn index_to_freq(index: usize, window_size: usize, sample_rate: u32) -> f64 {
    index as f64 * f64::from(sample_rate) / window_size as f64
}

/// Bin ranges for the bass, lower and upper bands at one sample rate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandLayout {
    pub bass: Range<usize>,
    pub lower: Range<usize>,
    pub upper: Range<usize>,
}

impl BandLayout {
    pub fn new(config: &AudioConfig, sample_rate: u32) -> Self {
        let window_size = config.window_size;
        let to_range = |(low, high): (f64, f64)| -> Range<usize> {
            let start = freq_to_index(low, window_size, sample_rate).min(window_size);
            let end = freq_to_index(high, window_size, sample_rate).min(window_size);
            start..end.max(start)
        };

        Self {
            bass: to_range(config.bass_range_hz),
            lower: to_range(config.lower_band_hz),
            upper: to_range(config.upper_band_hz),
        }
    }

    /// Measure the bands over a magnitude spectrum
    pub fn measure(&self, magnitudes: &[f64]) -> BandMetrics {
        let power = |range: &Range<usize>| -> f64 {
            bins(magnitudes, range).iter().map(|m| m * m).sum()
        };

        BandMetrics {
            peak_bass_magnitude: bins(magnitudes, &self.bass)
                .iter()
                .copied()
                .fold(0.0, f64::max),
            lower_band_power: power(&self.lower),
            upper_band_power: power(&self.upper),
        }
    }
}

fn bins<'a>(magnitudes: &'a [f64], range: &Range<usize>) -> &'a [f64] {
    let end = range.end.min(magnitudes.len());
    &magnitudes[range.start.min(end)..end]
}

/// Forward FFT over fixed-size windows of 8-bit samples.
///
/// No window function is applied. Magnitudes are scaled by `1 / window_size`,
/// so a sine of amplitude `a` centred on a bin peaks at `a / 2`.
pub struct SpectrumAnalyzer {
    config: AudioConfig,
    fft: Arc<dyn Fft<f64>>,
    sample_rate: u32,
    layout: BandLayout,
}

impl SpectrumAnalyzer {
    pub fn new(config: AudioConfig) -> Self {
        let fft = FftPlanner::new().plan_fft_forward(config.window_size);
        let sample_rate = config.default_sample_rate;
        let layout = BandLayout::new(&config, sample_rate);

        Self {
            config,
            fft,
            sample_rate,
            layout,
        }
    }

    pub fn window_size(&self) -> usize {
        self.config.window_size
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn layout(&self) -> &BandLayout {
        &self.layout
    }

    /// Switch to a new capture sample rate and re-derive the band bins
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        if sample_rate == 0 || sample_rate == self.sample_rate {
            return;
        }
        self.sample_rate = sample_rate;
        self.layout = BandLayout::new(&self.config, sample_rate);
        log::info!(
            "Analyzer sample rate {} Hz, bins bass {:?} lower {:?} upper {:?}",
            sample_rate,
            self.layout.bass,
            self.layout.lower,
            self.layout.upper
        );
    }

    /// Magnitude spectrum of one window of real samples.
    ///
    /// Returns an empty spectrum when fewer than `window_size` samples are given.
    pub fn magnitudes(&self, samples: &[f64]) -> Vec<f64> {
        let n = self.config.window_size;
        if samples.len() < n {
            return Vec::new();
        }

        let mut buffer: Vec<Complex<f64>> = samples[..n]
            .iter()
            .map(|&s| Complex::new(s, 0.0))
            .collect();
        self.fft.process(&mut buffer);

        let scale = 1.0 / n as f64;
        buffer.iter().map(|c| c.norm() * scale).collect()
    }

    /// Analyze one window dequeued from the sample buffer
    pub fn analyze(&self, window: &[u8]) -> BandMetrics {
        let samples: Vec<f64> = window.iter().map(|&b| f64::from(b)).collect();
        let magnitudes = self.magnitudes(&samples);
        self.layout.measure(&magnitudes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn sine(freq: f64, amplitude: f64, sample_rate: u32, len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| amplitude * (2.0 * PI * freq * i as f64 / f64::from(sample_rate)).sin())
            .collect()
    }

    #[test]
    fn freq_to_index_truncates() {
        assert_eq!(freq_to_index(20.0, 16384, 48000), 6);
        assert_eq!(freq_to_index(200.0, 16384, 48000), 68);
        assert_eq!(freq_to_index(1000.0, 16384, 48000), 341);
        assert_eq!(freq_to_index(4000.0, 16384, 48000), 1365);
    }

    #[test]
    fn index_to_freq_inverts_exact_bins() {
        assert_eq!(index_to_freq(512, 16384, 48000), 1500.0);
        assert_eq!(freq_to_index(index_to_freq(512, 16384, 48000), 16384, 48000), 512);
    }

    #[test]
    fn default_layout_at_48k() {
        let layout = BandLayout::new(&AudioConfig::default(), 48000);

        assert_eq!(layout.bass, 6..68);
        assert_eq!(layout.lower, 68..341);
        assert_eq!(layout.upper, 341..1365);
    }

    #[test]
    fn set_sample_rate_rederives_bins() {
        let mut analyzer = SpectrumAnalyzer::new(AudioConfig::default());
        analyzer.set_sample_rate(44100);

        assert_eq!(analyzer.sample_rate(), 44100);
        assert_eq!(analyzer.layout().bass, 7..74);
        assert_eq!(analyzer.layout().upper, 371..1486);
    }

    #[test]
    fn layout_clamps_to_window_at_low_sample_rates() {
        let config = AudioConfig {
            window_size: 1024,
            ..AudioConfig::default()
        };
        let layout = BandLayout::new(&config, 2000);

        assert!(layout.upper.end <= 1024);
        assert!(layout.upper.start <= layout.upper.end);
    }

    #[test]
    fn measure_takes_peak_strictly_within_bass_range() {
        let layout = BandLayout {
            bass: 2..5,
            lower: 5..7,
            upper: 7..10,
        };
        let mut magnitudes = vec![0.0; 10];
        magnitudes[1] = 100.0; // below bass range
        magnitudes[3] = 4.0;
        magnitudes[5] = 50.0; // first lower bin, outside bass
        magnitudes[6] = 2.0;
        magnitudes[8] = 3.0;

        let metrics = layout.measure(&magnitudes);

        assert_eq!(metrics.peak_bass_magnitude, 4.0);
        assert_eq!(metrics.lower_band_power, 2504.0);
        assert_eq!(metrics.upper_band_power, 9.0);
    }

    #[test]
    fn silent_window_has_zero_metrics() {
        let analyzer = SpectrumAnalyzer::new(AudioConfig::default());
        let metrics = analyzer.analyze(&vec![0u8; 16384]);

        assert_eq!(metrics, BandMetrics::default());
    }

    #[test]
    fn short_window_yields_empty_spectrum() {
        let analyzer = SpectrumAnalyzer::new(AudioConfig::default());

        assert!(analyzer.magnitudes(&[1.0; 100]).is_empty());
        assert_eq!(analyzer.analyze(&[1; 100]), BandMetrics::default());
    }

    #[test]
    fn upper_band_tone_dominates_lower_band() {
        let analyzer = SpectrumAnalyzer::new(AudioConfig::default());
        let mut samples = sine(1500.0, 1.0, 48000, 16384);
        for (s, low) in samples.iter_mut().zip(sine(562.5, 0.1, 48000, 16384)) {
            *s += low;
        }

        let metrics = analyzer.layout().measure(&analyzer.magnitudes(&samples));

        assert!(metrics.lower_band_power > 0.0);
        assert!(metrics.upper_band_power > 50.0 * metrics.lower_band_power);
    }

    #[test]
    fn bass_tone_produces_peak_magnitude() {
        let analyzer = SpectrumAnalyzer::new(AudioConfig::default());
        // Bin 32 at 48 kHz / 16384
        let samples = sine(93.75, 0.5, 48000, 16384);

        let metrics = analyzer.layout().measure(&analyzer.magnitudes(&samples));

        assert!((metrics.peak_bass_magnitude - 0.25).abs() < 1e-9);
        assert!(metrics.upper_band_power < 1e-12);
    }

    #[test]
    fn one_lsb_bass_ripple_stays_below_beat_threshold() {
        let analyzer = SpectrumAnalyzer::new(AudioConfig::default());
        let window: Vec<u8> = sine(93.75, 1.0, 48000, 16384)
            .into_iter()
            .map(|s| (64.0 + s).round() as u8)
            .collect();

        let metrics = analyzer.analyze(&window);

        assert!(metrics.peak_bass_magnitude > 0.0);
        assert!(metrics.peak_bass_magnitude < AudioConfig::default().beat_threshold);
    }

    #[test]
    fn loud_bass_tone_crosses_beat_threshold() {
        let analyzer = SpectrumAnalyzer::new(AudioConfig::default());
        let window: Vec<u8> = sine(93.75, 60.0, 48000, 16384)
            .into_iter()
            .map(|s| (64.0 + s).round() as u8)
            .collect();

        let metrics = analyzer.analyze(&window);

        assert!(metrics.peak_bass_magnitude > 25.0);
    }
}
