//! Mapping from smoothed spectral features to a light command

use crate::audio::{BandMetrics, SmoothedState};
use crate::light::{Color, ColorMode, PulseDebouncer};
use std::time::{Duration, Instant};

/// Squared-ratio thresholds, checked high to low; below the last one is red
const COLOR_THRESHOLDS: [(f64, Color); 5] = [
    (4.0, Color::Yellow),
    (3.75, Color::Green),
    (3.5, Color::Cyan),
    (2.25, Color::Blue),
    (2.0, Color::Magenta),
];

const FALLBACK_COLOR: Color = Color::Red;

/// Color bucket for a running ratio mean
pub fn color_for_ratio(running_ratio_mean: f64) -> Color {
    let v = running_ratio_mean * running_ratio_mean;
    COLOR_THRESHOLDS
        .iter()
        .find(|(threshold, _)| v > *threshold)
        .map(|&(_, color)| color)
        .unwrap_or(FALLBACK_COLOR)
}

/// What the analysis loop should do with the light this cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actuation {
    /// Show the color directly
    SetColor(Color),

    /// Off, hold, then show the color
    Pulse(Color),

    /// A beat arrived too soon after the last pulse; leave the light alone
    DroppedBeat(Color),
}

impl Actuation {
    pub fn color(self) -> Color {
        match self {
            Actuation::SetColor(c) | Actuation::Pulse(c) | Actuation::DroppedBeat(c) => c,
        }
    }
}

/// Decision state carried across cycles
#[derive(Debug, Clone)]
pub struct DecisionState {
    /// Color chosen on the most recent cycle
    pub active_color: Option<Color>,

    pub color_mode: ColorMode,

    debouncer: PulseDebouncer,
}

impl DecisionState {
    pub fn last_pulse(&self) -> Option<Instant> {
        self.debouncer.last_pulse()
    }
}

pub struct DecisionEngine {
    beat_threshold: f64,
    idle_color: Color,
    state: DecisionState,
}

impl DecisionEngine {
    pub fn new(
        beat_threshold: f64,
        idle_color: Color,
        min_pulse_interval: Duration,
        color_mode: ColorMode,
    ) -> Self {
        Self {
            beat_threshold,
            idle_color,
            state: DecisionState {
                active_color: None,
                color_mode,
                debouncer: PulseDebouncer::new(min_pulse_interval),
            },
        }
    }

    pub fn state(&self) -> &DecisionState {
        &self.state
    }

    pub fn set_mode(&mut self, mode: ColorMode) {
        self.state.color_mode = mode;
    }

    /// Color for this cycle; a manual color bypasses the spectral analysis
    pub fn select_color(&self, smoothed: &SmoothedState) -> Color {
        match self.state.color_mode {
            ColorMode::Manual(color) => color,
            ColorMode::Automatic if smoothed.is_silent => self.idle_color,
            ColorMode::Automatic => color_for_ratio(smoothed.running_ratio_mean),
        }
    }

    /// Beat detection runs in every color mode
    pub fn is_beat(&self, metrics: &BandMetrics) -> bool {
        metrics.peak_bass_magnitude > self.beat_threshold
    }

    pub fn decide(
        &mut self,
        smoothed: &SmoothedState,
        metrics: &BandMetrics,
        now: Instant,
    ) -> Actuation {
        let color = self.select_color(smoothed);
        self.state.active_color = Some(color);

        if !self.is_beat(metrics) {
            return Actuation::SetColor(color);
        }
        if self.state.debouncer.try_pulse(now) {
            Actuation::Pulse(color)
        } else {
            Actuation::DroppedBeat(color)
        }
    }
}
