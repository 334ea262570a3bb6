//! Indicator light colors and device actuation

mod log_device;
mod pulse;
#[cfg(test)]
pub(crate) mod testing;

pub use log_device::LogDevice;
pub use pulse::PulseDebouncer;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// Colors the light can show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Yellow,
    Green,
    Cyan,
    Blue,
    Magenta,
    Red,
}

impl Color {
    pub const ALL: [Color; 7] = [
        Color::White,
        Color::Yellow,
        Color::Green,
        Color::Cyan,
        Color::Blue,
        Color::Magenta,
        Color::Red,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Color::White => "white",
            Color::Yellow => "yellow",
            Color::Green => "green",
            Color::Cyan => "cyan",
            Color::Blue => "blue",
            Color::Magenta => "magenta",
            Color::Red => "red",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown color: {0}")]
pub struct UnknownColor(pub String);

impl FromStr for Color {
    type Err = UnknownColor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Color::ALL
            .into_iter()
            .find(|c| c.name() == lower)
            .ok_or_else(|| UnknownColor(s.to_string()))
    }
}

/// Who picks the light color: the analysis, or the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ColorMode {
    #[default]
    Automatic,
    Manual(Color),
}

impl ColorMode {
    pub fn is_automatic(self) -> bool {
        self == ColorMode::Automatic
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorMode::Automatic => f.write_str("automatic"),
            ColorMode::Manual(color) => fmt::Display::fmt(color, f),
        }
    }
}

impl FromStr for ColorMode {
    type Err = UnknownColor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("automatic") {
            return Ok(ColorMode::Automatic);
        }
        s.parse().map(ColorMode::Manual)
    }
}

impl TryFrom<String> for ColorMode {
    type Error = UnknownColor;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ColorMode> for String {
    fn from(mode: ColorMode) -> Self {
        mode.to_string()
    }
}

/// Light behavior configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    /// Minimum spacing between beat pulses, in milliseconds
    pub min_pulse_interval_ms: u64,

    /// How long the light stays off during a pulse, in milliseconds
    pub pulse_hold_ms: u64,

    /// Color shown while the stream is silent in automatic mode
    pub idle_color: Color,

    /// Seconds between color changes in nightlight mode
    pub nightlight_interval_secs: u64,

    /// Color mode at startup
    pub initial_mode: ColorMode,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            min_pulse_interval_ms: 300,
            pulse_hold_ms: 25,
            idle_color: Color::White,
            nightlight_interval_secs: 30,
            initial_mode: ColorMode::Automatic,
        }
    }
}

impl LightConfig {
    pub fn min_pulse_interval(&self) -> Duration {
        Duration::from_millis(self.min_pulse_interval_ms)
    }

    pub fn pulse_hold(&self) -> Duration {
        Duration::from_millis(self.pulse_hold_ms)
    }

    pub fn nightlight_interval(&self) -> Duration {
        Duration::from_secs(self.nightlight_interval_secs)
    }
}

/// Light actuation errors
#[derive(Error, Debug)]
pub enum LightError {
    #[error("Light device unreachable: {0}")]
    Unreachable(String),

    #[error("Light index {index} out of range ({count} devices)")]
    InvalidIndex { index: usize, count: usize },
}

/// Driver for one or more attached lights
pub trait LightDevice: Send {
    fn device_count(&self) -> usize;

    fn set_color(&mut self, color: Color, index: usize) -> Result<(), LightError>;

    fn turn_off(&mut self, index: usize) -> Result<(), LightError>;
}

/// Light shared by the analysis loop and the nightlight worker
pub type SharedLight = Arc<Mutex<Light>>;

/// Color, pulse and off commands over a [`LightDevice`].
///
/// Single-light commands target device 0. Every command is a no-op when no
/// device is attached.
pub struct Light {
    device: Box<dyn LightDevice>,
    pulse_hold: Duration,
    color: Option<Color>,
}

impl Light {
    pub fn new(device: Box<dyn LightDevice>, pulse_hold: Duration) -> Self {
        Self {
            device,
            pulse_hold,
            color: None,
        }
    }

    pub fn shared(self) -> SharedLight {
        Arc::new(Mutex::new(self))
    }

    pub fn device_count(&self) -> usize {
        self.device.device_count()
    }

    /// Last color set on device 0, `None` after the light was turned off
    pub fn color(&self) -> Option<Color> {
        self.color
    }

    pub fn set_color(&mut self, color: Color) -> Result<(), LightError> {
        if self.device_count() == 0 {
            return Ok(());
        }
        self.device.set_color(color, 0)?;
        self.color = Some(color);
        Ok(())
    }

    /// Turn device 0 off, hold, then show `color`.
    ///
    /// Blocks the calling thread for the hold duration.
    pub fn pulse(&mut self, color: Color) -> Result<(), LightError> {
        if self.device_count() == 0 {
            return Ok(());
        }
        self.device.turn_off(0)?;
        thread::sleep(self.pulse_hold);
        self.set_color(color)
    }

    pub fn set_color_all(&mut self, color: Color) -> Result<(), LightError> {
        for index in 0..self.device_count() {
            self.device.set_color(color, index)?;
            if index == 0 {
                self.color = Some(color);
            }
        }
        Ok(())
    }

    pub fn turn_off_all(&mut self) -> Result<(), LightError> {
        for index in 0..self.device_count() {
            self.device.turn_off(index)?;
            if index == 0 {
                self.color = None;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{Command, RecordingDevice};
    use super::*;

    #[test]
    fn color_names_round_trip_through_from_str() {
        for color in Color::ALL {
            assert_eq!(color.name().parse::<Color>(), Ok(color));
        }
        assert_eq!("  Magenta ".parse::<Color>(), Ok(Color::Magenta));
        assert!("orange".parse::<Color>().is_err());
    }

    #[test]
    fn automatic_is_a_mode_not_a_color() {
        assert!("automatic".parse::<Color>().is_err());
        assert_eq!("Automatic".parse::<ColorMode>(), Ok(ColorMode::Automatic));
        assert_eq!("white".parse::<ColorMode>(), Ok(ColorMode::Manual(Color::White)));
        assert!(ColorMode::default().is_automatic());
    }

    #[test]
    fn color_mode_serializes_as_plain_string() {
        let json = serde_json::to_string(&ColorMode::Manual(Color::Cyan)).unwrap();
        assert_eq!(json, "\"cyan\"");

        let mode: ColorMode = serde_json::from_str("\"automatic\"").unwrap();
        assert_eq!(mode, ColorMode::Automatic);
        assert!(serde_json::from_str::<ColorMode>("\"plaid\"").is_err());
    }

    #[test]
    fn single_commands_target_first_device() {
        let (device, log) = RecordingDevice::new(3);
        let mut light = Light::new(Box::new(device), Duration::ZERO);

        light.set_color(Color::Blue).unwrap();
        light.pulse(Color::Red).unwrap();

        assert_eq!(
            *log.lock(),
            vec![
                Command::SetColor(Color::Blue, 0),
                Command::TurnOff(0),
                Command::SetColor(Color::Red, 0),
            ]
        );
        assert_eq!(light.color(), Some(Color::Red));
    }

    #[test]
    fn all_commands_cover_every_device() {
        let (device, log) = RecordingDevice::new(2);
        let mut light = Light::new(Box::new(device), Duration::ZERO);

        light.set_color_all(Color::Green).unwrap();
        light.turn_off_all().unwrap();

        assert_eq!(
            *log.lock(),
            vec![
                Command::SetColor(Color::Green, 0),
                Command::SetColor(Color::Green, 1),
                Command::TurnOff(0),
                Command::TurnOff(1),
            ]
        );
        assert_eq!(light.color(), None);
    }

    #[test]
    fn zero_devices_make_every_command_a_noop() {
        let (device, log) = RecordingDevice::new(0);
        let mut light = Light::new(Box::new(device), Duration::from_secs(10));

        assert!(light.set_color(Color::Red).is_ok());
        assert!(light.pulse(Color::Red).is_ok());
        assert!(light.set_color_all(Color::Red).is_ok());
        assert!(light.turn_off_all().is_ok());
        assert!(log.lock().is_empty());
        assert_eq!(light.color(), None);
    }

    #[test]
    fn partial_set_color_all_still_tracks_device_zero() {
        let (device, log) = RecordingDevice::failing_from(3, 1);
        let mut light = Light::new(Box::new(device), Duration::ZERO);

        let err = light.set_color_all(Color::Cyan).unwrap_err();

        assert!(matches!(err, LightError::Unreachable(_)));
        assert_eq!(*log.lock(), vec![Command::SetColor(Color::Cyan, 0)]);
        assert_eq!(light.color(), Some(Color::Cyan));

        assert!(light.turn_off_all().is_err());
        assert_eq!(light.color(), None);
    }

    #[test]
    fn pulse_holds_before_setting_color() {
        let (device, _log) = RecordingDevice::new(1);
        let mut light = Light::new(Box::new(device), Duration::from_millis(20));

        let started = std::time::Instant::now();
        light.pulse(Color::Yellow).unwrap();

        assert!(started.elapsed() >= Duration::from_millis(20));
    }
}
