//! Application configuration loaded from JSON

use crate::audio::AudioConfig;
use crate::light::LightConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration; every field falls back to its default
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub light: LightConfig,
}

impl AppConfig {
    /// Read, parse and validate a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json(&content)?;
        log::info!("Loaded config from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let audio = &self.audio;

        if audio.window_size == 0 || !audio.window_size.is_power_of_two() {
            return Err(ConfigError::Invalid(format!(
                "window_size must be a power of two, got {}",
                audio.window_size
            )));
        }
        if audio.default_sample_rate == 0 {
            return Err(ConfigError::Invalid(
                "default_sample_rate must be positive".to_string(),
            ));
        }
        if audio.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_ms must be positive".to_string(),
            ));
        }
        if audio.ratio_divisor <= 0.0 {
            return Err(ConfigError::Invalid(
                "ratio_divisor must be positive".to_string(),
            ));
        }
        if !audio.silence_seconds.is_finite() || audio.silence_seconds <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "silence_seconds must be positive, got {}",
                audio.silence_seconds
            )));
        }
        if audio.beat_threshold.is_nan() || audio.beat_threshold < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "beat_threshold must not be negative, got {}",
                audio.beat_threshold
            )));
        }

        let bands = [
            ("bass_range_hz", audio.bass_range_hz),
            ("lower_band_hz", audio.lower_band_hz),
            ("upper_band_hz", audio.upper_band_hz),
        ];
        for (name, (low, high)) in bands {
            if !(0.0 <= low && low < high) {
                return Err(ConfigError::Invalid(format!(
                    "{} must satisfy 0 <= low < high, got ({}, {})",
                    name, low, high
                )));
            }
        }
        if audio.lower_band_hz.0 < audio.bass_range_hz.1
            || audio.upper_band_hz.0 < audio.lower_band_hz.1
        {
            return Err(ConfigError::Invalid(
                "bands must not overlap: bass < lower < upper".to_string(),
            ));
        }

        if self.light.nightlight_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "nightlight_interval_secs must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
