//! Beatlight Library
//!
//! Listens to the system audio output and drives an indicator light from
//! it: the color follows the balance between mid and treble energy, and
//! bass peaks briefly pulse the light.

pub mod audio;
pub mod config;
pub mod decision;
pub mod engine;
pub mod light;
pub mod nightlight;

pub use audio::{AudioConfig, DefaultOutputEndpoint, LoopbackCapture};
pub use config::{AppConfig, ConfigError};
pub use decision::{color_for_ratio, Actuation, DecisionEngine};
pub use engine::{AnalysisLoop, Collaborators, CycleOutcome, Visualizer, VisualizerError};
pub use light::{Color, ColorMode, Light, LightConfig, LightDevice, LightError, LogDevice};
