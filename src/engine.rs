//! Analysis loop and the visualizer control surface
//!
//! The capture callback only appends to the [`SampleBuffer`]. Everything
//! else (FFT, smoothing, decisions and light commands) runs on the single
//! `audio-analysis` thread, one window per cycle.

use crate::audio::{
    CaptureSource, EndpointMonitor, EndpointQuery, RatioSmoother, SampleBuffer, SmoothedState,
    SpectrumAnalyzer,
};
use crate::config::AppConfig;
use crate::decision::{Actuation, DecisionEngine};
use crate::light::{ColorMode, Light, LightDevice, SharedLight};
use crate::nightlight::{Nightlight, SharedMode};
use parking_lot::Mutex;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Visualizer errors
#[derive(Error, Debug)]
pub enum VisualizerError {
    #[error("Thread error: {0}")]
    ThreadError(String),

    #[error("Audio collaborators were lost when the analysis thread failed")]
    Unavailable,
}

/// External audio collaborators, owned by whichever thread runs the loop
pub struct Collaborators {
    pub capture: Box<dyn CaptureSource>,
    pub endpoints: Box<dyn EndpointQuery>,
}

/// Result of one pass through the analysis loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The default endpoint changed; buffer cleared and capture resubscribed
    EndpointChanged,

    /// Not enough samples queued for a full window
    Insufficient,

    /// One window analyzed and acted on
    Analyzed(Actuation),
}

/// Sole owner of the smoothing and decision state
pub struct AnalysisLoop {
    poll_interval: Duration,
    buffer: SampleBuffer,
    capture: Box<dyn CaptureSource>,
    endpoints: EndpointMonitor,
    analyzer: SpectrumAnalyzer,
    smoother: RatioSmoother,
    decision: DecisionEngine,
    light: SharedLight,
    mode: SharedMode,
    subscribed: bool,
    failed_subscriptions: u32,
}

impl AnalysisLoop {
    pub fn new(
        config: &AppConfig,
        collaborators: Collaborators,
        light: SharedLight,
        mode: SharedMode,
    ) -> Self {
        let analyzer = SpectrumAnalyzer::new(config.audio.clone());
        let smoother = RatioSmoother::new(&config.audio, analyzer.sample_rate());
        let decision = DecisionEngine::new(
            config.audio.beat_threshold,
            config.light.idle_color,
            config.light.min_pulse_interval(),
            *mode.lock(),
        );

        Self {
            poll_interval: config.audio.poll_interval(),
            buffer: SampleBuffer::new(),
            capture: collaborators.capture,
            endpoints: EndpointMonitor::new(collaborators.endpoints),
            analyzer,
            smoother,
            decision,
            light,
            mode,
            subscribed: false,
            failed_subscriptions: 0,
        }
    }

    pub fn buffer(&self) -> &SampleBuffer {
        &self.buffer
    }

    pub fn smoothed(&self) -> &SmoothedState {
        self.smoother.state()
    }

    pub fn sample_rate(&self) -> u32 {
        self.analyzer.sample_rate()
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    /// Subscribe the buffer to the capture source and adopt its sample rate
    fn subscribe(&mut self) {
        let producer = self.buffer.clone();
        let on_samples = Box::new(move |bytes: &[u8]| producer.push_interleaved(bytes));

        match self.capture.start(on_samples) {
            Ok(sample_rate) => {
                log::info!("Capture subscribed at {} Hz", sample_rate);
                self.analyzer.set_sample_rate(sample_rate);
                self.smoother.set_sample_rate(sample_rate);
                self.subscribed = true;
                self.failed_subscriptions = 0;
            }
            Err(e) => {
                if self.failed_subscriptions == 0 {
                    log::warn!("Failed to start capture, retrying every cycle: {}", e);
                } else {
                    log::debug!("Capture retry {} failed: {}", self.failed_subscriptions, e);
                }
                self.subscribed = false;
                self.failed_subscriptions += 1;
            }
        }
    }

    /// Run one analysis cycle
    pub fn run_cycle(&mut self, now: Instant) -> CycleOutcome {
        if self.endpoints.poll() {
            self.capture.stop();
            self.buffer.clear();
            self.subscribe();
            return CycleOutcome::EndpointChanged;
        }

        if !self.subscribed {
            self.subscribe();
        }

        let window = match self.buffer.dequeue_window(self.analyzer.window_size()) {
            Some(window) => window,
            None => return CycleOutcome::Insufficient,
        };

        let metrics = self.analyzer.analyze(&window);
        let ratio = self.smoother.update(&metrics);

        self.decision.set_mode(*self.mode.lock());
        let actuation = self
            .decision
            .decide(self.smoother.state(), &metrics, now);

        log::debug!(
            "bass {:.2} ratio {:.3} mean {:.3} silent {} -> {:?}",
            metrics.peak_bass_magnitude,
            ratio,
            self.smoother.state().running_ratio_mean,
            self.smoother.state().is_silent,
            actuation
        );

        self.actuate(actuation);
        CycleOutcome::Analyzed(actuation)
    }

    fn actuate(&self, actuation: Actuation) {
        let result = match actuation {
            Actuation::SetColor(color) => self.light.lock().set_color(color),
            Actuation::Pulse(color) => self.light.lock().pulse(color),
            Actuation::DroppedBeat(_) => Ok(()),
        };
        if let Err(e) = result {
            log::warn!("Light actuation failed: {}", e);
        }
    }

    /// Loop until `running` is cleared, then release the capture.
    ///
    /// Sleeps one poll interval after cycles that had nothing to analyze and
    /// goes straight to the next cycle after a window was processed.
    pub fn run(mut self, running: &AtomicBool) -> Collaborators {
        log::info!("Analysis loop started");

        while running.load(Ordering::Acquire) {
            match self.run_cycle(Instant::now()) {
                CycleOutcome::Analyzed(_) => {}
                CycleOutcome::Insufficient | CycleOutcome::EndpointChanged => {
                    thread::sleep(self.poll_interval);
                }
            }
        }

        log::info!("Analysis loop stopping");
        self.into_collaborators()
    }

    /// Stop capture, drop queued samples and hand the collaborators back
    pub fn into_collaborators(mut self) -> Collaborators {
        self.capture.stop();
        self.buffer.clear();
        Collaborators {
            capture: self.capture,
            endpoints: self.endpoints.into_query(),
        }
    }
}

type Worker = Box<dyn FnOnce() -> Option<Collaborators> + Send>;

/// Control surface: start/stop the visualizer, pick colors, nightlight mode
pub struct Visualizer {
    config: AppConfig,
    light: SharedLight,
    mode: SharedMode,
    running: Arc<AtomicBool>,
    idle: Option<Collaborators>,
    worker: Option<JoinHandle<Option<Collaborators>>>,
    nightlight: Option<Nightlight>,
}

impl Visualizer {
    pub fn new(
        config: AppConfig,
        capture: Box<dyn CaptureSource>,
        endpoints: Box<dyn EndpointQuery>,
        device: Box<dyn LightDevice>,
    ) -> Self {
        let light = Light::new(device, config.light.pulse_hold()).shared();
        let mode = Arc::new(Mutex::new(config.light.initial_mode));

        Self {
            config,
            light,
            mode,
            running: Arc::new(AtomicBool::new(false)),
            idle: Some(Collaborators { capture, endpoints }),
            worker: None,
            nightlight: None,
        }
    }

    pub fn light(&self) -> &SharedLight {
        &self.light
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
            && self
                .worker
                .as_ref()
                .map(|handle| !handle.is_finished())
                .unwrap_or(false)
    }

    pub fn is_nightlight_on(&self) -> bool {
        self.nightlight.is_some()
    }

    pub fn color_mode(&self) -> ColorMode {
        *self.mode.lock()
    }

    /// Start the analysis thread; stops nightlight mode first
    pub fn start(&mut self) -> Result<(), VisualizerError> {
        self.start_with(|builder, worker| builder.spawn(worker))
    }

    fn start_with<S>(&mut self, spawn: S) -> Result<(), VisualizerError>
    where
        S: FnOnce(thread::Builder, Worker) -> io::Result<JoinHandle<Option<Collaborators>>>,
    {
        if self.is_running() {
            return Ok(());
        }
        self.stop_nightlight();
        self.join_worker();

        let collaborators = self.idle.take().ok_or(VisualizerError::Unavailable)?;

        if let Err(e) = self.light.lock().set_color_all(self.config.light.idle_color) {
            log::warn!("Failed to set idle color: {}", e);
        }

        // The loop stays reachable from here until the thread picks it up
        let slot = Arc::new(Mutex::new(Some(AnalysisLoop::new(
            &self.config,
            collaborators,
            self.light.clone(),
            self.mode.clone(),
        ))));
        let handoff = slot.clone();

        self.running.store(true, Ordering::Release);
        let running = self.running.clone();
        let worker: Worker = Box::new(move || {
            let analysis = handoff.lock().take()?;
            Some(analysis.run(&running))
        });

        match spawn(thread::Builder::new().name("audio-analysis".to_string()), worker) {
            Ok(handle) => {
                self.worker = Some(handle);
                log::info!("Visualizer started");
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::Release);
                self.idle = slot.lock().take().map(AnalysisLoop::into_collaborators);
                log::error!("Failed to spawn analysis thread: {}", e);
                Err(VisualizerError::ThreadError(e.to_string()))
            }
        }
    }

    /// Stop the analysis thread and turn the light off
    pub fn stop(&mut self) {
        if self.worker.is_none() {
            return;
        }
        self.running.store(false, Ordering::Release);
        self.join_worker();

        if let Err(e) = self.light.lock().turn_off_all() {
            log::warn!("Failed to turn light off: {}", e);
        }
        log::info!("Visualizer stopped");
    }

    fn join_worker(&mut self) {
        if let Some(handle) = self.worker.take() {
            match handle.join() {
                Ok(Some(collaborators)) => self.idle = Some(collaborators),
                Ok(None) => {}
                Err(_) => log::error!("Analysis thread panicked"),
            }
        }
    }

    /// Pick a manual color or go back to automatic selection
    pub fn set_manual_color(&mut self, mode: ColorMode) {
        *self.mode.lock() = mode;
        log::info!("Color mode: {}", mode);

        if let Some(nightlight) = &self.nightlight {
            nightlight.refresh();
        }
    }

    /// Cycle colors slowly; stops the visualizer first
    pub fn start_nightlight(&mut self) -> Result<(), VisualizerError> {
        if self.nightlight.is_some() {
            return Ok(());
        }
        self.stop();

        let nightlight = Nightlight::start(
            self.light.clone(),
            self.mode.clone(),
            self.config.light.nightlight_interval(),
        )
        .map_err(|e| VisualizerError::ThreadError(e.to_string()))?;

        self.nightlight = Some(nightlight);
        Ok(())
    }

    pub fn stop_nightlight(&mut self) {
        if let Some(mut nightlight) = self.nightlight.take() {
            nightlight.stop();
            if let Err(e) = self.light.lock().turn_off_all() {
                log::warn!("Failed to turn light off: {}", e);
            }
        }
    }

    /// Stop everything and restart the visualizer with fresh analysis state
    pub fn reset(&mut self) -> Result<(), VisualizerError> {
        log::info!("Resetting visualizer");
        self.stop_nightlight();
        self.stop();
        self.start()
    }
}

impl Drop for Visualizer {
    fn drop(&mut self) {
        self.stop_nightlight();
        self.stop();
    }
}
