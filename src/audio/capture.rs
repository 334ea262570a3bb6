//! Audio capture: the capture-source seam and a cpal loopback implementation

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, StreamConfig};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use thiserror::Error;

/// Audio capture errors
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("No output device found")]
    NoOutputDevice,

    #[error("Failed to get device config: {0}")]
    ConfigError(String),

    #[error("Failed to build audio stream: {0}")]
    StreamError(String),

    #[error("Failed to start stream: {0}")]
    PlayError(String),

    #[error("Thread error: {0}")]
    ThreadError(String),
}

/// Receives interleaved stereo 8-bit frames from the capture thread
pub type SampleCallback = Box<dyn FnMut(&[u8]) + Send + 'static>;

/// Source of live audio.
///
/// `start` subscribes the callback and returns the stream's sample rate.
/// Starting an already started source replaces the previous subscription.
pub trait CaptureSource: Send {
    fn start(&mut self, on_samples: SampleCallback) -> Result<u32, CaptureError>;

    fn stop(&mut self);

    /// Sample rate of the current subscription, if any
    fn sample_rate(&self) -> Option<u32>;
}

/// Commands sent to the capture thread
enum CaptureCommand {
    Stop,
}

/// Loopback capture of the default output device.
///
/// The cpal stream is not `Send`, so it lives on a dedicated thread that
/// this handle controls through a command channel.
#[derive(Default)]
pub struct LoopbackCapture {
    command_tx: Option<mpsc::Sender<CaptureCommand>>,
    thread_handle: Option<JoinHandle<()>>,
    sample_rate: Option<u32>,
}

impl LoopbackCapture {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CaptureSource for LoopbackCapture {
    fn start(&mut self, on_samples: SampleCallback) -> Result<u32, CaptureError> {
        self.stop();

        let (command_tx, command_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();

        let thread_handle = thread::Builder::new()
            .name("audio-capture".to_string())
            .spawn(move || run_capture_thread(on_samples, command_rx, ready_tx))
            .map_err(|e| CaptureError::ThreadError(e.to_string()))?;

        let sample_rate = match ready_rx.recv() {
            Ok(Ok(rate)) => rate,
            Ok(Err(e)) => {
                let _ = thread_handle.join();
                return Err(e);
            }
            Err(_) => {
                let _ = thread_handle.join();
                return Err(CaptureError::ThreadError(
                    "capture thread exited before reporting".to_string(),
                ));
            }
        };

        self.command_tx = Some(command_tx);
        self.thread_handle = Some(thread_handle);
        self.sample_rate = Some(sample_rate);
        Ok(sample_rate)
    }

    fn stop(&mut self) {
        if let Some(tx) = self.command_tx.take() {
            let _ = tx.send(CaptureCommand::Stop);
        }
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
        self.sample_rate = None;
    }

    fn sample_rate(&self) -> Option<u32> {
        self.sample_rate
    }
}

impl Drop for LoopbackCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Own the cpal stream until told to stop
fn run_capture_thread(
    on_samples: SampleCallback,
    command_rx: mpsc::Receiver<CaptureCommand>,
    ready_tx: mpsc::Sender<Result<u32, CaptureError>>,
) {
    let stream = match open_loopback_stream(on_samples) {
        Ok((stream, sample_rate)) => {
            let _ = ready_tx.send(Ok(sample_rate));
            stream
        }
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    // Blocks until Stop or until the handle is dropped
    match command_rx.recv() {
        Ok(CaptureCommand::Stop) => log::info!("Audio capture stopping"),
        Err(mpsc::RecvError) => log::info!("Audio capture channel disconnected"),
    }
    drop(stream);
}

fn open_loopback_stream(on_samples: SampleCallback) -> Result<(cpal::Stream, u32), CaptureError> {
    let host = cpal::default_host();

    // WASAPI allows building an input stream on an output device (loopback)
    let device = host
        .default_output_device()
        .ok_or(CaptureError::NoOutputDevice)?;
    let config = device
        .default_output_config()
        .map_err(|e| CaptureError::ConfigError(format!("Loopback config: {}", e)))?;

    let sample_rate = config.sample_rate().0;
    let channels = config.channels() as usize;

    log::info!(
        "Audio capture: {} ({} Hz, {} channels)",
        device.name().unwrap_or_else(|_| "Unknown".to_string()),
        sample_rate,
        channels
    );

    let stream = match config.sample_format() {
        SampleFormat::F32 => build_stream::<f32>(&device, &config.into(), channels, on_samples),
        SampleFormat::I16 => build_stream::<i16>(&device, &config.into(), channels, on_samples),
        SampleFormat::U16 => build_stream::<u16>(&device, &config.into(), channels, on_samples),
        SampleFormat::U8 => build_stream::<u8>(&device, &config.into(), channels, on_samples),
        _ => {
            return Err(CaptureError::ConfigError(
                "Unsupported sample format".to_string(),
            ))
        }
    }
    .map_err(|e| CaptureError::StreamError(e.to_string()))?;

    stream
        .play()
        .map_err(|e| CaptureError::PlayError(e.to_string()))?;

    Ok((stream, sample_rate))
}

/// Reduce one interleaved frame to a left/right byte pair
fn stereo_pair(frame: &[u8]) -> [u8; 2] {
    match frame {
        [] => [0, 0],
        [mono] => [*mono, *mono],
        [left, right, ..] => [*left, *right],
    }
}

/// Build audio stream for given sample type
fn build_stream<T: cpal::Sample + cpal::SizedSample>(
    device: &Device,
    config: &StreamConfig,
    channels: usize,
    mut on_samples: SampleCallback,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    u8: cpal::FromSample<T>,
{
    let channels = channels.max(1);
    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            let bytes: Vec<u8> = data
                .iter()
                .map(|s| cpal::Sample::from_sample(*s))
                .collect();

            let stereo: Vec<u8> = bytes.chunks(channels).flat_map(stereo_pair).collect();
            on_samples(&stereo);
        },
        |err| {
            log::error!("Audio stream error: {}", err);
        },
        None,
    )
}
