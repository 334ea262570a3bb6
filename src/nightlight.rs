//! Nightlight mode: a slow color cycle that runs while the visualizer is off

use crate::light::{Color, ColorMode, SharedLight};
use parking_lot::Mutex;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Color mode shared between the control surface and the workers
pub type SharedMode = Arc<Mutex<ColorMode>>;

/// Commands sent to the nightlight thread
enum NightlightCommand {
    /// Re-apply the color now, e.g. after the user picked a new one
    Refresh,
    Stop,
}

/// Handle to a running nightlight thread
pub struct Nightlight {
    command_tx: mpsc::Sender<NightlightCommand>,
    thread_handle: Option<JoinHandle<()>>,
}

impl Nightlight {
    pub fn start(
        light: SharedLight,
        mode: SharedMode,
        interval: Duration,
    ) -> Result<Self, std::io::Error> {
        let (command_tx, command_rx) = mpsc::channel();

        let thread_handle = thread::Builder::new()
            .name("nightlight".to_string())
            .spawn(move || run_nightlight(light, mode, interval, command_rx))?;

        Ok(Self {
            command_tx,
            thread_handle: Some(thread_handle),
        })
    }

    pub fn refresh(&self) {
        let _ = self.command_tx.send(NightlightCommand::Refresh);
    }

    pub fn stop(&mut self) {
        let _ = self.command_tx.send(NightlightCommand::Stop);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Nightlight {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Manual color if one is set, otherwise a random one
fn nightlight_color(mode: ColorMode) -> Color {
    match mode {
        ColorMode::Manual(color) => color,
        ColorMode::Automatic => Color::ALL[rand::random_range(0..Color::ALL.len())],
    }
}

fn run_nightlight(
    light: SharedLight,
    mode: SharedMode,
    interval: Duration,
    command_rx: mpsc::Receiver<NightlightCommand>,
) {
    log::info!("Nightlight started ({}s interval)", interval.as_secs());

    loop {
        let color = nightlight_color(*mode.lock());
        if let Err(e) = light.lock().set_color(color) {
            log::warn!("Nightlight failed to set {}: {}", color, e);
        }

        match command_rx.recv_timeout(interval) {
            Ok(NightlightCommand::Refresh) | Err(mpsc::RecvTimeoutError::Timeout) => {}
            Ok(NightlightCommand::Stop) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    log::info!("Nightlight stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light::testing::{Command, RecordingDevice};
    use crate::light::Light;
    use std::time::Instant;

    fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn manual_mode_uses_manual_color() {
        assert_eq!(nightlight_color(ColorMode::Manual(Color::Cyan)), Color::Cyan);
    }

    #[test]
    fn automatic_mode_picks_from_the_palette() {
        for _ in 0..50 {
            assert!(Color::ALL.contains(&nightlight_color(ColorMode::Automatic)));
        }
    }

    #[test]
    fn refresh_applies_new_color_immediately() {
        let (device, log) = RecordingDevice::new(1);
        let light = Light::new(Box::new(device), Duration::ZERO).shared();
        let mode: SharedMode = Arc::new(Mutex::new(ColorMode::Manual(Color::Green)));

        let mut nightlight =
            Nightlight::start(light.clone(), mode.clone(), Duration::from_secs(3600)).unwrap();
        assert!(wait_for(|| light.lock().color() == Some(Color::Green)));

        *mode.lock() = ColorMode::Manual(Color::Red);
        nightlight.refresh();
        assert!(wait_for(|| light.lock().color() == Some(Color::Red)));

        nightlight.stop();
        assert_eq!(
            *log.lock(),
            vec![
                Command::SetColor(Color::Green, 0),
                Command::SetColor(Color::Red, 0),
            ]
        );
    }

    #[test]
    fn cycles_on_interval() {
        let (device, log) = RecordingDevice::new(1);
        let light = Light::new(Box::new(device), Duration::ZERO).shared();
        let mode: SharedMode = Arc::new(Mutex::new(ColorMode::Automatic));

        let mut nightlight =
            Nightlight::start(light, mode, Duration::from_millis(10)).unwrap();
        assert!(wait_for(|| log.lock().len() >= 3));
        nightlight.stop();
    }
}
