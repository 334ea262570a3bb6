//! Recording light device for tests

use super::{Color, LightDevice, LightError};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetColor(Color, usize),
    TurnOff(usize),
}

pub type CommandLog = Arc<Mutex<Vec<Command>>>;

pub struct RecordingDevice {
    count: usize,
    fail_from: usize,
    log: CommandLog,
}

impl RecordingDevice {
    pub fn new(count: usize) -> (Self, CommandLog) {
        Self::failing_from(count, count)
    }

    /// Lights at `fail_from` and above report themselves unreachable
    pub fn failing_from(count: usize, fail_from: usize) -> (Self, CommandLog) {
        let log = CommandLog::default();
        (
            Self {
                count,
                fail_from,
                log: log.clone(),
            },
            log,
        )
    }

    fn check(&self, index: usize) -> Result<(), LightError> {
        if index >= self.fail_from {
            return Err(LightError::Unreachable(format!("light {}", index)));
        }
        Ok(())
    }
}

impl LightDevice for RecordingDevice {
    fn device_count(&self) -> usize {
        self.count
    }

    fn set_color(&mut self, color: Color, index: usize) -> Result<(), LightError> {
        self.check(index)?;
        self.log.lock().push(Command::SetColor(color, index));
        Ok(())
    }

    fn turn_off(&mut self, index: usize) -> Result<(), LightError> {
        self.check(index)?;
        self.log.lock().push(Command::TurnOff(index));
        Ok(())
    }
}
