//! Light device that only logs, for running without hardware

use super::{Color, LightDevice, LightError};

/// Logs every command at info level instead of driving hardware
#[derive(Debug, Clone)]
pub struct LogDevice {
    count: usize,
    colors: Vec<Option<Color>>,
}

impl LogDevice {
    pub fn new(count: usize) -> Self {
        Self {
            count,
            colors: vec![None; count],
        }
    }

    /// Color currently shown by the light at `index`
    pub fn color(&self, index: usize) -> Option<Color> {
        self.colors.get(index).copied().flatten()
    }

    fn check(&self, index: usize) -> Result<(), LightError> {
        if index >= self.count {
            return Err(LightError::InvalidIndex {
                index,
                count: self.count,
            });
        }
        Ok(())
    }
}

impl LightDevice for LogDevice {
    fn device_count(&self) -> usize {
        self.count
    }

    fn set_color(&mut self, color: Color, index: usize) -> Result<(), LightError> {
        self.check(index)?;
        if self.colors[index] != Some(color) {
            log::info!("Light {}: {}", index, color);
        }
        self.colors[index] = Some(color);
        Ok(())
    }

    fn turn_off(&mut self, index: usize) -> Result<(), LightError> {
        self.check(index)?;
        log::debug!("Light {}: off", index);
        self.colors[index] = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_color_per_light() {
        let mut device = LogDevice::new(2);
        device.set_color(Color::Cyan, 1).unwrap();

        assert_eq!(device.color(0), None);
        assert_eq!(device.color(1), Some(Color::Cyan));

        device.turn_off(1).unwrap();
        assert_eq!(device.color(1), None);
    }

    #[test]
    fn rejects_out_of_range_index() {
        let mut device = LogDevice::new(1);

        assert!(matches!(
            device.set_color(Color::Red, 1),
            Err(LightError::InvalidIndex { index: 1, count: 1 })
        ));
    }
}
