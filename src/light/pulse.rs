//! Beat pulse rate limiting

use std::time::{Duration, Instant};

/// Drops beats that arrive within `min_interval` of the last issued pulse.
///
/// Excess beats are discarded, never queued.
#[derive(Debug, Clone)]
pub struct PulseDebouncer {
    min_interval: Duration,
    last_pulse: Option<Instant>,
}

impl PulseDebouncer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_pulse: None,
        }
    }

    pub fn last_pulse(&self) -> Option<Instant> {
        self.last_pulse
    }

    /// Claim a pulse at `now`; returns false if the beat must be dropped
    pub fn try_pulse(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_pulse {
            if now.saturating_duration_since(last) < self.min_interval {
                return false;
            }
        }
        self.last_pulse = Some(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN: Duration = Duration::from_millis(300);

    #[test]
    fn first_beat_always_pulses() {
        let mut debouncer = PulseDebouncer::new(MIN);
        assert!(debouncer.try_pulse(Instant::now()));
    }

    #[test]
    fn beats_closer_than_interval_yield_one_pulse() {
        let mut debouncer = PulseDebouncer::new(MIN);
        let t0 = Instant::now();

        assert!(debouncer.try_pulse(t0));
        assert!(!debouncer.try_pulse(t0 + Duration::from_millis(100)));
        assert_eq!(debouncer.last_pulse(), Some(t0));
    }

    #[test]
    fn beats_at_exactly_the_interval_yield_two_pulses() {
        let mut debouncer = PulseDebouncer::new(MIN);
        let t0 = Instant::now();

        assert!(debouncer.try_pulse(t0));
        assert!(debouncer.try_pulse(t0 + MIN));
    }

    #[test]
    fn dropped_beats_do_not_extend_the_window() {
        let mut debouncer = PulseDebouncer::new(MIN);
        let t0 = Instant::now();

        assert!(debouncer.try_pulse(t0));
        assert!(!debouncer.try_pulse(t0 + Duration::from_millis(200)));
        assert!(debouncer.try_pulse(t0 + Duration::from_millis(310)));
    }
}
