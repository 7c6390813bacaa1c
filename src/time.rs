use std::time::Instant;

/// Measures the wall-clock time between consecutive frames.
///
/// The delta has no upper bound: a stalled frame produces a larger
/// integration step for the next update.
pub struct FrameClock {
    last: Instant,
    frames: u64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
            frames: 0,
        }
    }

    /// Advances the clock and returns the seconds since the previous tick.
    pub fn tick(&mut self) -> f32 {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> f32 {
        let delta = now.saturating_duration_since(self.last);
        self.last = now;
        self.frames += 1;
        delta.as_secs_f32()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn tick_reports_elapsed_seconds() {
        let start = Instant::now();
        let mut clock = FrameClock {
            last: start,
            frames: 0,
        };

        let dt = clock.tick_at(start + Duration::from_millis(250));

        assert!((dt - 0.25).abs() < 1e-6);
        assert_eq!(clock.frames(), 1);
    }

    #[test]
    fn tick_never_goes_negative() {
        let start = Instant::now() + Duration::from_secs(1);
        let mut clock = FrameClock {
            last: start,
            frames: 0,
        };

        assert_eq!(clock.tick_at(start - Duration::from_millis(500)), 0.0);
    }
}
