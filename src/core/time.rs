//! Fixed-step simulation clock

/// Fixed-rate clock driving the simulation.
///
/// Time only advances in whole ticks, so every deferred task wakes on an
/// exact tick index and replays identically for the same inputs.
#[derive(Debug, Clone)]
pub struct SimClock {
    /// Seconds per tick
    dt: f32,
    /// Ticks elapsed since creation
    tick: u64,
}

impl SimClock {
    /// Create a clock ticking at `tick_rate` Hz
    #[must_use]
    pub fn new(tick_rate: u32) -> Self {
        Self {
            dt: 1.0 / tick_rate.max(1) as f32,
            tick: 0,
        }
    }

    /// Advance by one tick
    pub fn advance(&mut self) {
        self.tick += 1;
    }

    /// Seconds per tick
    #[must_use]
    #[inline]
    pub fn dt(&self) -> f32 {
        self.dt
    }

    /// Current tick index
    #[must_use]
    #[inline]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Simulated seconds since creation
    #[must_use]
    pub fn elapsed(&self) -> f64 {
        self.tick as f64 * f64::from(self.dt)
    }

    /// Number of whole ticks covering `seconds`, never less than one
    #[must_use]
    pub fn ticks_for(&self, seconds: f32) -> u64 {
        ((seconds / self.dt).round() as u64).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_advances_in_ticks() {
        let mut clock = SimClock::new(60);
        for _ in 0..120 {
            clock.advance();
        }
        assert_eq!(clock.tick(), 120);
        assert!((clock.elapsed() - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_ticks_for_rounds_and_clamps() {
        let clock = SimClock::new(60);
        assert_eq!(clock.ticks_for(1.0), 60);
        assert_eq!(clock.ticks_for(1.5), 90);
        assert_eq!(clock.ticks_for(0.0), 1);
    }
}
