//! Frame clock

use std::time::{Duration, Instant};

/// Delta and total time, advanced once per frame
#[derive(Debug, Clone)]
pub struct GameTime {
    last_tick: Instant,
    delta: Duration,
    elapsed: Duration,
    frame: u64,
    /// Deltas longer than this are clamped, e.g. after a debugger pause
    max_delta: Duration,
}

impl GameTime {
    #[must_use]
    pub fn new() -> Self {
        Self {
            last_tick: Instant::now(),
            delta: Duration::ZERO,
            elapsed: Duration::ZERO,
            frame: 0,
            max_delta: Duration::from_millis(250),
        }
    }

    /// Measure the time since the previous tick
    pub fn tick(&mut self) {
        let now = Instant::now();
        let delta = now - self.last_tick;
        self.last_tick = now;
        self.advance(delta);
    }

    /// Step the clock by a fixed amount
    pub fn advance(&mut self, delta: Duration) {
        self.delta = delta.min(self.max_delta);
        self.elapsed += self.delta;
        self.frame += 1;
    }

    /// Forget the time spent since the last tick, e.g. after loading
    pub fn reset_delta(&mut self) {
        self.last_tick = Instant::now();
        self.delta = Duration::ZERO;
    }

    #[must_use]
    pub const fn delta(&self) -> Duration {
        self.delta
    }

    #[must_use]
    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    #[must_use]
    pub fn elapsed_seconds(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }

    #[must_use]
    pub const fn frame(&self) -> u64 {
        self.frame
    }
}

impl Default for GameTime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_accumulates() {
        let mut time = GameTime::new();
        time.advance(Duration::from_millis(16));
        time.advance(Duration::from_millis(16));
        assert_eq!(time.frame(), 2);
        assert!((time.elapsed_seconds() - 0.032).abs() < 1e-6);
        assert!((time.delta_seconds() - 0.016).abs() < 1e-6);
    }

    #[test]
    fn test_long_frames_are_clamped() {
        let mut time = GameTime::new();
        time.advance(Duration::from_secs(5));
        assert_eq!(time.delta(), Duration::from_millis(250));
    }
}
