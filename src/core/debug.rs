//! Rolling frame statistics shown by the debug info window

use std::collections::VecDeque;
use std::time::Duration;

const WINDOW: usize = 120;

/// Frame times over the last couple of seconds plus per-frame counters
#[derive(Debug)]
pub struct FrameStats {
    samples: VecDeque<Duration>,
    total_frames: u64,
    draw_calls: u32,
    light_count: usize,
    entity_count: usize,
}

impl FrameStats {
    #[must_use]
    pub fn new() -> Self {
        Self {
            samples: VecDeque::with_capacity(WINDOW),
            total_frames: 0,
            draw_calls: 0,
            light_count: 0,
            entity_count: 0,
        }
    }

    pub fn record_frame(&mut self, delta: Duration) {
        self.total_frames += 1;
        if self.samples.len() == WINDOW {
            self.samples.pop_front();
        }
        self.samples.push_back(delta);
    }

    /// Counters taken from the last rendered frame
    pub fn record_scene(&mut self, draw_calls: u32, entity_count: usize, light_count: usize) {
        self.draw_calls = draw_calls;
        self.entity_count = entity_count;
        self.light_count = light_count;
    }

    #[must_use]
    pub fn fps(&self) -> f32 {
        let total: Duration = self.samples.iter().sum();
        if total.is_zero() {
            0.0
        } else {
            self.samples.len() as f32 / total.as_secs_f32()
        }
    }

    #[must_use]
    pub fn avg_frame_ms(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let total: Duration = self.samples.iter().sum();
        total.as_secs_f32() * 1000.0 / self.samples.len() as f32
    }

    #[must_use]
    pub fn min_frame_ms(&self) -> f32 {
        self.samples
            .iter()
            .min()
            .map_or(0.0, |d| d.as_secs_f32() * 1000.0)
    }

    #[must_use]
    pub fn max_frame_ms(&self) -> f32 {
        self.samples
            .iter()
            .max()
            .map_or(0.0, |d| d.as_secs_f32() * 1000.0)
    }

    #[must_use]
    pub const fn total_frames(&self) -> u64 {
        self.total_frames
    }

    #[must_use]
    pub const fn draw_calls(&self) -> u32 {
        self.draw_calls
    }

    #[must_use]
    pub const fn entity_count(&self) -> usize {
        self.entity_count
    }

    #[must_use]
    pub const fn light_count(&self) -> usize {
        self.light_count
    }

    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "FPS: {:.1} | Frame: {:.2}ms (min: {:.2}, max: {:.2})",
            self.fps(),
            self.avg_frame_ms(),
            self.min_frame_ms(),
            self.max_frame_ms()
        )
    }
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stats_are_zero() {
        let stats = FrameStats::new();
        assert_eq!(stats.fps(), 0.0);
        assert_eq!(stats.avg_frame_ms(), 0.0);
        assert_eq!(stats.max_frame_ms(), 0.0);
    }

    #[test]
    fn test_average_and_extremes() {
        let mut stats = FrameStats::new();
        stats.record_frame(Duration::from_millis(10));
        stats.record_frame(Duration::from_millis(30));
        assert!((stats.avg_frame_ms() - 20.0).abs() < 1e-3);
        assert!((stats.fps() - 50.0).abs() < 1e-2);
        assert!((stats.min_frame_ms() - 10.0).abs() < 1e-3);
        assert!((stats.max_frame_ms() - 30.0).abs() < 1e-3);
    }

    #[test]
    fn test_window_drops_old_samples() {
        let mut stats = FrameStats::new();
        stats.record_frame(Duration::from_secs(1));
        for _ in 0..WINDOW {
            stats.record_frame(Duration::from_millis(16));
        }
        assert_eq!(stats.total_frames(), WINDOW as u64 + 1);
        assert!(stats.max_frame_ms() < 17.0);
    }
}
