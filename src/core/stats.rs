//! Tick statistics

use std::collections::VecDeque;
use std::time::Duration;

/// Rolling wall-clock cost of simulation ticks
#[derive(Debug)]
pub struct TickStats {
    /// Tick time history for averaging
    tick_times: VecDeque<Duration>,
    /// Maximum samples to keep
    max_samples: usize,
    /// Average tick time in milliseconds
    avg_tick_ms: f32,
    /// Maximum tick time in milliseconds
    max_tick_ms: f32,
    /// Total ticks recorded
    total_ticks: u64,
}

impl TickStats {
    /// Create a tracker averaging over the last `max_samples` ticks
    pub fn new(max_samples: usize) -> Self {
        Self {
            tick_times: VecDeque::with_capacity(max_samples),
            max_samples: max_samples.max(1),
            avg_tick_ms: 0.0,
            max_tick_ms: 0.0,
            total_ticks: 0,
        }
    }

    /// Record how long a tick took
    pub fn record(&mut self, elapsed: Duration) {
        self.total_ticks += 1;
        if self.tick_times.len() >= self.max_samples {
            self.tick_times.pop_front();
        }
        self.tick_times.push_back(elapsed);

        let total: Duration = self.tick_times.iter().sum();
        let max = self.tick_times.iter().max().copied().unwrap_or_default();
        self.avg_tick_ms = total.as_secs_f32() * 1000.0 / self.tick_times.len() as f32;
        self.max_tick_ms = max.as_secs_f32() * 1000.0;
    }

    /// Average tick time in milliseconds
    pub fn avg_tick_ms(&self) -> f32 {
        self.avg_tick_ms
    }

    /// Slowest recent tick in milliseconds
    pub fn max_tick_ms(&self) -> f32 {
        self.max_tick_ms
    }

    /// Ticks recorded since creation
    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    /// One-line summary for logs
    pub fn format_stats(&self) -> String {
        format!(
            "ticks: {} | tick: {:.3}ms (max: {:.3})",
            self.total_ticks, self.avg_tick_ms, self.max_tick_ms
        )
    }
}

impl Default for TickStats {
    fn default() -> Self {
        Self::new(120)
    }
}
