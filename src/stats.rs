use serde::Serialize;
use std::time::Instant;

/// Collects publishing statistics for a camera pipeline.
pub struct FrameStats {
    published: u64,
    dropped: u64,
    total_bytes: u64,
    start_time: Instant,
}

/// Snapshot of frame stats for serialisation and logging.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub fps: f64,
    pub published: u64,
    pub dropped: u64,
    pub drop_rate: f64,
    pub bandwidth_bps: u64,
}

impl FrameStats {
    /// Create new stats with zeroed counters.
    pub fn new() -> Self {
        Self {
            published: 0,
            dropped: 0,
            total_bytes: 0,
            start_time: Instant::now(),
        }
    }

    /// Record a published frame and its encoded size.
    pub fn record_publish(&mut self, bytes: usize) {
        self.published += 1;
        self.total_bytes += bytes as u64;
    }

    /// Record a single dropped frame.
    pub fn record_drop(&mut self) {
        self.dropped += 1;
    }

    /// Record several dropped frames at once (queue drains).
    pub fn add_drops(&mut self, count: u64) {
        self.dropped += count;
    }

    /// Published frames per second since the stats started.
    pub fn fps(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed < 0.001 {
            return 0.0;
        }
        self.published as f64 / elapsed
    }

    /// Drop rate as a percentage (0.0 - 100.0).
    pub fn drop_rate(&self) -> f64 {
        let total = self.published + self.dropped;
        if total == 0 {
            return 0.0;
        }
        (self.dropped as f64 / total as f64) * 100.0
    }

    /// Encoded bandwidth in bytes per second.
    pub fn bandwidth_bps(&self) -> u64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed < 0.001 {
            return 0;
        }
        (self.total_bytes as f64 / elapsed) as u64
    }

    /// Reset all counters.
    pub fn reset(&mut self) {
        self.published = 0;
        self.dropped = 0;
        self.total_bytes = 0;
        self.start_time = Instant::now();
    }

    /// Take a serialisable snapshot.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            fps: self.fps(),
            published: self.published,
            dropped: self.dropped,
            drop_rate: self.drop_rate(),
            bandwidth_bps: self.bandwidth_bps(),
        }
    }
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::new()
    }
}
