//! Playback statistics
//!
//! Counts frames handed to the renderer and completed loops for the clip
//! currently playing, and logs a summary at a fixed interval.

use std::time::{Duration, Instant};

/// Interval between statistics log lines
pub const STATS_LOG_INTERVAL: Duration = Duration::from_secs(10);

/// Tracks statistics for the clip currently playing
#[derive(Debug)]
pub struct PlaybackStats {
    /// Distinct frames picked up from the backend
    frames_shown: u64,

    /// Times the clip wrapped around to the start
    loops: u64,

    /// Playback time accumulated from frame deltas
    played: Duration,

    last_stats_log: Instant,
}

impl PlaybackStats {
    pub fn new() -> Self {
        Self {
            frames_shown: 0,
            loops: 0,
            played: Duration::ZERO,
            last_stats_log: Instant::now(),
        }
    }

    pub fn record_frame(&mut self) {
        self.frames_shown += 1;
    }

    pub fn record_loop(&mut self) {
        self.loops += 1;
    }

    pub fn advance(&mut self, delta: Duration) {
        self.played += delta;
    }

    pub fn frames_shown(&self) -> u64 {
        self.frames_shown
    }

    pub fn loops(&self) -> u64 {
        self.loops
    }

    /// Average frames per second over the played time
    pub fn average_fps(&self) -> f64 {
        let secs = self.played.as_secs_f64();
        if secs <= 0.0 {
            0.0
        } else {
            self.frames_shown as f64 / secs
        }
    }

    /// Log statistics if interval has elapsed
    pub fn maybe_log_stats(&mut self, interval: Duration) {
        if self.last_stats_log.elapsed() < interval {
            return;
        }

        log::info!(
            "Playback stats: {} frames in {:.1}s ({:.2} fps), {} loops",
            self.frames_shown,
            self.played.as_secs_f64(),
            self.average_fps(),
            self.loops
        );

        self.last_stats_log = Instant::now();
    }

    /// Reset counters when a new clip starts
    pub fn reset(&mut self) {
        self.frames_shown = 0;
        self.loops = 0;
        self.played = Duration::ZERO;
        self.last_stats_log = Instant::now();
    }
}

impl Default for PlaybackStats {
    fn default() -> Self {
        Self::new()
    }
}
