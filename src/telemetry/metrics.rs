//! Frame timing statistics
//!
//! The render loop has no simulation clock, so this is the only place frame
//! time is observed. Used for periodic debug logging.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Frame timing statistics over the sampling window
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameStats {
    /// Average frame time in milliseconds
    pub avg_ms: f64,
    /// Minimum frame time in milliseconds
    pub min_ms: f64,
    /// Maximum frame time in milliseconds
    pub max_ms: f64,
    /// Frames per second derived from the average
    pub fps: f64,
    /// Number of samples in the statistics
    pub sample_count: usize,
}

/// Rolling frame counter
pub struct FrameCounter {
    frame_times: VecDeque<Duration>,
    max_samples: usize,
    last_frame: Option<Instant>,
    last_report: Instant,
    report_interval: Duration,
    total_frames: u64,
}

impl Default for FrameCounter {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl FrameCounter {
    /// Create a counter that reports at most once per `report_interval`
    pub fn new(report_interval: Duration) -> Self {
        Self {
            frame_times: VecDeque::with_capacity(240),
            max_samples: 240,
            last_frame: None,
            last_report: Instant::now(),
            report_interval,
            total_frames: 0,
        }
    }

    /// Record a frame presented at `now`
    pub fn record_at(&mut self, now: Instant) {
        if let Some(last) = self.last_frame {
            self.push(now.saturating_duration_since(last));
        }
        self.last_frame = Some(now);
        self.total_frames += 1;
    }

    /// Record a frame presented now
    pub fn record(&mut self) {
        self.record_at(Instant::now());
    }

    fn push(&mut self, duration: Duration) {
        self.frame_times.push_back(duration);
        if self.frame_times.len() > self.max_samples {
            self.frame_times.pop_front();
        }
    }

    /// Total frames recorded since creation
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Statistics over the retained samples
    pub fn stats(&self) -> FrameStats {
        if self.frame_times.is_empty() {
            return FrameStats::default();
        }

        let times: Vec<f64> = self
            .frame_times
            .iter()
            .map(|d| d.as_secs_f64() * 1000.0)
            .collect();
        let sum: f64 = times.iter().sum();
        let avg_ms = sum / times.len() as f64;

        FrameStats {
            avg_ms,
            min_ms: times.iter().copied().fold(f64::INFINITY, f64::min),
            max_ms: times.iter().copied().fold(0.0, f64::max),
            fps: if avg_ms > 0.0 { 1000.0 / avg_ms } else { 0.0 },
            sample_count: times.len(),
        }
    }

    /// Returns stats when the report interval has elapsed since the last report
    pub fn take_report(&mut self, now: Instant) -> Option<FrameStats> {
        if now.saturating_duration_since(self.last_report) < self.report_interval {
            return None;
        }
        self.last_report = now;
        Some(self.stats())
    }
}
