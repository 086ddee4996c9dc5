// src/metrics.rs
//
// Process-wide counters. Cheap to clone; every clone shares the same
// atomics, so sessions on different threads can record into one set.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct PipelineMetrics {
    pub live_calls: Arc<AtomicU64>,
    pub videos_analyzed: Arc<AtomicU64>,
    pub frames_scanned: Arc<AtomicU64>,
    pub frames_classified: Arc<AtomicU64>,
    pub frames_skipped: Arc<AtomicU64>,
    pub failures: Arc<AtomicU64>,
    pub last_video_time_us: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            live_calls: Arc::new(AtomicU64::new(0)),
            videos_analyzed: Arc::new(AtomicU64::new(0)),
            frames_scanned: Arc::new(AtomicU64::new(0)),
            frames_classified: Arc::new(AtomicU64::new(0)),
            frames_skipped: Arc::new(AtomicU64::new(0)),
            failures: Arc::new(AtomicU64::new(0)),
            last_video_time_us: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }

    pub fn inc(&self, counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_timing(&self, counter: &AtomicU64, duration_us: u64) {
        counter.store(duration_us, Ordering::Relaxed);
    }

    pub fn frames_per_second(&self) -> f64 {
        let frames = self.frames_scanned.load(Ordering::Relaxed);
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed > 0.01 {
            frames as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            live_calls: self.live_calls.load(Ordering::Relaxed),
            videos_analyzed: self.videos_analyzed.load(Ordering::Relaxed),
            frames_scanned: self.frames_scanned.load(Ordering::Relaxed),
            frames_classified: self.frames_classified.load(Ordering::Relaxed),
            frames_skipped: self.frames_skipped.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            last_video_time_us: self.last_video_time_us.load(Ordering::Relaxed),
            fps: self.frames_per_second(),
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSummary {
    pub live_calls: u64,
    pub videos_analyzed: u64,
    pub frames_scanned: u64,
    pub frames_classified: u64,
    pub frames_skipped: u64,
    pub failures: u64,
    pub last_video_time_us: u64,
    pub fps: f64,
    pub elapsed_secs: f64,
}
