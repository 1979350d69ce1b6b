use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Counters shared by every worker of one classification run.
pub struct RunMetrics {
    sequences_classified: AtomicUsize,
    sequences_skipped: AtomicUsize,

    // Timing (in microseconds)
    total_classify_time_us: AtomicU64,

    // Counts
    probes: AtomicUsize,
    spans: AtomicUsize,
    accepted_spans: AtomicUsize,
    candidates_evaluated: AtomicUsize,
    lookup_failures: AtomicUsize,
}

impl RunMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sequences_classified: AtomicUsize::new(0),
            sequences_skipped: AtomicUsize::new(0),
            total_classify_time_us: AtomicU64::new(0),
            probes: AtomicUsize::new(0),
            spans: AtomicUsize::new(0),
            accepted_spans: AtomicUsize::new(0),
            candidates_evaluated: AtomicUsize::new(0),
            lookup_failures: AtomicUsize::new(0),
        })
    }

    pub fn record_sequence(&self, duration: Duration, spans: usize, accepted: usize) {
        self.sequences_classified.fetch_add(1, Ordering::Relaxed);
        self.total_classify_time_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        self.spans.fetch_add(spans, Ordering::Relaxed);
        self.accepted_spans.fetch_add(accepted, Ordering::Relaxed);
    }

    pub fn record_skipped(&self) {
        self.sequences_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_probe(&self) {
        self.probes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_candidate(&self) {
        self.candidates_evaluated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_lookup_failure(&self) {
        self.lookup_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let classified = self.sequences_classified.load(Ordering::Relaxed);
        let total_us = self.total_classify_time_us.load(Ordering::Relaxed) as f64;

        MetricsSnapshot {
            sequences_classified: classified,
            sequences_skipped: self.sequences_skipped.load(Ordering::Relaxed),
            avg_sequence_time_ms: if classified > 0 {
                total_us / classified as f64 / 1000.0 // Convert to ms
            } else {
                0.0
            },
            probes: self.probes.load(Ordering::Relaxed),
            spans: self.spans.load(Ordering::Relaxed),
            accepted_spans: self.accepted_spans.load(Ordering::Relaxed),
            candidates_evaluated: self.candidates_evaluated.load(Ordering::Relaxed),
            lookup_failures: self.lookup_failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub sequences_classified: usize,
    pub sequences_skipped: usize,
    pub avg_sequence_time_ms: f64,
    pub probes: usize,
    pub spans: usize,
    pub accepted_spans: usize,
    pub candidates_evaluated: usize,
    pub lookup_failures: usize,
}

pub struct TimedOperation {
    start: Instant,
}

impl TimedOperation {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
