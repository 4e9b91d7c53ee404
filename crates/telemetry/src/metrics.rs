//! Process-local metrics.
//!
//! Counters live in memory for the lifetime of the process and are not
//! shared across replicas.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// A gauge metric (can go up or down).
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec(&self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Histogram for latency tracking.
#[derive(Debug)]
pub struct Histogram {
    /// Buckets: 10ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s, 30s
    buckets: [AtomicU64; 10],
    sum: AtomicU64,
    count: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    const BUCKET_BOUNDS: [u64; 10] = [10, 50, 100, 250, 500, 1000, 2500, 5000, 10000, 30000];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Records a value in milliseconds.
    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        let last = Self::BUCKET_BOUNDS.len() - 1;
        let idx = Self::BUCKET_BOUNDS
            .iter()
            .position(|&bound| ms <= bound)
            .unwrap_or(last);
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum() as f64 / count as f64
        }
    }

    /// Returns `(upper bound ms, count)` per bucket.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Metrics for the web tier, producer, and worker.
#[derive(Debug, Default)]
pub struct Metrics {
    // Web tier writes
    pub books_created: Counter,
    pub books_updated: Counter,
    pub books_deleted: Counter,

    // Producer
    pub books_queued: Counter,
    pub queue_errors: Counter,

    // Worker
    pub messages_received: Counter,
    pub malformed_messages: Counter,
    pub unknown_actions: Counter,
    pub processing_errors: Counter,
    pub lookup_misses: Counter,
    pub covers_mirrored: Counter,
    pub cover_errors: Counter,

    // Latency histograms
    pub publish_latency_ms: Histogram,
    pub lookup_latency_ms: Histogram,
    pub processing_latency_ms: Histogram,

    // Gauges
    pub messages_in_flight: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            books_created: self.books_created.get(),
            books_updated: self.books_updated.get(),
            books_deleted: self.books_deleted.get(),
            books_queued: self.books_queued.get(),
            queue_errors: self.queue_errors.get(),
            messages_received: self.messages_received.get(),
            malformed_messages: self.malformed_messages.get(),
            unknown_actions: self.unknown_actions.get(),
            processing_errors: self.processing_errors.get(),
            lookup_misses: self.lookup_misses.get(),
            covers_mirrored: self.covers_mirrored.get(),
            cover_errors: self.cover_errors.get(),
            publish_latency_mean_ms: self.publish_latency_ms.mean(),
            lookup_latency_mean_ms: self.lookup_latency_ms.mean(),
            processing_latency_mean_ms: self.processing_latency_ms.mean(),
            messages_in_flight: self.messages_in_flight.get(),
        }
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub books_created: u64,
    pub books_updated: u64,
    pub books_deleted: u64,
    pub books_queued: u64,
    pub queue_errors: u64,
    pub messages_received: u64,
    pub malformed_messages: u64,
    pub unknown_actions: u64,
    pub processing_errors: u64,
    pub lookup_misses: u64,
    pub covers_mirrored: u64,
    pub cover_errors: u64,
    pub publish_latency_mean_ms: f64,
    pub lookup_latency_mean_ms: f64,
    pub processing_latency_mean_ms: f64,
    pub messages_in_flight: u64,
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
