//! Streaming core metrics.
//!
//! One `StreamMetrics` instance lives for the process lifetime and is shared
//! by the registry, poller, and dispatcher tasks. Everything is an atomic
//! counter; the active-connection gauge itself lives in the registry, which
//! reports it into snapshots.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

#[derive(Debug)]
pub struct StreamMetrics {
    started_at: Instant,
    connections_opened: AtomicU64,
    connections_closed: AtomicU64,
    capacity_rejections: AtomicU64,
    events_published: AtomicU64,
    events_delivered: AtomicU64,
    events_dropped: AtomicU64,
    slow_consumer_evictions: AtomicU64,
    poll_cycles: AtomicU64,
    partition_fetch_failures: AtomicU64,
    delivery_latency_micros_total: AtomicU64,
}

impl StreamMetrics {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            connections_opened: AtomicU64::new(0),
            connections_closed: AtomicU64::new(0),
            capacity_rejections: AtomicU64::new(0),
            events_published: AtomicU64::new(0),
            events_delivered: AtomicU64::new(0),
            events_dropped: AtomicU64::new(0),
            slow_consumer_evictions: AtomicU64::new(0),
            poll_cycles: AtomicU64::new(0),
            partition_fetch_failures: AtomicU64::new(0),
            delivery_latency_micros_total: AtomicU64::new(0),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn record_connection_opened(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connection_closed(&self) {
        self.connections_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_capacity_rejection(&self) {
        self.capacity_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_published(&self) {
        self.events_published.fetch_add(1, Ordering::Relaxed);
    }

    /// One envelope written to one connection, with the time it spent between
    /// composition and write.
    pub fn record_delivered(&self, latency_micros: u64) {
        self.events_delivered.fetch_add(1, Ordering::Relaxed);
        self.delivery_latency_micros_total
            .fetch_add(latency_micros, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.events_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_slow_consumer_eviction(&self) {
        self.slow_consumer_evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_poll_cycle(&self) {
        self.poll_cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_partition_fetch_failure(&self) {
        self.partition_fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn events_delivered(&self) -> u64 {
        self.events_delivered.load(Ordering::Relaxed)
    }

    pub fn slow_consumer_evictions(&self) -> u64 {
        self.slow_consumer_evictions.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self, active_connections: usize) -> MetricsSnapshot {
        let delivered = self.events_delivered.load(Ordering::Relaxed);
        let latency_total = self.delivery_latency_micros_total.load(Ordering::Relaxed);
        let avg_delivery_latency_ms = if delivered > 0 {
            (latency_total as f64 / delivered as f64) / 1000.0
        } else {
            0.0
        };

        MetricsSnapshot {
            uptime_seconds: self.uptime_seconds(),
            active_connections,
            connections_opened: self.connections_opened.load(Ordering::Relaxed),
            connections_closed: self.connections_closed.load(Ordering::Relaxed),
            capacity_rejections: self.capacity_rejections.load(Ordering::Relaxed),
            events_published: self.events_published.load(Ordering::Relaxed),
            events_delivered: delivered,
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            slow_consumer_evictions: self.slow_consumer_evictions.load(Ordering::Relaxed),
            poll_cycles: self.poll_cycles.load(Ordering::Relaxed),
            partition_fetch_failures: self.partition_fetch_failures.load(Ordering::Relaxed),
            avg_delivery_latency_ms,
        }
    }
}

impl Default for StreamMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of the counters, serialized into the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_seconds: u64,
    pub active_connections: usize,
    pub connections_opened: u64,
    pub connections_closed: u64,
    pub capacity_rejections: u64,
    pub events_published: u64,
    pub events_delivered: u64,
    pub events_dropped: u64,
    pub slow_consumer_evictions: u64,
    pub poll_cycles: u64,
    pub partition_fetch_failures: u64,
    pub avg_delivery_latency_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = StreamMetrics::new();
        metrics.record_connection_opened();
        metrics.record_connection_opened();
        metrics.record_connection_closed();
        metrics.record_published();
        metrics.record_delivered(2_000);
        metrics.record_delivered(4_000);

        let snap = metrics.snapshot(1);
        assert_eq!(snap.connections_opened, 2);
        assert_eq!(snap.connections_closed, 1);
        assert_eq!(snap.events_published, 1);
        assert_eq!(snap.events_delivered, 2);
        assert!((snap.avg_delivery_latency_ms - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_snapshot_with_no_deliveries_has_zero_latency() {
        let metrics = StreamMetrics::new();
        assert_eq!(metrics.snapshot(0).avg_delivery_latency_ms, 0.0);
    }
}
