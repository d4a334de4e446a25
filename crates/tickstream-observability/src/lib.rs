//! # tickstream-observability
//!
//! Counters for the streaming core (connections, throughput, delivery
//! latency) plus a sysinfo-backed runtime snapshot for startup logging and
//! the health endpoint.

pub mod metrics;
pub mod runtime;

pub use metrics::{MetricsSnapshot, StreamMetrics};
pub use runtime::{collect_runtime_metrics, RuntimeMetrics};
