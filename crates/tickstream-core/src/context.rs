//! Shared streaming context.
//!
//! One `StreamContext` is built at bootstrap and handed to the HTTP layer;
//! it aggregates the components every dispatcher needs plus the process-wide
//! shutdown token.

use crate::bus::EventBus;
use crate::composer::EventComposer;
use crate::registry::ConnectionRegistry;
use std::sync::Arc;
use std::time::Duration;
use tickstream_observability::StreamMetrics;
use tokio_util::sync::CancellationToken;

/// Resolved runtime settings for the streaming core. Derived from the config
/// surface once at bootstrap so the core never reads configuration itself.
#[derive(Debug, Clone)]
pub struct StreamRuntimeSettings {
    pub heartbeat_interval: Duration,
    pub poll_interval: Duration,
    pub fetch_timeout: Duration,
    /// Wall-time form of the grace period (cycles × poll interval).
    pub backpressure_grace: Duration,
    pub outbound_buffer_depth: usize,
}

impl Default for StreamRuntimeSettings {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_millis(30_000),
            poll_interval: Duration::from_millis(5_000),
            fetch_timeout: Duration::from_millis(2_000),
            backpressure_grace: Duration::from_millis(15_000),
            outbound_buffer_depth: 16,
        }
    }
}

pub struct StreamContext {
    pub bus: Arc<EventBus>,
    pub composer: Arc<EventComposer>,
    pub registry: Arc<ConnectionRegistry>,
    pub metrics: Arc<StreamMetrics>,
    pub settings: StreamRuntimeSettings,
    pub shutdown: CancellationToken,
}

impl StreamContext {
    pub fn new(
        bus: Arc<EventBus>,
        composer: Arc<EventComposer>,
        registry: Arc<ConnectionRegistry>,
        metrics: Arc<StreamMetrics>,
        settings: StreamRuntimeSettings,
        shutdown: CancellationToken,
    ) -> Arc<Self> {
        Arc::new(Self {
            bus,
            composer,
            registry,
            metrics,
            settings,
            shutdown,
        })
    }
}
