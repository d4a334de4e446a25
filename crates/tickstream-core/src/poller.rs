//! Change detection over the polled quote store.
//!
//! One detector task per process, running on a fixed interval regardless of
//! how many connections exist, so a freshly admitted connection benefits from
//! an up-to-date watermark instead of waiting out a full cycle. Cursors are
//! owned here and nowhere else.

use crate::bus::EventBus;
use crate::composer::EventComposer;
use crate::quotes::{PollCursor, QuoteStore};
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tickstream_commons::SymbolId;
use tickstream_observability::StreamMetrics;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct ChangeDetector {
    store: Arc<dyn QuoteStore>,
    bus: Arc<EventBus>,
    composer: Arc<EventComposer>,
    metrics: Arc<StreamMetrics>,
    poll_interval: Duration,
    fetch_timeout: Duration,
    cursors: HashMap<SymbolId, PollCursor>,
    shutdown: CancellationToken,
}

impl ChangeDetector {
    pub fn new(
        store: Arc<dyn QuoteStore>,
        bus: Arc<EventBus>,
        composer: Arc<EventComposer>,
        metrics: Arc<StreamMetrics>,
        poll_interval: Duration,
        fetch_timeout: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            store,
            bus,
            composer,
            metrics,
            poll_interval,
            fetch_timeout,
            cursors: HashMap::new(),
            shutdown,
        }
    }

    /// Run the fixed-interval loop until shutdown.
    pub fn spawn(mut self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let shutdown = self.shutdown.clone();
            let mut interval = tokio::time::interval(self.poll_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => {
                        debug!("Change detector shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        self.poll_cycle().await;
                    }
                }
            }
        })
    }

    /// One poll cycle: every partition is attempted once; a failing or slow
    /// partition is logged and skipped with its cursor untouched, so it is
    /// retried next cycle and never blocks the others.
    pub async fn poll_cycle(&mut self) {
        let symbols = match self.store.tracked_symbols().await {
            Ok(symbols) => symbols,
            Err(e) => {
                warn!("Poll cycle skipped: failed to list tracked symbols: {}", e);
                self.metrics.record_partition_fetch_failure();
                return;
            }
        };

        for symbol in symbols {
            let cursor = self.cursors.get(&symbol).copied().unwrap_or_default();

            let fetched =
                tokio::time::timeout(self.fetch_timeout, self.store.fetch_changed(&symbol, &cursor))
                    .await;

            match fetched {
                Err(_) => {
                    warn!(
                        "Partition {} fetch timed out after {:?}; retrying next cycle",
                        symbol, self.fetch_timeout
                    );
                    self.metrics.record_partition_fetch_failure();
                }
                Ok(Err(e)) => {
                    warn!("Partition {} fetch failed: {}; retrying next cycle", symbol, e);
                    self.metrics.record_partition_fetch_failure();
                }
                Ok(Ok(None)) => {}
                Ok(Ok(Some(quote))) => {
                    let mut advanced = cursor;
                    advanced.advance(quote.version, quote.updated_at_ms);
                    self.cursors.insert(symbol.clone(), advanced);

                    debug!(
                        "Partition {} changed (version {}), publishing delta",
                        symbol, quote.version
                    );
                    let envelope = self.composer.compose_delta(quote);
                    self.bus.publish(envelope);
                    self.metrics.record_published();
                }
            }
        }

        self.metrics.record_poll_cycle();
    }

    /// Cursor inspection for tests.
    #[cfg(test)]
    fn cursor(&self, symbol: &SymbolId) -> Option<PollCursor> {
        self.cursors.get(symbol).copied()
    }
}
