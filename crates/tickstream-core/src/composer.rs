//! Envelope composition.
//!
//! All ids come from one per-process sequence, so any two envelopes a single
//! connection sees compare correctly as opaque strings. Ids are never reused
//! within a process lifetime; no ordering across instances is implied.

use std::sync::atomic::{AtomicU64, Ordering};
use tickstream_commons::{EventEnvelope, EventId, QuotePoint, StreamEvent};

pub struct EventComposer {
    next_seq: AtomicU64,
    retry_hint_ms: Option<u64>,
}

impl EventComposer {
    pub fn new(retry_hint_ms: Option<u64>) -> Self {
        Self {
            next_seq: AtomicU64::new(1),
            retry_hint_ms,
        }
    }

    fn next_id(&self) -> EventId {
        EventId::new(self.next_seq.fetch_add(1, Ordering::Relaxed))
    }

    /// One detected change becomes one delta envelope.
    pub fn compose_delta(&self, quote: QuotePoint) -> EventEnvelope {
        EventEnvelope {
            id: self.next_id(),
            event: StreamEvent::DeltaUpdate { quote },
            retry_hint_ms: self.retry_hint_ms,
            composed_at_ms: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Heartbeats are composed by dispatchers on their own timers, not from
    /// deltas, so silence in the data never means silence on the wire.
    pub fn compose_heartbeat(
        &self,
        active_connections: usize,
        uptime_seconds: u64,
    ) -> EventEnvelope {
        EventEnvelope {
            id: self.next_id(),
            event: StreamEvent::Heartbeat {
                active_connections,
                uptime_seconds,
            },
            retry_hint_ms: self.retry_hint_ms,
            composed_at_ms: chrono::Utc::now().timestamp_millis(),
        }
    }
}
