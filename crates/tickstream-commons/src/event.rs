//! Wire-level event model for the streaming surface.
//!
//! `StreamEvent` is a closed tagged enum so consumers filter with an
//! exhaustive match instead of runtime type inspection. New event kinds are
//! added here, not as open subclasses.

use crate::ids::{EventId, SymbolId};
use serde::{Deserialize, Serialize};

/// One observed data point for a symbol, as delivered to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotePoint {
    pub symbol: SymbolId,
    /// Last traded price.
    pub price: f64,
    /// Percent change against the previous close.
    pub change_pct: f64,
    /// Cumulative session volume.
    pub volume: u64,
    /// Store-assigned version, strictly increasing per symbol.
    pub version: u64,
    /// When the store last observed this quote (Unix epoch milliseconds).
    pub updated_at_ms: i64,
}

/// The typed payload of one envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Periodic liveness signal; sent even when the data is silent.
    Heartbeat {
        active_connections: usize,
        uptime_seconds: u64,
    },
    /// A detected change in one symbol partition.
    DeltaUpdate { quote: QuotePoint },
}

impl StreamEvent {
    /// Wire name used on the `event:` line.
    pub fn event_name(&self) -> &'static str {
        match self {
            StreamEvent::Heartbeat { .. } => "heartbeat",
            StreamEvent::DeltaUpdate { .. } => "delta_update",
        }
    }

    pub fn is_heartbeat(&self) -> bool {
        matches!(self, StreamEvent::Heartbeat { .. })
    }

    /// The partition this event belongs to; heartbeats are partition-less.
    pub fn partition_key(&self) -> Option<&SymbolId> {
        match self {
            StreamEvent::Heartbeat { .. } => None,
            StreamEvent::DeltaUpdate { quote } => Some(&quote.symbol),
        }
    }
}

/// One event as published on the bus and written to connections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Per-process strictly increasing identifier.
    pub id: EventId,
    #[serde(flatten)]
    pub event: StreamEvent,
    /// Suggested client reconnect delay, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_hint_ms: Option<u64>,
    /// When the envelope was composed (Unix epoch milliseconds); used for
    /// delivery latency accounting.
    pub composed_at_ms: i64,
}

impl EventEnvelope {
    pub fn is_heartbeat(&self) -> bool {
        self.event.is_heartbeat()
    }
}
