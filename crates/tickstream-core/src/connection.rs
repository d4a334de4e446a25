//! Connection state and lifecycle.
//!
//! A `Connection` is owned exclusively by its dispatcher; the only operation
//! other components may ask of it is whether an envelope passes its filter,
//! which is exposed through the cheap-to-clone [`ConnectionFilter`].

use chrono::{DateTime, Utc};
use log::{debug, info};
use std::collections::BTreeSet;
use tickstream_commons::{ConnectionId, EventEnvelope, EventId, SymbolId, UserId, WatchlistId};

/// Who a connection is and what it may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionScope {
    /// Unauthenticated, unfiltered: every partition.
    Global,
    /// Authenticated and filtered to one watchlist's symbol set.
    Bound {
        owner: UserId,
        watchlist: WatchlistId,
    },
}

/// Lifecycle states. Transitions only move forward; any failure is terminal
/// and the client must reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Requested,
    Authenticating,
    Admitted,
    Streaming,
    Closed(CloseReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Transport-level close or write failure initiated by the client side.
    ClientClosed,
    /// A write to the transport failed server-side.
    WriteFailed,
    /// Backpressure grace period exceeded; forcibly disconnected.
    SlowConsumer,
    /// Process shutdown or capacity reclaim.
    Shutdown,
}

/// The filter decision, detached from the connection so dispatcher subtasks
/// can evaluate it without sharing the connection itself.
#[derive(Debug, Clone)]
pub struct ConnectionFilter {
    global: bool,
    keys: BTreeSet<SymbolId>,
}

impl ConnectionFilter {
    /// Global connections accept everything; bound connections accept all
    /// heartbeats plus deltas whose partition key is in their set.
    pub fn accepts(&self, envelope: &EventEnvelope) -> bool {
        if self.global {
            return true;
        }
        match envelope.event.partition_key() {
            None => true,
            Some(symbol) => self.keys.contains(symbol),
        }
    }
}

#[derive(Debug)]
pub struct Connection {
    pub id: ConnectionId,
    scope: ConnectionScope,
    filter_keys: BTreeSet<SymbolId>,
    pub last_event_id: Option<EventId>,
    pub connected_at: DateTime<Utc>,
    phase: ConnectionPhase,
}

impl Connection {
    /// Start the lifecycle for an incoming request.
    pub fn request(scope: ConnectionScope, filter_keys: impl IntoIterator<Item = SymbolId>) -> Self {
        Self {
            id: ConnectionId::new(uuid::Uuid::new_v4().to_string()),
            scope,
            filter_keys: filter_keys.into_iter().collect(),
            last_event_id: None,
            connected_at: Utc::now(),
            phase: ConnectionPhase::Requested,
        }
    }

    pub fn scope(&self) -> &ConnectionScope {
        &self.scope
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    pub fn filter(&self) -> ConnectionFilter {
        ConnectionFilter {
            global: matches!(self.scope, ConnectionScope::Global),
            keys: self.filter_keys.clone(),
        }
    }

    pub fn begin_authentication(&mut self) {
        debug_assert_eq!(self.phase, ConnectionPhase::Requested);
        self.phase = ConnectionPhase::Authenticating;
        debug!("Connection {} authenticating", self.id);
    }

    pub fn mark_admitted(&mut self) {
        debug_assert!(matches!(
            self.phase,
            ConnectionPhase::Requested | ConnectionPhase::Authenticating
        ));
        self.phase = ConnectionPhase::Admitted;
        info!(
            "Connection {} admitted (scope={})",
            self.id,
            match &self.scope {
                ConnectionScope::Global => "global".to_string(),
                ConnectionScope::Bound { watchlist, .. } => format!("bound:{}", watchlist),
            }
        );
    }

    pub fn mark_streaming(&mut self) {
        debug_assert_eq!(self.phase, ConnectionPhase::Admitted);
        self.phase = ConnectionPhase::Streaming;
        debug!("Connection {} streaming", self.id);
    }

    /// Terminal transition. The caller releases the registry slot; the two
    /// always happen together in the dispatcher's single teardown path.
    pub fn close(&mut self, reason: CloseReason) {
        if matches!(self.phase, ConnectionPhase::Closed(_)) {
            return;
        }
        self.phase = ConnectionPhase::Closed(reason);
        info!("Connection {} closed ({:?})", self.id, reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickstream_commons::{QuotePoint, StreamEvent};

    fn delta_envelope(symbol: &str) -> EventEnvelope {
        EventEnvelope {
            id: EventId::new(1),
            event: StreamEvent::DeltaUpdate {
                quote: QuotePoint {
                    symbol: SymbolId::new(symbol),
                    price: 1.0,
                    change_pct: 0.0,
                    volume: 0,
                    version: 1,
                    updated_at_ms: 0,
                },
            },
            retry_hint_ms: None,
            composed_at_ms: 0,
        }
    }

    fn heartbeat_envelope() -> EventEnvelope {
        EventEnvelope {
            id: EventId::new(2),
            event: StreamEvent::Heartbeat {
                active_connections: 1,
                uptime_seconds: 5,
            },
            retry_hint_ms: None,
            composed_at_ms: 0,
        }
    }

    #[test]
    fn test_global_filter_accepts_everything() {
        let conn = Connection::request(ConnectionScope::Global, []);
        let filter = conn.filter();
        assert!(filter.accepts(&delta_envelope("AAPL")));
        assert!(filter.accepts(&delta_envelope("MSFT")));
        assert!(filter.accepts(&heartbeat_envelope()));
    }

    #[test]
    fn test_bound_filter_scopes_deltas_and_passes_heartbeats() {
        let conn = Connection::request(
            ConnectionScope::Bound {
                owner: UserId::new("user-1"),
                watchlist: WatchlistId::new("wl-1"),
            },
            [SymbolId::new("AAPL")],
        );
        let filter = conn.filter();
        assert!(filter.accepts(&delta_envelope("AAPL")));
        assert!(!filter.accepts(&delta_envelope("MSFT")));
        assert!(filter.accepts(&heartbeat_envelope()));
    }

    #[test]
    fn test_lifecycle_transitions() {
        let mut conn = Connection::request(ConnectionScope::Global, []);
        assert_eq!(conn.phase(), ConnectionPhase::Requested);
        conn.mark_admitted();
        conn.mark_streaming();
        assert_eq!(conn.phase(), ConnectionPhase::Streaming);
        conn.close(CloseReason::ClientClosed);
        assert_eq!(conn.phase(), ConnectionPhase::Closed(CloseReason::ClientClosed));

        // A second close keeps the first reason
        conn.close(CloseReason::Shutdown);
        assert_eq!(conn.phase(), ConnectionPhase::Closed(CloseReason::ClientClosed));
    }
}
