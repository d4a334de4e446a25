//! Shared event bus.
//!
//! Producer side is append/broadcast-only; consumers filter on their own
//! subscription handle so the poller and composer stay oblivious to
//! per-connection concerns. A small ring of recent envelopes backs the
//! best-effort resume window for reconnecting clients.

use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::Arc;
use tickstream_commons::{EventEnvelope, EventId};
use tokio::sync::broadcast;

/// Capacity of the broadcast channel; a lagging subscriber skips, it never
/// stalls the publisher.
const BROADCAST_CAPACITY: usize = 256;

pub struct EventBus {
    sender: broadcast::Sender<Arc<EventEnvelope>>,
    recent: RwLock<VecDeque<Arc<EventEnvelope>>>,
    resume_depth: usize,
}

impl EventBus {
    /// `resume_depth` bounds the in-memory resume window; it matches the
    /// per-connection outbound buffer depth and is not tunable beyond that.
    pub fn new(resume_depth: usize) -> Arc<Self> {
        let (sender, _) = broadcast::channel(BROADCAST_CAPACITY);
        Arc::new(Self {
            sender,
            recent: RwLock::new(VecDeque::with_capacity(resume_depth)),
            resume_depth,
        })
    }

    /// Publish one envelope to every subscriber and remember it in the
    /// resume ring. Never blocks; having zero subscribers is not an error.
    pub fn publish(&self, envelope: EventEnvelope) -> Arc<EventEnvelope> {
        let envelope = Arc::new(envelope);

        {
            let mut recent = self.recent.write();
            if recent.len() == self.resume_depth {
                recent.pop_front();
            }
            recent.push_back(Arc::clone(&envelope));
        }

        // Err means no live subscribers; the ring still advanced.
        let _ = self.sender.send(Arc::clone(&envelope));
        envelope
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<EventEnvelope>> {
        self.sender.subscribe()
    }

    /// Envelopes published after `last_id`, if `last_id` is still inside the
    /// resume window. None means the window was missed and the client must
    /// treat the connection as a fresh admission.
    pub fn replay_after(&self, last_id: EventId) -> Option<Vec<Arc<EventEnvelope>>> {
        let recent = self.recent.read();
        let position = recent.iter().position(|e| e.id == last_id)?;
        Some(recent.iter().skip(position + 1).cloned().collect())
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickstream_commons::{QuotePoint, StreamEvent, SymbolId};

    fn delta(id: u64, symbol: &str) -> EventEnvelope {
        EventEnvelope {
            id: EventId::new(id),
            event: StreamEvent::DeltaUpdate {
                quote: QuotePoint {
                    symbol: SymbolId::new(symbol),
                    price: 1.0,
                    change_pct: 0.0,
                    volume: 0,
                    version: id,
                    updated_at_ms: 0,
                },
            },
            retry_hint_ms: None,
            composed_at_ms: 0,
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_all_subscribers() {
        let bus = EventBus::new(8);
        let mut rx_a = bus.subscribe();
        let mut rx_b = bus.subscribe();

        bus.publish(delta(1, "AAPL"));

        assert_eq!(rx_a.recv().await.unwrap().id, EventId::new(1));
        assert_eq!(rx_b.recv().await.unwrap().id, EventId::new(1));
    }

    #[tokio::test]
    async fn test_publish_with_no_subscribers_is_fine() {
        let bus = EventBus::new(8);
        bus.publish(delta(1, "AAPL"));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_replay_after_within_window() {
        let bus = EventBus::new(4);
        for id in 1..=4 {
            bus.publish(delta(id, "AAPL"));
        }

        let replayed = bus.replay_after(EventId::new(2)).unwrap();
        let ids: Vec<u64> = replayed.iter().map(|e| e.id.as_u64()).collect();
        assert_eq!(ids, vec![3, 4]);
    }

    #[test]
    fn test_replay_after_missed_window() {
        let bus = EventBus::new(2);
        for id in 1..=4 {
            bus.publish(delta(id, "AAPL"));
        }

        // Ids 1 and 2 have been evicted from the ring
        assert!(bus.replay_after(EventId::new(1)).is_none());
        // The newest id replays to an empty continuation
        assert_eq!(bus.replay_after(EventId::new(4)).unwrap().len(), 0);
    }
}
