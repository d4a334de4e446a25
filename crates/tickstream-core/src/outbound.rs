//! Per-connection bounded outbound buffer.
//!
//! The buffer is the seam between the shared publish path and one possibly
//! slow client: pushes never block, overflow drops the oldest non-heartbeat
//! envelope first, and a saturation clock drives the slow-consumer eviction.
//! Envelopes are kept in id order so a heartbeat composed while a delta is
//! still in flight cannot reorder the connection's stream.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tickstream_commons::EventEnvelope;
// tokio's Instant so the saturation clock follows the runtime clock
use tokio::sync::Notify;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Queued,
    /// Queued, but an older buffered envelope was dropped to make room.
    QueuedDroppingOldest,
}

struct BufferInner {
    queue: VecDeque<Arc<EventEnvelope>>,
    saturated_since: Option<Instant>,
    dropped: u64,
    closed: bool,
}

pub struct OutboundBuffer {
    inner: Mutex<BufferInner>,
    notify: Notify,
    capacity: usize,
}

impl OutboundBuffer {
    pub fn new(capacity: usize) -> Arc<Self> {
        assert!(capacity > 0, "outbound buffer capacity must be positive");
        Arc::new(Self {
            inner: Mutex::new(BufferInner {
                queue: VecDeque::with_capacity(capacity),
                saturated_since: None,
                dropped: 0,
                closed: false,
            }),
            notify: Notify::new(),
            capacity,
        })
    }

    /// Enqueue without blocking. At capacity the oldest non-heartbeat
    /// envelope is dropped first; a heartbeat is only sacrificed when deltas
    /// fill the entire queue.
    pub fn push(&self, envelope: Arc<EventEnvelope>) -> PushOutcome {
        let mut inner = self.inner.lock();
        if inner.closed {
            return PushOutcome::Queued;
        }

        let mut outcome = PushOutcome::Queued;
        if inner.queue.len() >= self.capacity {
            // Oldest non-heartbeat goes first; a heartbeat is only dropped
            // when deltas fill the whole queue.
            let victim = inner
                .queue
                .iter()
                .position(|e| !e.is_heartbeat())
                .unwrap_or(0);
            let _ = inner.queue.remove(victim);
            inner.dropped += 1;
            outcome = PushOutcome::QueuedDroppingOldest;
            if inner.saturated_since.is_none() {
                inner.saturated_since = Some(Instant::now());
            }
        }

        // Insert keeping id order; out-of-order arrivals only happen in the
        // narrow heartbeat-vs-in-flight-delta window, so scanning from the
        // back terminates immediately in the common case.
        let at = inner
            .queue
            .iter()
            .rposition(|e| e.id < envelope.id)
            .map(|i| i + 1)
            .unwrap_or(0);
        inner.queue.insert(at, envelope);

        drop(inner);
        self.notify.notify_one();
        outcome
    }

    /// Await the next envelope. Returns None once the buffer is closed and
    /// drained.
    pub async fn pop(&self) -> Option<Arc<EventEnvelope>> {
        loop {
            {
                let mut inner = self.inner.lock();
                if let Some(envelope) = inner.queue.pop_front() {
                    if inner.queue.len() < self.capacity {
                        inner.saturated_since = None;
                    }
                    return Some(envelope);
                }
                if inner.closed {
                    return None;
                }
            }
            self.notify.notified().await;
        }
    }

    /// How long the buffer has been continuously saturated, if it is.
    pub fn saturated_for(&self) -> Option<Duration> {
        self.inner.lock().saturated_since.map(|since| since.elapsed())
    }

    /// Stop accepting pushes and wake the consumer; queued envelopes still
    /// drain.
    pub fn close(&self) {
        self.inner.lock().closed = true;
        self.notify.notify_one();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dropped_count(&self) -> u64 {
        self.inner.lock().dropped
    }
}
