//! Per-connection dispatch.
//!
//! Each admitted connection gets two cooperating tasks joined by the bounded
//! [`OutboundBuffer`]:
//!
//! - the consumer half subscribes to the bus, applies the connection filter,
//!   runs the heartbeat timer, and enforces the backpressure grace period;
//! - the writer half owns the `Connection` and the `SlotToken`, encodes
//!   frames, and hands them to the transport channel.
//!
//! The transport channel has capacity one: when the client stalls, the
//! writer stalls, the buffer saturates, and the grace clock decides. All
//! exit paths (client close, write failure, eviction, shutdown) converge
//! on the writer's single teardown, which releases the slot exactly once.

use crate::admission::AdmittedConnection;
use crate::composer::EventComposer;
use crate::connection::{CloseReason, Connection, ConnectionFilter};
use crate::context::StreamContext;
use crate::outbound::{OutboundBuffer, PushOutcome};
use crate::registry::{ConnectionRegistry, SlotToken};
use log::{debug, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tickstream_commons::{sse, ConnectionId, EventEnvelope, EventId};
use tickstream_observability::StreamMetrics;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

/// Encoded frames ready for the HTTP response body.
pub type FrameReceiver = mpsc::Receiver<String>;

/// Wire an admitted connection to the bus and start its dispatcher tasks.
///
/// `resume_from` is the client's `Last-Event-ID`, honored best-effort within
/// the bus resume window; outside it the connection is simply fresh.
pub fn spawn_dispatcher(
    admitted: AdmittedConnection,
    ctx: &StreamContext,
    resume_from: Option<EventId>,
) -> FrameReceiver {
    let AdmittedConnection {
        mut connection,
        slot,
    } = admitted;

    let (frame_tx, frame_rx) = mpsc::channel(1);
    let buffer = OutboundBuffer::new(ctx.settings.outbound_buffer_depth);
    let filter = connection.filter();

    // Subscribe before replaying so nothing published in between is lost; an
    // envelope seen both ways is dropped by the writer's monotonic id guard.
    let bus_rx = ctx.bus.subscribe();

    if let Some(last_id) = resume_from {
        match ctx.bus.replay_after(last_id) {
            Some(replayable) => {
                debug!(
                    "Connection {}: resuming after {} ({} envelopes replayed)",
                    connection.id,
                    last_id,
                    replayable.len()
                );
                for envelope in replayable {
                    if filter.accepts(&envelope) {
                        buffer.push(envelope);
                    }
                }
            }
            None => {
                debug!(
                    "Connection {}: resume id {} outside window, treating as fresh",
                    connection.id, last_id
                );
            }
        }
    }

    connection.mark_streaming();
    ctx.metrics.record_connection_opened();

    let conn_token = ctx.shutdown.child_token();
    let pending_close: Arc<Mutex<Option<CloseReason>>> = Arc::new(Mutex::new(None));

    tokio::spawn(consume_bus(
        bus_rx,
        filter,
        Arc::clone(&buffer),
        Arc::clone(&ctx.composer),
        Arc::clone(&ctx.registry),
        Arc::clone(&ctx.metrics),
        ctx.settings.heartbeat_interval,
        ctx.settings.backpressure_grace,
        conn_token.clone(),
        Arc::clone(&pending_close),
        connection.id.clone(),
    ));

    tokio::spawn(write_frames(
        buffer,
        frame_tx,
        connection,
        slot,
        Arc::clone(&ctx.metrics),
        conn_token,
        pending_close,
    ));

    frame_rx
}

/// Consumer half: bus → filter → buffer, plus the heartbeat timer and the
/// slow-consumer eviction check.
#[allow(clippy::too_many_arguments)]
async fn consume_bus(
    mut bus_rx: broadcast::Receiver<Arc<EventEnvelope>>,
    filter: ConnectionFilter,
    buffer: Arc<OutboundBuffer>,
    composer: Arc<EventComposer>,
    registry: Arc<ConnectionRegistry>,
    metrics: Arc<StreamMetrics>,
    heartbeat_interval: Duration,
    backpressure_grace: Duration,
    conn_token: CancellationToken,
    pending_close: Arc<Mutex<Option<CloseReason>>>,
    connection_id: ConnectionId,
) {
    let mut heartbeat = tokio::time::interval(heartbeat_interval);
    heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // The grace clock only advances between wakeups, so tick at least once
    // per grace window even if the bus is silent.
    let mut grace_check = tokio::time::interval(backpressure_grace / 2);
    grace_check.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = conn_token.cancelled() => break,
            _ = heartbeat.tick() => {
                let envelope = composer.compose_heartbeat(
                    registry.active_connections(),
                    metrics.uptime_seconds(),
                );
                if buffer.push(Arc::new(envelope)) == PushOutcome::QueuedDroppingOldest {
                    metrics.record_dropped();
                }
            }
            _ = grace_check.tick() => {}
            result = bus_rx.recv() => match result {
                Ok(envelope) => {
                    if filter.accepts(&envelope)
                        && buffer.push(envelope) == PushOutcome::QueuedDroppingOldest
                    {
                        metrics.record_dropped();
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(
                        "Connection {}: lagged behind the bus, skipped {} envelopes",
                        connection_id, skipped
                    );
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }

        if let Some(saturated) = buffer.saturated_for() {
            if saturated > backpressure_grace {
                warn!(
                    "Connection {}: buffer saturated for {:?} (grace {:?}), evicting slow consumer",
                    connection_id, saturated, backpressure_grace
                );
                metrics.record_slow_consumer_eviction();
                *pending_close.lock() = Some(CloseReason::SlowConsumer);
                conn_token.cancel();
                break;
            }
        }
    }

    buffer.close();
}

/// Writer half: buffer → encoded frames → transport channel. Owns the
/// connection and the slot; the teardown at the bottom is the only place a
/// dispatcher releases its slot.
async fn write_frames(
    buffer: Arc<OutboundBuffer>,
    frame_tx: mpsc::Sender<String>,
    mut connection: Connection,
    slot: SlotToken,
    metrics: Arc<StreamMetrics>,
    conn_token: CancellationToken,
    pending_close: Arc<Mutex<Option<CloseReason>>>,
) {
    let mut reason: Option<CloseReason> = None;

    'stream: loop {
        let envelope = tokio::select! {
            biased;
            _ = conn_token.cancelled() => break 'stream,
            maybe = buffer.pop() => match maybe {
                Some(envelope) => envelope,
                None => break 'stream,
            },
        };

        // A heartbeat composed while an already-published delta was still in
        // flight can arrive behind it; ids never go backwards on the wire.
        if let Some(last) = connection.last_event_id {
            if envelope.id <= last {
                continue;
            }
        }

        let frame = sse::encode_frame(&envelope);
        tokio::select! {
            biased;
            _ = conn_token.cancelled() => break 'stream,
            sent = frame_tx.send(frame) => {
                if sent.is_err() {
                    // Transport gone: client close and write failure are
                    // handled identically, with no retry of that write.
                    reason = Some(CloseReason::ClientClosed);
                    break 'stream;
                }
                let latency_ms =
                    (chrono::Utc::now().timestamp_millis() - envelope.composed_at_ms).max(0);
                metrics.record_delivered(latency_ms as u64 * 1_000);
                connection.last_event_id = Some(envelope.id);
            }
        }
    }

    let reason = reason
        .or_else(|| pending_close.lock().take())
        .unwrap_or(CloseReason::Shutdown);
    connection.close(reason);
    slot.release();
    metrics.record_connection_closed();
    // Stop the consumer half if it is still running
    conn_token.cancel();
}
