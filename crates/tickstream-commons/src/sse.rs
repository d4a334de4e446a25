//! Event-stream text framing.
//!
//! Encodes envelopes into the standard `event:` / `id:` / `retry:` / `data:`
//! line format, frames separated by a blank line. The encoder is pure so the
//! transport layer can stream frames without touching the event model.

use crate::event::{EventEnvelope, StreamEvent};
use crate::ids::EventId;

/// Encode one envelope as a complete wire frame.
///
/// The `data:` line carries the JSON payload including the `type` tag, so a
/// client that ignores the `event:` line can still dispatch on the body.
pub fn encode_frame(envelope: &EventEnvelope) -> String {
    let data = serde_json::to_string(&envelope.event)
        .unwrap_or_else(|_| "{}".to_string());

    let mut frame = String::with_capacity(data.len() + 64);
    frame.push_str("event: ");
    frame.push_str(envelope.event.event_name());
    frame.push('\n');
    frame.push_str("id: ");
    frame.push_str(&envelope.id.to_string());
    frame.push('\n');
    if let Some(retry) = envelope.retry_hint_ms {
        frame.push_str("retry: ");
        frame.push_str(&retry.to_string());
        frame.push('\n');
    }
    frame.push_str("data: ");
    frame.push_str(&data);
    frame.push_str("\n\n");
    frame
}

/// Comment frame used as a keep-alive filler between events.
pub fn keep_alive_frame() -> &'static str {
    ": keep-alive\n\n"
}

/// A decoded frame, used by tests and by client-side tooling.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFrame {
    pub event_name: String,
    pub id: Option<EventId>,
    pub retry_ms: Option<u64>,
    pub event: StreamEvent,
}

/// Decode a single frame produced by [`encode_frame`].
///
/// Returns None for comment frames and anything that does not parse as one
/// complete event frame.
pub fn decode_frame(frame: &str) -> Option<DecodedFrame> {
    let mut event_name = None;
    let mut id = None;
    let mut retry_ms = None;
    let mut data = None;

    for line in frame.lines() {
        if line.starts_with(':') || line.is_empty() {
            continue;
        }
        let (field, value) = line.split_once(':')?;
        let value = value.strip_prefix(' ').unwrap_or(value);
        match field {
            "event" => event_name = Some(value.to_string()),
            "id" => id = EventId::parse(value),
            "retry" => retry_ms = value.parse().ok(),
            "data" => data = Some(value.to_string()),
            _ => {}
        }
    }

    let event: StreamEvent = serde_json::from_str(&data?).ok()?;
    Some(DecodedFrame {
        event_name: event_name?,
        id,
        retry_ms,
        event,
    })
}
