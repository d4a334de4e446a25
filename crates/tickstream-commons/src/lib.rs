//! # tickstream-commons
//!
//! Shared building blocks used across the tickstream workspace:
//! - Type-safe identifier newtypes (`SymbolId`, `WatchlistId`, `UserId`, ...)
//! - The wire-level event model (`EventEnvelope`, `StreamEvent`)
//! - The event-stream text framing codec (`sse`)
//!
//! This crate is dependency-light by design so every other crate can use it.

pub mod event;
pub mod ids;
pub mod sse;

pub use event::{EventEnvelope, QuotePoint, StreamEvent};
pub use ids::{ConnectionId, EventId, SymbolId, UserId, WatchlistId};
