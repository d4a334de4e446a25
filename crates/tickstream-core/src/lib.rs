//! # tickstream-core
//!
//! The streaming core: everything between "a request was admitted" and
//! "frames were written to the client".
//!
//! # Architecture
//!
//! ```text
//! QuoteStore (poll read contract)
//!         ↓
//!   ChangeDetector (fixed interval, per-symbol cursors)
//!         ↓
//!   EventComposer (monotonic ids)
//!         ↓
//!   EventBus (broadcast + resume ring)
//!         ↓
//!   Dispatcher tasks (one per connection: filter, buffer, heartbeat, write)
//!         ↓
//!   Outbound transport (event-stream frames)
//! ```
//!
//! Admission is guarded by [`admission::AdmissionGate`] and the slot-bounded
//! [`registry::ConnectionRegistry`]. Failures local to one connection or one
//! partition never cross those boundaries.

pub mod admission;
pub mod bus;
pub mod composer;
pub mod connection;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod outbound;
pub mod poller;
pub mod quotes;
pub mod registry;
pub mod watchlists;

pub use admission::{AdmissionGate, AdmittedConnection};
pub use bus::EventBus;
pub use composer::EventComposer;
pub use connection::{CloseReason, Connection, ConnectionFilter, ConnectionPhase, ConnectionScope};
pub use context::{StreamContext, StreamRuntimeSettings};
pub use dispatcher::spawn_dispatcher;
pub use error::CoreError;
pub use poller::ChangeDetector;
pub use quotes::{MemoryQuoteStore, PollCursor, QuoteStore};
pub use registry::{ConnectionRegistry, SlotToken};
pub use watchlists::{MemoryWatchlistProvider, Watchlist, WatchlistProvider};
