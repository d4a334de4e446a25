// Error types module
use thiserror::Error;
use tickstream_commons::SymbolId;

/// Main error type for the streaming core.
///
/// Admission-time variants are the only ones a client ever sees as an HTTP
/// status; in-stream failures surface only as stream termination.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Capacity exceeded: {active} of {max} connection slots in use")]
    CapacityExceeded { active: usize, max: usize },

    #[error("Partition fetch failed for {symbol}: {reason}")]
    PartitionFetch { symbol: SymbolId, reason: String },

    #[error("Slow consumer: {0}")]
    SlowConsumer(String),

    #[error("Transport write failed: {0}")]
    TransportWrite(String),

    #[error("Server is shutting down")]
    ShuttingDown,

    #[error("{0}")]
    Other(String),
}
