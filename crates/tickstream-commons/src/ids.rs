//! Type-safe wrappers for tickstream identifiers.
//!
//! Using newtypes keeps a symbol from being accidentally passed where a
//! watchlist id or user id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier from a string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes the wrapper and returns the inner String.
            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// A tracked market symbol, e.g. `"AAPL"`. One symbol is one poll partition.
    SymbolId
);

string_id!(
    /// A user-owned watchlist; the target resource of a bound stream.
    WatchlistId
);

string_id!(
    /// An authenticated user identity, consumed from a verified claim.
    UserId
);

string_id!(
    /// A streaming connection, generated at admission time.
    ConnectionId
);

/// Identifier of one event envelope.
///
/// Ids are drawn from a per-process monotonic sequence and rendered
/// zero-padded so that lexicographic order on the wire equals numeric order.
/// Comparison is only meaningful within one process instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct EventId(u64);

impl EventId {
    const WIDTH: usize = 20;

    pub fn new(seq: u64) -> Self {
        Self(seq)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Parses the zero-padded wire form. Returns None for anything that is
    /// not an id this process could have produced.
    pub fn parse(s: &str) -> Option<Self> {
        if s.len() != Self::WIDTH || !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        s.parse::<u64>().ok().map(Self)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$}", self.0, width = Self::WIDTH)
    }
}

impl From<EventId> for String {
    fn from(id: EventId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for EventId {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        EventId::parse(&s).ok_or_else(|| format!("invalid event id: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_id_roundtrip() {
        let id = SymbolId::new("AAPL");
        assert_eq!(id.as_str(), "AAPL");
        assert_eq!(id.to_string(), "AAPL");
        assert_eq!(SymbolId::from("AAPL"), id);
    }

    #[test]
    fn test_event_id_string_order_matches_numeric_order() {
        let a = EventId::new(9);
        let b = EventId::new(10);
        let c = EventId::new(11);
        assert!(a.to_string() < b.to_string());
        assert!(b.to_string() < c.to_string());
    }

    #[test]
    fn test_event_id_parse_roundtrip() {
        let id = EventId::new(42);
        let wire = id.to_string();
        assert_eq!(EventId::parse(&wire), Some(id));
    }

    #[test]
    fn test_event_id_parse_rejects_foreign_ids() {
        assert_eq!(EventId::parse("42"), None);
        assert_eq!(EventId::parse(""), None);
        assert_eq!(EventId::parse("not-an-id-0000000042"), None);
    }
}
