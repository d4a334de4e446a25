//! The poller's read contract against the backing quote store.
//!
//! The detector only ever needs two operations: the set of tracked symbols
//! and "anything newer than this cursor for this symbol". Persistence design
//! beyond that belongs to the store's owner, not to this crate.

use crate::error::CoreError;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tickstream_commons::{QuotePoint, SymbolId};

/// Watermark for one symbol partition. Owned exclusively by the
/// `ChangeDetector`; no other component reads or writes it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollCursor {
    pub last_seen_version: u64,
    pub last_seen_at_ms: i64,
}

impl PollCursor {
    pub fn advance(&mut self, version: u64, at_ms: i64) {
        self.last_seen_version = version;
        self.last_seen_at_ms = at_ms;
    }
}

/// Minimal read contract the change detector needs from the backing store.
#[async_trait]
pub trait QuoteStore: Send + Sync {
    /// Symbols currently tracked; each one is polled as its own partition.
    async fn tracked_symbols(&self) -> Result<Vec<SymbolId>, CoreError>;

    /// The latest quote for `symbol` if it changed past `cursor`, else None.
    async fn fetch_changed(
        &self,
        symbol: &SymbolId,
        cursor: &PollCursor,
    ) -> Result<Option<QuotePoint>, CoreError>;
}

/// In-memory quote store used by the server's default wiring and by tests.
///
/// Writers push quotes with `apply_update`; versions are assigned here so
/// per-symbol versions are strictly increasing.
pub struct MemoryQuoteStore {
    quotes: DashMap<SymbolId, QuotePoint>,
    next_version: AtomicU64,
    /// Symbols whose fetches fail; lets tests exercise partial poll cycles.
    failing: DashMap<SymbolId, ()>,
    fail_all: AtomicBool,
}

impl MemoryQuoteStore {
    pub fn new(symbols: impl IntoIterator<Item = SymbolId>) -> Self {
        let store = Self {
            quotes: DashMap::new(),
            next_version: AtomicU64::new(1),
            failing: DashMap::new(),
            fail_all: AtomicBool::new(false),
        };
        for symbol in symbols {
            store.quotes.insert(
                symbol.clone(),
                QuotePoint {
                    symbol,
                    price: 0.0,
                    change_pct: 0.0,
                    volume: 0,
                    version: 0,
                    updated_at_ms: 0,
                },
            );
        }
        store
    }

    /// Record a new observation for a symbol. Unknown symbols become tracked.
    pub fn apply_update(&self, symbol: &SymbolId, price: f64, change_pct: f64, volume: u64) {
        let version = self.next_version.fetch_add(1, Ordering::Relaxed);
        self.quotes.insert(
            symbol.clone(),
            QuotePoint {
                symbol: symbol.clone(),
                price,
                change_pct,
                volume,
                version,
                updated_at_ms: chrono::Utc::now().timestamp_millis(),
            },
        );
    }

    /// Make fetches for `symbol` fail until cleared.
    pub fn set_failing(&self, symbol: &SymbolId, failing: bool) {
        if failing {
            self.failing.insert(symbol.clone(), ());
        } else {
            self.failing.remove(symbol);
        }
    }

    /// Make every fetch fail; used to exercise whole-cycle error handling.
    pub fn set_fail_all(&self, failing: bool) {
        self.fail_all.store(failing, Ordering::Relaxed);
    }
}

#[async_trait]
impl QuoteStore for MemoryQuoteStore {
    async fn tracked_symbols(&self) -> Result<Vec<SymbolId>, CoreError> {
        if self.fail_all.load(Ordering::Relaxed) {
            return Err(CoreError::Other("quote store unavailable".to_string()));
        }
        let mut symbols: Vec<SymbolId> = self.quotes.iter().map(|e| e.key().clone()).collect();
        symbols.sort();
        Ok(symbols)
    }

    async fn fetch_changed(
        &self,
        symbol: &SymbolId,
        cursor: &PollCursor,
    ) -> Result<Option<QuotePoint>, CoreError> {
        if self.fail_all.load(Ordering::Relaxed) || self.failing.contains_key(symbol) {
            return Err(CoreError::PartitionFetch {
                symbol: symbol.clone(),
                reason: "simulated backend read error".to_string(),
            });
        }

        Ok(self
            .quotes
            .get(symbol)
            .filter(|q| q.version > cursor.last_seen_version)
            .map(|q| q.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_changed_respects_cursor() {
        let symbol = SymbolId::new("AAPL");
        let store = MemoryQuoteStore::new([symbol.clone()]);
        let mut cursor = PollCursor::default();

        // Seeded quote has version 0 and is not a change
        assert!(store.fetch_changed(&symbol, &cursor).await.unwrap().is_none());

        store.apply_update(&symbol, 187.20, 0.4, 1_000);
        let quote = store.fetch_changed(&symbol, &cursor).await.unwrap().unwrap();
        assert_eq!(quote.price, 187.20);

        cursor.advance(quote.version, quote.updated_at_ms);
        assert!(store.fetch_changed(&symbol, &cursor).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failing_symbol_errors_without_affecting_others() {
        let aapl = SymbolId::new("AAPL");
        let msft = SymbolId::new("MSFT");
        let store = MemoryQuoteStore::new([aapl.clone(), msft.clone()]);
        store.set_failing(&aapl, true);
        store.apply_update(&msft, 402.0, 0.1, 500);

        let cursor = PollCursor::default();
        assert!(store.fetch_changed(&aapl, &cursor).await.is_err());
        assert!(store.fetch_changed(&msft, &cursor).await.unwrap().is_some());

        store.set_failing(&aapl, false);
        store.apply_update(&aapl, 188.0, 0.2, 700);
        assert!(store.fetch_changed(&aapl, &cursor).await.unwrap().is_some());
    }
}
