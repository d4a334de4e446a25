//! Ownership lookup for bound streams.
//!
//! Watchlist CRUD lives in the surrounding system; the streaming core only
//! needs "does this watchlist exist, who owns it, and which symbols does it
//! track right now".

use crate::error::CoreError;
use async_trait::async_trait;
use dashmap::DashMap;
use tickstream_commons::{SymbolId, UserId, WatchlistId};

/// The target resource of a bound stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Watchlist {
    pub id: WatchlistId,
    pub owner: UserId,
    pub symbols: Vec<SymbolId>,
}

/// External collaborator that owns watchlist authorization data.
#[async_trait]
pub trait WatchlistProvider: Send + Sync {
    async fn get(&self, id: &WatchlistId) -> Result<Option<Watchlist>, CoreError>;
}

/// In-memory provider for the default wiring and tests.
#[derive(Default)]
pub struct MemoryWatchlistProvider {
    watchlists: DashMap<WatchlistId, Watchlist>,
}

impl MemoryWatchlistProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, watchlist: Watchlist) {
        self.watchlists.insert(watchlist.id.clone(), watchlist);
    }
}

#[async_trait]
impl WatchlistProvider for MemoryWatchlistProvider {
    async fn get(&self, id: &WatchlistId) -> Result<Option<Watchlist>, CoreError> {
        Ok(self.watchlists.get(id).map(|w| w.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_provider_lookup() {
        let provider = MemoryWatchlistProvider::new();
        provider.insert(Watchlist {
            id: WatchlistId::new("wl-1"),
            owner: UserId::new("user-1"),
            symbols: vec![SymbolId::new("AAPL")],
        });

        let found = provider.get(&WatchlistId::new("wl-1")).await.unwrap();
        assert_eq!(found.unwrap().owner, UserId::new("user-1"));
        assert!(provider.get(&WatchlistId::new("missing")).await.unwrap().is_none());
    }
}
