//! Connection admission.
//!
//! The gate consumes an already-validated identity (it never re-derives
//! one), confirms ownership of the target watchlist for bound requests, and
//! reserves the registry slot. Any failure here is terminal for the request;
//! the client reconnects rather than retrying in place.

use crate::connection::{Connection, ConnectionScope};
use crate::error::CoreError;
use crate::registry::{ConnectionRegistry, SlotToken};
use crate::watchlists::WatchlistProvider;
use log::warn;
use std::sync::Arc;
use tickstream_commons::{UserId, WatchlistId};
use tickstream_observability::StreamMetrics;

/// A connection that holds a reserved slot and is ready for dispatch.
pub struct AdmittedConnection {
    pub connection: Connection,
    pub slot: SlotToken,
}

pub struct AdmissionGate {
    registry: Arc<ConnectionRegistry>,
    watchlists: Arc<dyn WatchlistProvider>,
    metrics: Arc<StreamMetrics>,
}

impl AdmissionGate {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        watchlists: Arc<dyn WatchlistProvider>,
        metrics: Arc<StreamMetrics>,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry,
            watchlists,
            metrics,
        })
    }

    /// Global streams skip identity checks entirely and go straight to the
    /// capacity decision.
    pub fn admit_global(&self) -> Result<AdmittedConnection, CoreError> {
        let mut connection = Connection::request(ConnectionScope::Global, []);
        let slot = self.reserve()?;
        connection.mark_admitted();
        Ok(AdmittedConnection { connection, slot })
    }

    /// Bound streams require a validated claim and confirmed ownership of
    /// the watchlist; the filter is the watchlist's current symbol set.
    pub async fn admit_bound(
        &self,
        identity: Option<&UserId>,
        watchlist_id: &WatchlistId,
    ) -> Result<AdmittedConnection, CoreError> {
        let user = identity.ok_or_else(|| {
            warn!("Bound stream for {} rejected: no identity claim", watchlist_id);
            CoreError::Unauthenticated("Bound streams require a valid identity".to_string())
        })?;

        let watchlist = self
            .watchlists
            .get(watchlist_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Watchlist {} does not exist", watchlist_id)))?;

        if &watchlist.owner != user {
            warn!(
                "Bound stream for {} rejected: not owned by {}",
                watchlist_id, user
            );
            return Err(CoreError::Forbidden(format!(
                "Watchlist {} is not owned by the authenticated user",
                watchlist_id
            )));
        }

        let mut connection = Connection::request(
            ConnectionScope::Bound {
                owner: watchlist.owner,
                watchlist: watchlist.id,
            },
            watchlist.symbols,
        );
        connection.begin_authentication();

        let slot = self.reserve()?;
        connection.mark_admitted();
        Ok(AdmittedConnection { connection, slot })
    }

    fn reserve(&self) -> Result<SlotToken, CoreError> {
        self.registry.reserve().map_err(|e| {
            if matches!(e, CoreError::CapacityExceeded { .. }) {
                self.metrics.record_capacity_rejection();
            }
            e
        })
    }
}
