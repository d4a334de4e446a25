//! Connection slot accounting.
//!
//! The registry is the single owner of the active-connection counter. Every
//! other component goes through `reserve`/`release`; nothing else reads or
//! writes the count. Reserve never blocks: at capacity it fails immediately
//! so the HTTP layer can answer with a capacity error instead of a hang.

use crate::error::CoreError;
use log::{debug, warn};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

struct RegistryState {
    /// Active slot count. A Mutex rather than a bare atomic: the capacity
    /// check and the increment must be one step.
    active: Mutex<usize>,
    max_connections: usize,
    is_shutting_down: AtomicBool,
}

impl RegistryState {
    fn release_slot(&self) {
        let mut active = self.active.lock();
        *active = active.saturating_sub(1);
    }
}

pub struct ConnectionRegistry {
    state: Arc<RegistryState>,
}

impl ConnectionRegistry {
    pub fn new(max_connections: usize) -> Arc<Self> {
        Arc::new(Self {
            state: Arc::new(RegistryState {
                active: Mutex::new(0),
                max_connections,
                is_shutting_down: AtomicBool::new(false),
            }),
        })
    }

    /// Reserve one slot. Fails immediately with `CapacityExceeded` at the
    /// ceiling and with `ShuttingDown` once shutdown has begun.
    pub fn reserve(&self) -> Result<SlotToken, CoreError> {
        if self.state.is_shutting_down.load(Ordering::Acquire) {
            return Err(CoreError::ShuttingDown);
        }

        let mut active = self.state.active.lock();
        if *active >= self.state.max_connections {
            warn!(
                "Rejecting connection: max connections ({}) reached",
                self.state.max_connections
            );
            return Err(CoreError::CapacityExceeded {
                active: *active,
                max: self.state.max_connections,
            });
        }
        *active += 1;
        drop(active);

        Ok(SlotToken {
            state: Arc::clone(&self.state),
            released: AtomicBool::new(false),
        })
    }

    pub fn active_connections(&self) -> usize {
        *self.state.active.lock()
    }

    pub fn max_connections(&self) -> usize {
        self.state.max_connections
    }

    /// Stop admitting new connections; existing ones drain on their own.
    pub fn begin_shutdown(&self) {
        self.state.is_shutting_down.store(true, Ordering::Release);
        debug!("ConnectionRegistry no longer admitting connections");
    }

    pub fn is_shutting_down(&self) -> bool {
        self.state.is_shutting_down.load(Ordering::Acquire)
    }
}

/// Proof of one reserved slot. Release is idempotent, and dropping the token
/// releases too, so every dispatcher exit path converges on exactly one
/// decrement.
pub struct SlotToken {
    state: Arc<RegistryState>,
    released: AtomicBool,
}

impl SlotToken {
    pub fn release(&self) {
        if !self.released.swap(true, Ordering::AcqRel) {
            self.state.release_slot();
        }
    }
}

impl Drop for SlotToken {
    fn drop(&mut self) {
        self.release();
    }
}
