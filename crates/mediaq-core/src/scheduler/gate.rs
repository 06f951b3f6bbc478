//! Concurrency gate shared by all tasks of a scheduler.
//!
//! Each task holds one permit for as long as its operation runs, so the
//! number of active downloads never exceeds `capacity`. Waiters are admitted
//! in whatever order the underlying semaphore wakes them; callers must not
//! rely on FIFO.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Returned by [`ConcurrencyGate::acquire`] once the gate has been closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("concurrency gate closed")]
pub struct GateClosed;

/// Counting admission control with a fixed capacity.
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    capacity: usize,
    permits: Arc<Semaphore>,
}

/// A held gate slot. Dropping it releases the slot.
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyGate {
    /// Create a gate admitting at most `capacity` holders (at least 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            permits: Arc::new(Semaphore::new(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of permits currently held.
    pub fn permits_held(&self) -> usize {
        self.capacity
            .saturating_sub(self.permits.available_permits())
    }

    /// Wait for a free slot. Fails only after [`close`](Self::close).
    pub async fn acquire(&self) -> Result<GatePermit, GateClosed> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| GateClosed)?;
        Ok(GatePermit { _permit: permit })
    }

    /// Refuse all pending and future `acquire` calls. Held permits stay valid.
    pub fn close(&self) {
        self.permits.close();
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }
}
