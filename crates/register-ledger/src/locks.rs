//! Per-register commit ordering.
//!
//! Commits and their notifications for one register run under that
//! register's lock, so subscribers see events in commit order. Registers
//! never contend with each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;

use register_ledger_core::RegisterId;

/// One async lock per register, created on first use.
#[derive(Debug, Default)]
pub struct CommitLocks {
    locks: Mutex<HashMap<RegisterId, Arc<AsyncMutex<()>>>>,
}

impl CommitLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the register's commit lock.
    pub async fn acquire(&self, id: &RegisterId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(*id).or_default())
        };
        lock.lock_owned().await
    }

    /// Like [`CommitLocks::acquire`], but gives up with `None` once `cancel` fires.
    pub async fn acquire_or_cancel(
        &self,
        id: &RegisterId,
        cancel: &CancellationToken,
    ) -> Option<OwnedMutexGuard<()>> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            guard = self.acquire(id) => Some(guard),
        }
    }

    /// Drop the lock of a deleted register.
    pub fn remove(&self, id: &RegisterId) {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
    }

    /// Number of registers with a lock allocated.
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
