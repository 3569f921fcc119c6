//! Register-existence cache in front of any store.
//!
//! Every transaction write starts with a register lookup. `RegisterCache`
//! remembers which register ids are known so that lookup stays local. The
//! cache is private to the adapter and is invalidated by the adapter's own
//! register inserts and deletes.
//!
//! Deletes bump a generation counter before and after the backing delete. A
//! lookup only caches its answer if no delete started while it was reading
//! the backing store, so a read racing a delete cannot resurrect the id.

use std::collections::HashSet;
use std::sync::RwLock;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use register_ledger_core::{Docket, Register, RegisterId, RegisterStatus, Transaction, TxId};

use crate::error::Result;
use crate::query::TransactionQuery;
use crate::traits::{ensure_active, InsertOutcome, LedgerStore};

/// A [`LedgerStore`] adapter that caches known register ids.
pub struct RegisterCache<S> {
    inner: S,
    known: RwLock<Known>,
}

#[derive(Default)]
struct Known {
    ids: HashSet<RegisterId>,
    generation: u64,
}

impl<S: LedgerStore> RegisterCache<S> {
    /// Wrap a store with an empty cache.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            known: RwLock::new(Known::default()),
        }
    }

    /// Get the wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Number of register ids currently cached.
    pub fn cached_len(&self) -> usize {
        self.known.read().map(|k| k.ids.len()).unwrap_or(0)
    }

    fn is_known(&self, id: &RegisterId) -> bool {
        self.known.read().map(|k| k.ids.contains(id)).unwrap_or(false)
    }

    // A poisoned cache is treated as cold: lookups fall through to the store
    // and nothing is remembered.
    fn generation(&self) -> Option<u64> {
        self.known.read().ok().map(|k| k.generation)
    }

    fn remember(&self, id: RegisterId) {
        if let Ok(mut known) = self.known.write() {
            known.ids.insert(id);
        }
    }

    /// Remember `id` unless a delete has started since `seen` was read.
    fn remember_since(&self, id: RegisterId, seen: Option<u64>) {
        if let Ok(mut known) = self.known.write() {
            if Some(known.generation) == seen {
                known.ids.insert(id);
            }
        }
    }

    fn forget(&self, id: &RegisterId) {
        if let Ok(mut known) = self.known.write() {
            known.generation += 1;
            known.ids.remove(id);
        }
    }
}

#[async_trait]
impl<S: LedgerStore> LedgerStore for RegisterCache<S> {
    async fn get_register(
        &self,
        id: &RegisterId,
        cancel: &CancellationToken,
    ) -> Result<Option<Register>> {
        let seen = self.generation();
        let register = self.inner.get_register(id, cancel).await?;
        match &register {
            Some(_) => self.remember_since(*id, seen),
            None => self.forget(id),
        }
        Ok(register)
    }

    async fn has_register(&self, id: &RegisterId, cancel: &CancellationToken) -> Result<bool> {
        ensure_active(cancel)?;
        if self.is_known(id) {
            return Ok(true);
        }
        let seen = self.generation();
        let exists = self.inner.has_register(id, cancel).await?;
        if exists {
            self.remember_since(*id, seen);
        }
        Ok(exists)
    }

    async fn list_registers(
        &self,
        tenant_id: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Register>> {
        self.inner.list_registers(tenant_id, cancel).await
    }

    async fn insert_register(
        &self,
        register: &Register,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.inner.insert_register(register, limit, cancel).await?;
        self.remember(register.id);
        Ok(())
    }

    async fn update_register_status(
        &self,
        id: &RegisterId,
        status: RegisterStatus,
        cancel: &CancellationToken,
    ) -> Result<Register> {
        self.inner.update_register_status(id, status, cancel).await
    }

    async fn delete_register(&self, id: &RegisterId, cancel: &CancellationToken) -> Result<()> {
        self.forget(id);
        let deleted = self.inner.delete_register(id, cancel).await;
        self.forget(id);
        deleted
    }

    async fn get_transaction(
        &self,
        register_id: &RegisterId,
        tx_id: &TxId,
        cancel: &CancellationToken,
    ) -> Result<Option<Transaction>> {
        self.inner.get_transaction(register_id, tx_id, cancel).await
    }

    async fn has_transaction(
        &self,
        register_id: &RegisterId,
        tx_id: &TxId,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        self.inner.has_transaction(register_id, tx_id, cancel).await
    }

    async fn insert_transaction(
        &self,
        tx: &Transaction,
        cancel: &CancellationToken,
    ) -> Result<InsertOutcome> {
        self.inner.insert_transaction(tx, cancel).await
    }

    async fn query_transactions(
        &self,
        register_id: &RegisterId,
        query: &TransactionQuery,
        cancel: &CancellationToken,
    ) -> Result<Vec<Transaction>> {
        self.inner.query_transactions(register_id, query, cancel).await
    }

    async fn count_transactions(
        &self,
        register_id: &RegisterId,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        self.inner.count_transactions(register_id, cancel).await
    }

    async fn get_docket(
        &self,
        register_id: &RegisterId,
        id: u64,
        cancel: &CancellationToken,
    ) -> Result<Option<Docket>> {
        self.inner.get_docket(register_id, id, cancel).await
    }

    async fn list_dockets(
        &self,
        register_id: &RegisterId,
        cancel: &CancellationToken,
    ) -> Result<Vec<Docket>> {
        self.inner.list_dockets(register_id, cancel).await
    }

    async fn latest_docket(
        &self,
        register_id: &RegisterId,
        cancel: &CancellationToken,
    ) -> Result<Option<Docket>> {
        self.inner.latest_docket(register_id, cancel).await
    }

    async fn seal_docket_atomic(
        &self,
        register_id: &RegisterId,
        docket: &Docket,
        expected_height: u64,
        cancel: &CancellationToken,
    ) -> Result<Docket> {
        self.inner
            .seal_docket_atomic(register_id, docket, expected_height, cancel)
            .await
    }
}
