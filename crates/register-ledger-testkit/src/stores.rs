//! A store wrapper that lets tests force races and simulate corruption.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::{Barrier, Notify};
use tokio_util::sync::CancellationToken;

use register_ledger_core::{Docket, Register, RegisterId, RegisterStatus, Transaction, TxId};
use register_ledger_store::{InsertOutcome, LedgerStore, Result, TransactionQuery};

type DocketEdit = Box<dyn Fn(&mut Docket) + Send + Sync>;

/// Delegates to an inner store, with hooks.
///
/// - [`InterceptStore::gate_register_reads`] makes the next `n` calls to
///   `get_register` wait for each other, so concurrent callers all observe
///   the same register head.
/// - [`InterceptStore::tamper_docket`] rewrites a docket whenever it is read.
/// - [`InterceptStore::hide_transaction`] makes a stored transaction
///   unreadable.
/// - [`InterceptStore::hold_next_delete`] parks the next register delete
///   before it reaches the inner store.
///
/// Writes always go to the inner store unchanged.
pub struct InterceptStore<S> {
    inner: S,
    gate: Mutex<Option<Arc<Barrier>>>,
    gate_remaining: AtomicUsize,
    tampered: Mutex<HashMap<u64, DocketEdit>>,
    hidden: Mutex<HashSet<TxId>>,
    delete_hold: Mutex<Option<DeleteHold>>,
}

/// Handle on a parked register delete.
#[derive(Clone, Default)]
pub struct DeleteHold {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

impl DeleteHold {
    /// Wait until the held delete has been called.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Let the held delete proceed to the inner store.
    pub fn release(&self) {
        self.release.notify_one();
    }
}

impl<S: LedgerStore> InterceptStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            gate: Mutex::new(None),
            gate_remaining: AtomicUsize::new(0),
            tampered: Mutex::new(HashMap::new()),
            hidden: Mutex::new(HashSet::new()),
            delete_hold: Mutex::new(None),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Hold the next `n` register reads until all `n` have arrived.
    pub fn gate_register_reads(&self, n: usize) {
        *self.gate.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(Barrier::new(n)));
        self.gate_remaining.store(n, Ordering::SeqCst);
    }

    /// Apply `edit` to docket `id` of any register on every read.
    pub fn tamper_docket(&self, id: u64, edit: impl Fn(&mut Docket) + Send + Sync + 'static) {
        self.tampered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Box::new(edit));
    }

    /// Make a stored transaction read as absent.
    pub fn hide_transaction(&self, tx_id: TxId) {
        self.hidden
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(tx_id);
    }

    /// Park the next `delete_register` until the returned hold is released.
    pub fn hold_next_delete(&self) -> DeleteHold {
        let hold = DeleteHold::default();
        *self
            .delete_hold
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(hold.clone());
        hold
    }

    async fn pass_gate(&self) {
        let took = self
            .gate_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if !took {
            return;
        }
        let barrier = self
            .gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(barrier) = barrier {
            barrier.wait().await;
        }
    }

    fn edit(&self, mut docket: Docket) -> Docket {
        let tampered = self.tampered.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(edit) = tampered.get(&docket.id) {
            edit(&mut docket);
        }
        docket
    }

    fn is_hidden(&self, tx_id: &TxId) -> bool {
        self.hidden
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(tx_id)
    }
}

#[async_trait]
impl<S: LedgerStore> LedgerStore for InterceptStore<S> {
    async fn get_register(
        &self,
        id: &RegisterId,
        cancel: &CancellationToken,
    ) -> Result<Option<Register>> {
        self.pass_gate().await;
        self.inner.get_register(id, cancel).await
    }

    async fn has_register(&self, id: &RegisterId, cancel: &CancellationToken) -> Result<bool> {
        self.inner.has_register(id, cancel).await
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
        self.inner.insert_register(register, limit, cancel).await
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
        let hold = self
            .delete_hold
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(hold) = hold {
            hold.entered.notify_one();
            hold.release.notified().await;
        }
        self.inner.delete_register(id, cancel).await
    }

    async fn get_transaction(
        &self,
        register_id: &RegisterId,
        tx_id: &TxId,
        cancel: &CancellationToken,
    ) -> Result<Option<Transaction>> {
        if self.is_hidden(tx_id) {
            return Ok(None);
        }
        self.inner.get_transaction(register_id, tx_id, cancel).await
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
        let mut found = self
            .inner
            .query_transactions(register_id, query, cancel)
            .await?;
        found.retain(|tx| !self.is_hidden(&tx.tx_id));
        Ok(found)
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
        Ok(self
            .inner
            .get_docket(register_id, id, cancel)
            .await?
            .map(|d| self.edit(d)))
    }

    async fn list_dockets(
        &self,
        register_id: &RegisterId,
        cancel: &CancellationToken,
    ) -> Result<Vec<Docket>> {
        Ok(self
            .inner
            .list_dockets(register_id, cancel)
            .await?
            .into_iter()
            .map(|d| self.edit(d))
            .collect())
    }

    async fn latest_docket(
        &self,
        register_id: &RegisterId,
        cancel: &CancellationToken,
    ) -> Result<Option<Docket>> {
        Ok(self
            .inner
            .latest_docket(register_id, cancel)
            .await?
            .map(|d| self.edit(d)))
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
