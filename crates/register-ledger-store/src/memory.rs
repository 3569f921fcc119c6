//! In-memory implementation of the LedgerStore trait.
//!
//! Every operation runs under a single lock, which makes each one atomic.
//! All data is lost when the store is dropped.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use register_ledger_core::{
    now_millis, Docket, DocketState, Register, RegisterId, RegisterStatus, Transaction, TxId,
    GENESIS_HASH,
};

use crate::error::{Result, StoreError};
use crate::query::TransactionQuery;
use crate::traits::{ensure_active, InsertOutcome, LedgerStore};

/// In-memory store implementation.
///
/// Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    registers: HashMap<RegisterId, RegisterEntry>,
}

/// A register and everything it owns.
struct RegisterEntry {
    register: Register,

    /// Transactions indexed by id.
    transactions: HashMap<TxId, Transaction>,

    /// Commit order of `transactions`.
    order: Vec<TxId>,

    /// Sealed dockets by id.
    dockets: BTreeMap<u64, Docket>,
}

impl RegisterEntry {
    fn new(register: Register) -> Self {
        Self {
            register,
            transactions: HashMap::new(),
            order: Vec::new(),
            dockets: BTreeMap::new(),
        }
    }
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStoreInner {
    fn entry(&self, id: &RegisterId) -> Result<&RegisterEntry> {
        self.registers
            .get(id)
            .ok_or(StoreError::RegisterNotFound(*id))
    }

    fn entry_mut(&mut self, id: &RegisterId) -> Result<&mut RegisterEntry> {
        self.registers
            .get_mut(id)
            .ok_or(StoreError::RegisterNotFound(*id))
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn get_register(
        &self,
        id: &RegisterId,
        cancel: &CancellationToken,
    ) -> Result<Option<Register>> {
        ensure_active(cancel)?;
        let inner = self.read()?;
        Ok(inner.registers.get(id).map(|e| e.register.clone()))
    }

    async fn list_registers(
        &self,
        tenant_id: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Register>> {
        ensure_active(cancel)?;
        let inner = self.read()?;
        let mut registers: Vec<Register> = inner
            .registers
            .values()
            .map(|e| &e.register)
            .filter(|r| tenant_id.map_or(true, |t| r.tenant_id == t))
            .cloned()
            .collect();
        registers.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(registers)
    }

    async fn insert_register(
        &self,
        register: &Register,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let mut inner = self.write()?;
        ensure_active(cancel)?;

        if inner.registers.contains_key(&register.id) {
            return Err(StoreError::AlreadyExists(format!("register {}", register.id)));
        }
        if inner.registers.len() >= limit {
            return Err(StoreError::LimitExceeded { limit });
        }

        inner
            .registers
            .insert(register.id, RegisterEntry::new(register.clone()));
        Ok(())
    }

    async fn update_register_status(
        &self,
        id: &RegisterId,
        status: RegisterStatus,
        cancel: &CancellationToken,
    ) -> Result<Register> {
        let mut inner = self.write()?;
        ensure_active(cancel)?;

        let entry = inner.entry_mut(id)?;
        entry.register.status = status;
        entry.register.updated_at = now_millis();
        Ok(entry.register.clone())
    }

    async fn delete_register(&self, id: &RegisterId, cancel: &CancellationToken) -> Result<()> {
        let mut inner = self.write()?;
        ensure_active(cancel)?;

        let entry = inner
            .registers
            .remove(id)
            .ok_or(StoreError::RegisterNotFound(*id))?;
        debug!(
            register = %id,
            transactions = entry.transactions.len(),
            dockets = entry.dockets.len(),
            "dropped register data"
        );
        Ok(())
    }

    async fn get_transaction(
        &self,
        register_id: &RegisterId,
        tx_id: &TxId,
        cancel: &CancellationToken,
    ) -> Result<Option<Transaction>> {
        ensure_active(cancel)?;
        let inner = self.read()?;
        Ok(inner
            .registers
            .get(register_id)
            .and_then(|e| e.transactions.get(tx_id))
            .cloned())
    }

    async fn insert_transaction(
        &self,
        tx: &Transaction,
        cancel: &CancellationToken,
    ) -> Result<InsertOutcome> {
        let mut inner = self.write()?;
        ensure_active(cancel)?;

        let entry = inner.entry_mut(tx.register_id())?;

        if let Some(existing) = entry.transactions.get(&tx.tx_id) {
            return Ok(InsertOutcome::Existing(existing.clone()));
        }

        if let Some(prev) = &tx.prev_tx_id {
            if !entry.transactions.contains_key(prev) {
                return Err(StoreError::ChainIntegrityViolation(format!(
                    "previous transaction {prev} is not stored in register {}",
                    entry.register.id
                )));
            }
        }

        entry.transactions.insert(tx.tx_id, tx.clone());
        entry.order.push(tx.tx_id);
        Ok(InsertOutcome::Inserted(tx.clone()))
    }

    async fn query_transactions(
        &self,
        register_id: &RegisterId,
        query: &TransactionQuery,
        cancel: &CancellationToken,
    ) -> Result<Vec<Transaction>> {
        ensure_active(cancel)?;
        let inner = self.read()?;
        let entry = inner.entry(register_id)?;
        Ok(query.apply(entry.order.iter().filter_map(|id| entry.transactions.get(id))))
    }

    async fn count_transactions(
        &self,
        register_id: &RegisterId,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        ensure_active(cancel)?;
        let inner = self.read()?;
        Ok(inner.entry(register_id)?.transactions.len() as u64)
    }

    async fn get_docket(
        &self,
        register_id: &RegisterId,
        id: u64,
        cancel: &CancellationToken,
    ) -> Result<Option<Docket>> {
        ensure_active(cancel)?;
        let inner = self.read()?;
        Ok(inner
            .registers
            .get(register_id)
            .and_then(|e| e.dockets.get(&id))
            .cloned())
    }

    async fn list_dockets(
        &self,
        register_id: &RegisterId,
        cancel: &CancellationToken,
    ) -> Result<Vec<Docket>> {
        ensure_active(cancel)?;
        let inner = self.read()?;
        Ok(inner.entry(register_id)?.dockets.values().cloned().collect())
    }

    async fn latest_docket(
        &self,
        register_id: &RegisterId,
        cancel: &CancellationToken,
    ) -> Result<Option<Docket>> {
        ensure_active(cancel)?;
        let inner = self.read()?;
        let entry = inner.entry(register_id)?;
        Ok(entry.dockets.get(&entry.register.height).cloned())
    }

    async fn seal_docket_atomic(
        &self,
        register_id: &RegisterId,
        docket: &Docket,
        expected_height: u64,
        cancel: &CancellationToken,
    ) -> Result<Docket> {
        let mut inner = self.write()?;
        ensure_active(cancel)?;

        let entry = inner.entry_mut(register_id)?;
        let height = entry.register.height;

        if height != expected_height || entry.dockets.contains_key(&docket.id) {
            return Err(StoreError::ConcurrencyConflict {
                expected: expected_height,
                actual: height,
            });
        }

        if docket.register_id != *register_id {
            return Err(StoreError::ChainIntegrityViolation(format!(
                "docket belongs to register {}",
                docket.register_id
            )));
        }

        if docket.id != height + 1 {
            return Err(StoreError::ChainIntegrityViolation(format!(
                "docket id {} does not follow height {height}",
                docket.id
            )));
        }

        let previous = match height {
            0 => GENESIS_HASH,
            h => entry
                .dockets
                .get(&h)
                .map(|d| d.hash)
                .ok_or_else(|| {
                    StoreError::ChainIntegrityViolation(format!("docket {h} missing at head"))
                })?,
        };
        if docket.previous_hash != previous {
            return Err(StoreError::ChainIntegrityViolation(format!(
                "docket {} does not link to docket {height}",
                docket.id
            )));
        }

        if let Some(missing) = docket
            .transaction_ids
            .iter()
            .find(|id| !entry.transactions.contains_key(id))
        {
            return Err(StoreError::ChainIntegrityViolation(format!(
                "transaction {missing} is not stored in register {register_id}"
            )));
        }

        if docket.state == DocketState::Rejected {
            return Err(StoreError::ChainIntegrityViolation(format!(
                "docket {} was rejected",
                docket.id
            )));
        }

        let mut sealed = docket.clone();
        sealed.state = DocketState::Sealed;
        entry.dockets.insert(sealed.id, sealed.clone());
        entry.register.height = sealed.id;
        entry.register.updated_at = now_millis();

        Ok(sealed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use register_ledger_core::{
        DocketBuilder, Keypair, NewRegister, Sha256Hash, TransactionDraft, TransactionType,
        WalletId,
    };

    fn register(name: &str, tenant: &str) -> Register {
        NewRegister::new(name, tenant)
            .into_register(RegisterId::generate(), now_millis())
            .unwrap()
    }

    fn tx(register_id: RegisterId, ts: i64, prev: Option<TxId>) -> Transaction {
        let mut draft = TransactionDraft::new(register_id, TransactionType::Action)
            .timestamp(ts)
            .recipient(WalletId::new("r1"));
        if let Some(p) = prev {
            draft = draft.prev(p);
        }
        draft.sign(&Keypair::from_seed(&[3; 32]))
    }

    async fn store_with_register() -> (MemoryStore, RegisterId, CancellationToken) {
        let store = MemoryStore::new();
        let cancel = CancellationToken::new();
        let reg = register("orders", "t1");
        store.insert_register(&reg, 25, &cancel).await.unwrap();
        (store, reg.id, cancel)
    }

    #[tokio::test]
    async fn test_register_insert_rules() {
        let store = MemoryStore::new();
        let cancel = CancellationToken::new();
        let reg = register("a", "t1");

        store.insert_register(&reg, 2, &cancel).await.unwrap();
        assert!(matches!(
            store.insert_register(&reg, 2, &cancel).await,
            Err(StoreError::AlreadyExists(_))
        ));

        store
            .insert_register(&register("b", "t2"), 2, &cancel)
            .await
            .unwrap();
        assert!(matches!(
            store.insert_register(&register("c", "t1"), 2, &cancel).await,
            Err(StoreError::LimitExceeded { limit: 2 })
        ));

        assert_eq!(store.list_registers(None, &cancel).await.unwrap().len(), 2);
        assert_eq!(
            store.list_registers(Some("t1"), &cancel).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_transaction_insert_is_idempotent() {
        let (store, register_id, cancel) = store_with_register().await;
        let t = tx(register_id, 1, None);

        let first = store.insert_transaction(&t, &cancel).await.unwrap();
        assert!(first.is_inserted());

        let second = store.insert_transaction(&t, &cancel).await.unwrap();
        assert_eq!(second, InsertOutcome::Existing(t.clone()));
        assert_eq!(store.count_transactions(&register_id, &cancel).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_transaction_requires_register_and_prev() {
        let (store, register_id, cancel) = store_with_register().await;

        let stray = tx(RegisterId::generate(), 1, None);
        assert!(matches!(
            store.insert_transaction(&stray, &cancel).await,
            Err(StoreError::RegisterNotFound(_))
        ));

        let orphan = tx(register_id, 2, Some(TxId::from_bytes([0xaa; 32])));
        assert!(matches!(
            store.insert_transaction(&orphan, &cancel).await,
            Err(StoreError::ChainIntegrityViolation(_))
        ));
        assert_eq!(store.count_transactions(&register_id, &cancel).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_query_returns_commit_order() {
        let (store, register_id, cancel) = store_with_register().await;
        // Insert with decreasing timestamps to show order is by commit.
        for ts in [30, 10, 20] {
            store
                .insert_transaction(&tx(register_id, ts, None), &cancel)
                .await
                .unwrap();
        }
        let all = store
            .query_transactions(&register_id, &TransactionQuery::new(), &cancel)
            .await
            .unwrap();
        let stamps: Vec<i64> = all.iter().map(|t| t.timestamp).collect();
        assert_eq!(stamps, vec![30, 10, 20]);
    }

    #[tokio::test]
    async fn test_seal_advances_height() {
        let (store, register_id, cancel) = store_with_register().await;
        let t = tx(register_id, 1, None);
        store.insert_transaction(&t, &cancel).await.unwrap();

        let d1 = DocketBuilder::new(register_id, 1, GENESIS_HASH)
            .transaction(t.tx_id)
            .build();
        let sealed = store
            .seal_docket_atomic(&register_id, &d1, 0, &cancel)
            .await
            .unwrap();
        assert_eq!(sealed.state, DocketState::Sealed);

        let reg = store.get_register(&register_id, &cancel).await.unwrap().unwrap();
        assert_eq!(reg.height, 1);
        assert_eq!(
            store.latest_docket(&register_id, &cancel).await.unwrap(),
            Some(sealed.clone())
        );

        // Same height again: someone else got there first.
        assert!(matches!(
            store.seal_docket_atomic(&register_id, &d1, 0, &cancel).await,
            Err(StoreError::ConcurrencyConflict {
                expected: 0,
                actual: 1
            })
        ));

        let d2 = DocketBuilder::new(register_id, 2, sealed.hash)
            .transaction(t.tx_id)
            .build();
        store
            .seal_docket_atomic(&register_id, &d2, 1, &cancel)
            .await
            .unwrap();
        assert_eq!(store.list_dockets(&register_id, &cancel).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_seal_rejects_broken_links() {
        let (store, register_id, cancel) = store_with_register().await;
        let t = tx(register_id, 1, None);
        store.insert_transaction(&t, &cancel).await.unwrap();

        let wrong_id = DocketBuilder::new(register_id, 2, GENESIS_HASH)
            .transaction(t.tx_id)
            .build();
        let wrong_prev = DocketBuilder::new(register_id, 1, Sha256Hash::hash(b"x"))
            .transaction(t.tx_id)
            .build();
        let missing_tx = DocketBuilder::new(register_id, 1, GENESIS_HASH)
            .transaction(TxId::from_bytes([0xbb; 32]))
            .build();

        for d in [wrong_id, wrong_prev, missing_tx] {
            assert!(matches!(
                store.seal_docket_atomic(&register_id, &d, 0, &cancel).await,
                Err(StoreError::ChainIntegrityViolation(_))
            ));
        }
        let reg = store.get_register(&register_id, &cancel).await.unwrap().unwrap();
        assert_eq!(reg.height, 0);
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let (store, register_id, cancel) = store_with_register().await;
        let t = tx(register_id, 1, None);
        store.insert_transaction(&t, &cancel).await.unwrap();

        store.delete_register(&register_id, &cancel).await.unwrap();
        assert!(!store.has_register(&register_id, &cancel).await.unwrap());
        assert!(store
            .get_transaction(&register_id, &t.tx_id, &cancel)
            .await
            .unwrap()
            .is_none());
        assert!(matches!(
            store.delete_register(&register_id, &cancel).await,
            Err(StoreError::RegisterNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_cancelled_write_leaves_nothing() {
        let (store, register_id, cancel) = store_with_register().await;
        let cancelled = CancellationToken::new();
        cancelled.cancel();

        let t = tx(register_id, 1, None);
        assert!(matches!(
            store.insert_transaction(&t, &cancelled).await,
            Err(StoreError::Cancelled)
        ));
        assert_eq!(store.count_transactions(&register_id, &cancel).await.unwrap(), 0);
    }
}
