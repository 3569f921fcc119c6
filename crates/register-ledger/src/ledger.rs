//! The Ledger: unified API over registers, transactions and dockets.
//!
//! The Ledger wires a storage backend and an event sink into the
//! transaction ledger, the docket sealer and register management.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use register_ledger_core::{
    now_millis, Docket, NewRegister, Register, RegisterId, RegisterStatus, Transaction, TxId,
};
use register_ledger_events::{EventNotifier, LedgerEvent};
use register_ledger_payload::PayloadCodec;
use register_ledger_store::{LedgerStore, TransactionQuery};

use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};
use crate::locks::CommitLocks;
use crate::sealer::DocketSealer;
use crate::signer::TransactionSigner;
use crate::transactions::{IngestResult, TransactionLedger};

/// The main Ledger struct.
///
/// Provides a unified API for:
/// - Creating, listing and deleting registers
/// - Storing and querying signed transactions
/// - Sealing and verifying dockets
/// - Building and verifying transactions with encrypted payloads
pub struct Ledger<S: LedgerStore> {
    store: Arc<S>,
    config: LedgerConfig,
    transactions: TransactionLedger<S>,
    sealer: DocketSealer<S>,
    signer: TransactionSigner,
}

impl<S: LedgerStore> Ledger<S> {
    /// Create a new ledger over `store`, publishing to `notifier`.
    pub fn new(store: S, notifier: Arc<dyn EventNotifier>, config: LedgerConfig) -> Self {
        let store = Arc::new(store);
        let transactions = TransactionLedger::new(
            Arc::clone(&store),
            notifier,
            Arc::new(CommitLocks::new()),
            config.verify_on_store,
        );
        Self {
            sealer: DocketSealer::new(transactions.clone()),
            signer: TransactionSigner::new(PayloadCodec::new(config.payload.clone())),
            transactions,
            store,
            config,
        }
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn transactions(&self) -> &TransactionLedger<S> {
        &self.transactions
    }

    pub fn sealer(&self) -> &DocketSealer<S> {
        &self.sealer
    }

    pub fn signer(&self) -> &TransactionSigner {
        &self.signer
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Register Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a register with a fresh id.
    ///
    /// The register starts offline at height 0. Fails with `LimitExceeded`
    /// once `max_registers` registers exist.
    pub async fn create_register(
        &self,
        new: NewRegister,
        cancel: &CancellationToken,
    ) -> Result<Register> {
        let register = new.into_register(RegisterId::generate(), now_millis())?;
        self.store
            .insert_register(&register, self.config.max_registers, cancel)
            .await?;

        info!(register = %register.id, name = %register.name, tenant = %register.tenant_id, "created register");
        self.transactions
            .publish(LedgerEvent::RegisterCreated {
                register_id: register.id,
                name: register.name.clone(),
                tenant_id: register.tenant_id.clone(),
            })
            .await;
        Ok(register)
    }

    /// Delete a register with all of its transactions and dockets.
    pub async fn delete_register(&self, id: &RegisterId, cancel: &CancellationToken) -> Result<()> {
        {
            let Some(_guard) = self.transactions.locks.acquire_or_cancel(id, cancel).await else {
                return Err(LedgerError::Cancelled);
            };
            self.store.delete_register(id, cancel).await?;
            info!(register = %id, "deleted register");
            self.transactions
                .publish(LedgerEvent::RegisterDeleted { register_id: *id })
                .await;
        }
        self.transactions.locks.remove(id);
        Ok(())
    }

    /// Get a register.
    pub async fn get_register(
        &self,
        id: &RegisterId,
        cancel: &CancellationToken,
    ) -> Result<Register> {
        self.store
            .get_register(id, cancel)
            .await?
            .ok_or(LedgerError::RegisterNotFound(*id))
    }

    /// List registers, optionally of a single tenant.
    pub async fn list_registers(
        &self,
        tenant_id: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Register>> {
        Ok(self.store.list_registers(tenant_id, cancel).await?)
    }

    /// Change a register's operational status.
    pub async fn set_register_status(
        &self,
        id: &RegisterId,
        status: RegisterStatus,
        cancel: &CancellationToken,
    ) -> Result<Register> {
        let register = self.store.update_register_status(id, status, cancel).await?;
        info!(register = %id, ?status, "register status changed");
        Ok(register)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transaction and Docket Shortcuts
    // ─────────────────────────────────────────────────────────────────────────

    /// Store a signed transaction.
    pub async fn store_transaction(
        &self,
        tx: &Transaction,
        cancel: &CancellationToken,
    ) -> Result<IngestResult> {
        self.transactions.store(tx, cancel).await
    }

    /// Get a transaction of a register.
    pub async fn get_transaction(
        &self,
        register_id: &RegisterId,
        tx_id: &TxId,
        cancel: &CancellationToken,
    ) -> Result<Transaction> {
        self.transactions
            .get_transaction(register_id, tx_id, cancel)
            .await
    }

    /// Query a register's transactions, in commit order.
    pub async fn query_transactions(
        &self,
        register_id: &RegisterId,
        query: &TransactionQuery,
        cancel: &CancellationToken,
    ) -> Result<Vec<Transaction>> {
        self.transactions.query(register_id, query, cancel).await
    }

    /// Seal the given stored transactions as the register's next docket.
    pub async fn seal_next(
        &self,
        register_id: &RegisterId,
        transaction_ids: impl IntoIterator<Item = TxId>,
        cancel: &CancellationToken,
    ) -> Result<Docket> {
        let candidate = self
            .sealer
            .next_candidate(register_id, transaction_ids, cancel)
            .await?;
        self.sealer.propose_and_seal(candidate, cancel).await
    }
}
