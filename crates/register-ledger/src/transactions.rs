//! TransactionLedger: stores signed transactions and walks their chains.

use std::collections::HashSet;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use register_ledger_core::{validate_transaction, RegisterId, Transaction, TxId};
use register_ledger_events::{EventNotifier, LedgerEvent};
use register_ledger_store::{InsertOutcome, LedgerStore, StoreError, TransactionQuery};

use crate::error::{LedgerError, Result};
use crate::locks::CommitLocks;

/// Outcome of storing a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestResult {
    /// First time this transaction was stored.
    Accepted(Transaction),
    /// Already stored; the stored copy.
    Duplicate(Transaction),
}

impl IngestResult {
    pub fn into_transaction(self) -> Transaction {
        match self {
            IngestResult::Accepted(tx) | IngestResult::Duplicate(tx) => tx,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, IngestResult::Accepted(_))
    }
}

/// Result of walking a transaction's `prev_tx_id` links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainStatus {
    /// Every link resolved; `length` transactions from the start back to the root.
    Valid { length: usize },
    /// `at` names a previous transaction, `missing`, that is not stored.
    Broken { at: TxId, missing: TxId },
}

impl ChainStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, ChainStatus::Valid { .. })
    }
}

/// Stores transactions into registers and publishes confirmations.
pub struct TransactionLedger<S: LedgerStore> {
    pub(crate) store: Arc<S>,
    pub(crate) notifier: Arc<dyn EventNotifier>,
    pub(crate) locks: Arc<CommitLocks>,
    verify_on_store: bool,
}

impl<S: LedgerStore> Clone for TransactionLedger<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            notifier: Arc::clone(&self.notifier),
            locks: Arc::clone(&self.locks),
            verify_on_store: self.verify_on_store,
        }
    }
}

impl<S: LedgerStore> TransactionLedger<S> {
    pub fn new(
        store: Arc<S>,
        notifier: Arc<dyn EventNotifier>,
        locks: Arc<CommitLocks>,
        verify_on_store: bool,
    ) -> Self {
        Self {
            store,
            notifier,
            locks,
            verify_on_store,
        }
    }

    /// Store a signed transaction in the register named by its metadata.
    ///
    /// Storing a transaction twice returns the stored copy and publishes
    /// nothing the second time. A `prev_tx_id` that is not stored in the
    /// same register is a chain integrity violation, never a new root.
    pub async fn store(
        &self,
        tx: &Transaction,
        cancel: &CancellationToken,
    ) -> Result<IngestResult> {
        let register_id = *tx.register_id();

        if !self.store.has_register(&register_id, cancel).await? {
            return Err(LedgerError::RegisterNotFound(register_id));
        }

        if self.verify_on_store {
            if let Err(e) = validate_transaction(tx) {
                warn!(register = %register_id, tx = %tx.tx_id, error = %e, "rejected transaction");
                return Err(e.into());
            }
        }

        let Some(_guard) = self.locks.acquire_or_cancel(&register_id, cancel).await else {
            return Err(LedgerError::Cancelled);
        };

        let outcome = match self.store.insert_transaction(tx, cancel).await {
            Ok(outcome) => outcome,
            Err(StoreError::ChainIntegrityViolation(msg)) => {
                warn!(register = %register_id, tx = %tx.tx_id, "{msg}");
                return Err(LedgerError::ChainIntegrityViolation(msg));
            }
            Err(e) => return Err(e.into()),
        };

        match outcome {
            InsertOutcome::Inserted(stored) => {
                debug!(register = %register_id, tx = %stored.tx_id, "stored transaction");
                self.publish(LedgerEvent::TransactionConfirmed {
                    register_id,
                    tx_id: stored.tx_id,
                    recipients: stored.recipient_wallets.clone(),
                    sender: stored.sender_wallet.clone(),
                    prev_tx_id: stored.prev_tx_id,
                    metadata: stored.metadata.clone(),
                })
                .await;
                Ok(IngestResult::Accepted(stored))
            }
            InsertOutcome::Existing(stored) => {
                debug!(register = %register_id, tx = %stored.tx_id, "duplicate transaction");
                Ok(IngestResult::Duplicate(stored))
            }
        }
    }

    /// Get a transaction of a register.
    pub async fn get_transaction(
        &self,
        register_id: &RegisterId,
        tx_id: &TxId,
        cancel: &CancellationToken,
    ) -> Result<Transaction> {
        self.store
            .get_transaction(register_id, tx_id, cancel)
            .await?
            .ok_or(LedgerError::TransactionNotFound(*tx_id))
    }

    /// Query a register's transactions, in commit order.
    pub async fn query(
        &self,
        register_id: &RegisterId,
        query: &TransactionQuery,
        cancel: &CancellationToken,
    ) -> Result<Vec<Transaction>> {
        Ok(self
            .store
            .query_transactions(register_id, query, cancel)
            .await?)
    }

    /// Number of transactions stored in a register.
    pub async fn count(&self, register_id: &RegisterId, cancel: &CancellationToken) -> Result<u64> {
        Ok(self.store.count_transactions(register_id, cancel).await?)
    }

    /// Walk `prev_tx_id` links back from `tx_id` to the thread root.
    ///
    /// Stops at the first link that does not resolve. The starting
    /// transaction itself must be stored.
    pub async fn validate_chain(
        &self,
        register_id: &RegisterId,
        tx_id: &TxId,
        cancel: &CancellationToken,
    ) -> Result<ChainStatus> {
        let mut current = self.get_transaction(register_id, tx_id, cancel).await?;
        let mut visited = HashSet::from([current.tx_id]);

        while let Some(prev) = current.prev_tx_id {
            if !visited.insert(prev) {
                return Err(LedgerError::ChainIntegrityViolation(format!(
                    "transaction {} links back into its own chain",
                    current.tx_id
                )));
            }
            match self.store.get_transaction(register_id, &prev, cancel).await? {
                Some(tx) => current = tx,
                None => {
                    warn!(register = %register_id, tx = %current.tx_id, missing = %prev, "broken transaction chain");
                    return Ok(ChainStatus::Broken {
                        at: current.tx_id,
                        missing: prev,
                    });
                }
            }
        }

        Ok(ChainStatus::Valid {
            length: visited.len(),
        })
    }

    /// Publish an event. Failures are logged; the mutation stands.
    pub(crate) async fn publish(&self, event: LedgerEvent) {
        let kind = event.kind();
        let register_id = *event.register_id();
        if let Err(e) = self.notifier.notify(event).await {
            warn!(register = %register_id, event = kind, error = %e, "event notification failed");
        }
    }
}
