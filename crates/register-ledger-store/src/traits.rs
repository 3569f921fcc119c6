//! LedgerStore trait: the abstract interface for register persistence.
//!
//! The ledger is storage-agnostic. Backends implement this trait; the
//! crate ships an in-memory implementation for tests and embedding.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use register_ledger_core::{Docket, Register, RegisterId, RegisterStatus, Transaction, TxId};

use crate::error::{Result, StoreError};
use crate::query::TransactionQuery;

/// Result of inserting a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The transaction was new and has been stored.
    Inserted(Transaction),
    /// A transaction with this id was already stored; the stored copy is returned.
    Existing(Transaction),
}

impl InsertOutcome {
    /// The stored transaction, whichever way the insert went.
    pub fn into_transaction(self) -> Transaction {
        match self {
            InsertOutcome::Inserted(tx) | InsertOutcome::Existing(tx) => tx,
        }
    }

    pub fn is_inserted(&self) -> bool {
        matches!(self, InsertOutcome::Inserted(_))
    }
}

/// Fail with `Cancelled` if the token has fired.
///
/// Backends call this before committing a write; a write that has committed
/// is never reported as cancelled.
pub fn ensure_active(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(StoreError::Cancelled)
    } else {
        Ok(())
    }
}

/// The LedgerStore trait: async interface for registers, transactions and dockets.
///
/// # Contract
///
/// - **Atomic writes**: every mutating method either commits completely or
///   leaves no trace. Duplicate-check-then-insert and height-check-then-seal
///   are single operations.
/// - **Idempotent transactions**: inserting an existing `tx_id` returns the
///   stored copy, not an error.
/// - **Height**: changes only through [`LedgerStore::seal_docket_atomic`].
/// - **Cancellation**: every method takes a token and returns
///   [`StoreError::Cancelled`] instead of starting work once it has fired.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Register Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Get a register by id.
    async fn get_register(
        &self,
        id: &RegisterId,
        cancel: &CancellationToken,
    ) -> Result<Option<Register>>;

    /// Check whether a register exists.
    async fn has_register(&self, id: &RegisterId, cancel: &CancellationToken) -> Result<bool> {
        Ok(self.get_register(id, cancel).await?.is_some())
    }

    /// List registers, optionally only those of one tenant.
    async fn list_registers(
        &self,
        tenant_id: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Register>>;

    /// Insert a new register.
    ///
    /// Fails with `AlreadyExists` for a known id and `LimitExceeded` when
    /// `limit` registers already exist. Both are checked in the same step
    /// as the insert.
    async fn insert_register(
        &self,
        register: &Register,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<()>;

    /// Change a register's status. Returns the updated register.
    async fn update_register_status(
        &self,
        id: &RegisterId,
        status: RegisterStatus,
        cancel: &CancellationToken,
    ) -> Result<Register>;

    /// Delete a register together with its transactions and dockets.
    async fn delete_register(&self, id: &RegisterId, cancel: &CancellationToken) -> Result<()>;

    // ─────────────────────────────────────────────────────────────────────────
    // Transaction Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Get a transaction of a register by id.
    async fn get_transaction(
        &self,
        register_id: &RegisterId,
        tx_id: &TxId,
        cancel: &CancellationToken,
    ) -> Result<Option<Transaction>>;

    /// Check whether a transaction exists in a register.
    async fn has_transaction(
        &self,
        register_id: &RegisterId,
        tx_id: &TxId,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        Ok(self
            .get_transaction(register_id, tx_id, cancel)
            .await?
            .is_some())
    }

    /// Insert a transaction into the register named in its metadata.
    ///
    /// Fails with `RegisterNotFound` for an unknown register and
    /// `ChainIntegrityViolation` when `prev_tx_id` is set but not stored in
    /// the same register.
    async fn insert_transaction(
        &self,
        tx: &Transaction,
        cancel: &CancellationToken,
    ) -> Result<InsertOutcome>;

    /// Query a register's transactions. Results are in commit order.
    async fn query_transactions(
        &self,
        register_id: &RegisterId,
        query: &TransactionQuery,
        cancel: &CancellationToken,
    ) -> Result<Vec<Transaction>>;

    /// Number of transactions stored in a register.
    async fn count_transactions(
        &self,
        register_id: &RegisterId,
        cancel: &CancellationToken,
    ) -> Result<u64>;

    // ─────────────────────────────────────────────────────────────────────────
    // Docket Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Get a sealed docket by id.
    async fn get_docket(
        &self,
        register_id: &RegisterId,
        id: u64,
        cancel: &CancellationToken,
    ) -> Result<Option<Docket>>;

    /// List a register's sealed dockets, ordered by id.
    async fn list_dockets(
        &self,
        register_id: &RegisterId,
        cancel: &CancellationToken,
    ) -> Result<Vec<Docket>>;

    /// The docket at the register's current height, if any.
    async fn latest_docket(
        &self,
        register_id: &RegisterId,
        cancel: &CancellationToken,
    ) -> Result<Option<Docket>>;

    /// Persist a docket, mark it sealed and advance the register height.
    ///
    /// In one atomic step:
    /// - the register height must still be `expected_height`, else
    ///   `ConcurrencyConflict`
    /// - the docket id must be `expected_height + 1`, its `previous_hash`
    ///   must match the docket at `expected_height` (genesis at 0) and every
    ///   listed transaction must be stored in the register, else
    ///   `ChainIntegrityViolation`
    ///
    /// Returns the docket as stored, in `Sealed` state.
    async fn seal_docket_atomic(
        &self,
        register_id: &RegisterId,
        docket: &Docket,
        expected_height: u64,
        cancel: &CancellationToken,
    ) -> Result<Docket>;
}
