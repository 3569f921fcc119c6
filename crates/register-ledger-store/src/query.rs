//! Declarative transaction queries.
//!
//! A query is a conjunction of optional predicates. Backends may translate
//! it into their own query language; [`TransactionQuery::matches`] is the
//! reference semantics every backend must agree with.

use serde::{Deserialize, Serialize};

use register_ledger_core::{Transaction, TransactionType, TxId, WalletId};

/// Filter over the transactions of one register.
///
/// Results are returned in commit order, after `offset` matches are skipped
/// and truncated to `limit`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionQuery {
    pub blueprint_id: Option<String>,
    pub instance_id: Option<String>,
    pub sender: Option<WalletId>,
    pub recipient: Option<WalletId>,
    pub transaction_type: Option<TransactionType>,
    pub prev_tx_id: Option<TxId>,
    /// Inclusive lower bound on `timestamp`.
    pub from: Option<i64>,
    /// Exclusive upper bound on `timestamp`.
    pub until: Option<i64>,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl TransactionQuery {
    /// A query matching every transaction.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blueprint(mut self, blueprint_id: impl Into<String>) -> Self {
        self.blueprint_id = Some(blueprint_id.into());
        self
    }

    pub fn instance(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = Some(instance_id.into());
        self
    }

    pub fn sender(mut self, wallet: WalletId) -> Self {
        self.sender = Some(wallet);
        self
    }

    pub fn recipient(mut self, wallet: WalletId) -> Self {
        self.recipient = Some(wallet);
        self
    }

    pub fn of_type(mut self, transaction_type: TransactionType) -> Self {
        self.transaction_type = Some(transaction_type);
        self
    }

    pub fn following(mut self, prev: TxId) -> Self {
        self.prev_tx_id = Some(prev);
        self
    }

    /// Restrict to `from <= timestamp < until`.
    pub fn between(mut self, from: i64, until: i64) -> Self {
        self.from = Some(from);
        self.until = Some(until);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a single transaction satisfies every predicate.
    pub fn matches(&self, tx: &Transaction) -> bool {
        let meta = &tx.metadata;

        if let Some(bp) = &self.blueprint_id {
            if meta.blueprint_id.as_ref() != Some(bp) {
                return false;
            }
        }
        if let Some(inst) = &self.instance_id {
            if meta.instance_id.as_ref() != Some(inst) {
                return false;
            }
        }
        if let Some(sender) = &self.sender {
            if &tx.sender_wallet != sender {
                return false;
            }
        }
        if let Some(recipient) = &self.recipient {
            if !tx.recipient_wallets.contains(recipient) {
                return false;
            }
        }
        if let Some(kind) = self.transaction_type {
            if meta.transaction_type != kind {
                return false;
            }
        }
        if let Some(prev) = &self.prev_tx_id {
            if tx.prev_tx_id.as_ref() != Some(prev) {
                return false;
            }
        }
        if let Some(from) = self.from {
            if tx.timestamp < from {
                return false;
            }
        }
        if let Some(until) = self.until {
            if tx.timestamp >= until {
                return false;
            }
        }
        true
    }

    /// Apply the query to transactions already in commit order.
    pub fn apply<'a, I>(&self, ordered: I) -> Vec<Transaction>
    where
        I: IntoIterator<Item = &'a Transaction>,
    {
        let matching = ordered
            .into_iter()
            .filter(|tx| self.matches(tx))
            .skip(self.offset);

        match self.limit {
            Some(limit) => matching.take(limit).cloned().collect(),
            None => matching.cloned().collect(),
        }
    }
}
