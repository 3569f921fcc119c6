//! Events emitted after successful ledger mutations.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use register_ledger_core::{RegisterId, TransactionMetadata, TxId, WalletId};

/// A committed change, published to collaborators after it is durable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    RegisterCreated {
        register_id: RegisterId,
        name: String,
        tenant_id: String,
    },
    RegisterDeleted {
        register_id: RegisterId,
    },
    TransactionConfirmed {
        register_id: RegisterId,
        tx_id: TxId,
        recipients: BTreeSet<WalletId>,
        sender: WalletId,
        prev_tx_id: Option<TxId>,
        metadata: TransactionMetadata,
    },
    DocketConfirmed {
        register_id: RegisterId,
        docket_id: u64,
        transaction_ids: Vec<TxId>,
        timestamp: i64,
    },
}

impl LedgerEvent {
    /// The register the event concerns.
    pub fn register_id(&self) -> &RegisterId {
        match self {
            LedgerEvent::RegisterCreated { register_id, .. }
            | LedgerEvent::RegisterDeleted { register_id }
            | LedgerEvent::TransactionConfirmed { register_id, .. }
            | LedgerEvent::DocketConfirmed { register_id, .. } => register_id,
        }
    }

    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerEvent::RegisterCreated { .. } => "register_created",
            LedgerEvent::RegisterDeleted { .. } => "register_deleted",
            LedgerEvent::TransactionConfirmed { .. } => "transaction_confirmed",
            LedgerEvent::DocketConfirmed { .. } => "docket_confirmed",
        }
    }
}
