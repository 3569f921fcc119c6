//! # Register Ledger
//!
//! The unified API for the register ledger: tenant-owned registers holding
//! signed transactions, grouped into hash-chained dockets.
//!
//! ## Overview
//!
//! - **Registers**: named chains owned by a tenant; `height` counts sealed dockets
//! - **Transactions**: signed by a wallet, addressed to recipient wallets,
//!   optionally linked to a previous transaction of the same thread
//! - **Payloads**: compressed, encrypted once and key-wrapped per recipient
//! - **Dockets**: ordered batches of stored transactions, each linked to the
//!   hash of the docket before it
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use register_ledger::{Ledger, LedgerConfig};
//! use register_ledger::core::{Keypair, NewRegister, TransactionDraft, TransactionType, WalletId};
//! use register_ledger::events::NoopNotifier;
//! use register_ledger::store::MemoryStore;
//! use tokio_util::sync::CancellationToken;
//!
//! async fn example() -> register_ledger::Result<()> {
//!     let ledger = Ledger::new(MemoryStore::new(), Arc::new(NoopNotifier), LedgerConfig::default());
//!     let cancel = CancellationToken::new();
//!
//!     let register = ledger
//!         .create_register(NewRegister::new("shipments", "acme"), &cancel)
//!         .await?;
//!
//!     let sender = Keypair::generate();
//!     let receiver = WalletId::from_public_key(&Keypair::generate().public_key());
//!     let tx = ledger.signer().sign(
//!         TransactionDraft::new(register.id, TransactionType::Action).recipient(receiver),
//!         &sender,
//!     );
//!     ledger.store_transaction(&tx, &cancel).await?;
//!
//!     let docket = ledger.seal_next(&register.id, [tx.tx_id], &cancel).await?;
//!     assert_eq!(docket.id, 1);
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `register_ledger::core` - Identifiers, transactions, dockets, canonical encoding
//! - `register_ledger::payload` - Payload encryption and compression
//! - `register_ledger::store` - Storage abstraction and the in-memory backend
//! - `register_ledger::events` - Ledger events and notifiers

pub mod cancel;
pub mod config;
pub mod error;
pub mod ledger;
pub mod locks;
pub mod sealer;
pub mod signer;
pub mod transactions;

// Re-export component crates
pub use register_ledger_core as core;
pub use register_ledger_events as events;
pub use register_ledger_payload as payload;
pub use register_ledger_store as store;

// Re-export main types for convenience
pub use cancel::deadline_token;
pub use config::LedgerConfig;
pub use error::{LedgerError, Result};
pub use ledger::Ledger;
pub use locks::CommitLocks;
pub use sealer::DocketSealer;
pub use signer::TransactionSigner;
pub use transactions::{ChainStatus, IngestResult, TransactionLedger};

// Re-export commonly used core types
pub use register_ledger_core::{
    Docket, DocketChainStatus, DocketState, Keypair, NewRegister, Register, RegisterId,
    RegisterStatus, Transaction, TransactionDraft, TransactionType, TxId, WalletId,
};
