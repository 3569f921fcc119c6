//! # Register Ledger Core
//!
//! Pure primitives for the register ledger: registers, transactions, payload
//! envelopes, dockets and their canonical encodings.
//!
//! This crate contains no I/O, no storage, no networking. It is pure computation
//! over cryptographic data structures.
//!
//! ## Key Types
//!
//! - [`Register`] - A named chain of dockets
//! - [`Transaction`] - An immutable, signed record addressed to wallets
//! - [`Payload`] - An encrypted, multi-recipient data unit inside a transaction
//! - [`Docket`] - A sealed, hash-chained batch of transactions
//! - [`TxId`] - Content-addressed transaction identifier (double SHA-256)
//!
//! ## Canonicalization
//!
//! Transactions and dockets are hashed over deterministic CBOR. See the
//! [`canonical`] module for the frozen field layout.

pub mod canonical;
pub mod crypto;
pub mod docket;
pub mod error;
pub mod payload;
pub mod register;
pub mod transaction;
pub mod types;
pub mod validation;

pub use canonical::{canonical_docket_bytes, canonical_transaction_bytes};
pub use crypto::{Ed25519PublicKey, Ed25519Signature, Keypair, Sha256Hash};
pub use docket::{
    verify_docket_chain, Docket, DocketBuilder, DocketChainStatus, DocketState, GENESIS_HASH,
};
pub use error::{CoreError, ValidationError};
pub use payload::{Challenge, CipherSuite, Compression, Payload, PayloadFlags};
pub use register::{NewRegister, Register, RegisterStatus, MAX_REGISTER_NAME_LEN};
pub use transaction::{
    Transaction, TransactionDraft, TransactionMetadata, TransactionType, MAX_PAYLOADS,
    TRANSACTION_VERSION,
};
pub use types::{RegisterId, TxId, WalletId};
pub use validation::{
    validate_docket_candidate, validate_transaction, validate_transaction_structure,
};

/// Current wall-clock time in Unix milliseconds (UTC).
pub fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}
