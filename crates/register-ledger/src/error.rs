//! Error types for the ledger.

use register_ledger_core::{CoreError, RegisterId, TxId, ValidationError};
use register_ledger_payload::PayloadError;
use register_ledger_store::StoreError;
use thiserror::Error;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Validation error.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Payload error.
    #[error("payload error: {0}")]
    Payload(#[from] PayloadError),

    /// Storage error not covered by a more specific variant.
    #[error("storage error: {0}")]
    Store(StoreError),

    /// Register not found.
    #[error("register not found: {0}")]
    RegisterNotFound(RegisterId),

    /// Transaction not found.
    #[error("transaction not found: {0}")]
    TransactionNotFound(TxId),

    /// Docket not found.
    #[error("docket {id} not found in register {register_id}")]
    DocketNotFound { register_id: RegisterId, id: u64 },

    /// A register or docket with this identity already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The installation-wide register cap has been reached.
    #[error("register limit of {limit} reached")]
    LimitExceeded { limit: usize },

    /// The write would break a transaction or docket chain.
    #[error("chain integrity violation: {0}")]
    ChainIntegrityViolation(String),

    /// Another writer sealed first.
    #[error("concurrent modification: expected height {expected}, found {actual}")]
    ConcurrencyConflict { expected: u64, actual: u64 },

    /// The docket id is not the next height.
    #[error("invalid docket height: expected {expected}, got {got}")]
    InvalidHeight { expected: u64, got: u64 },

    /// A docket lists a transaction the register does not hold.
    #[error("missing transaction: {0}")]
    MissingTransaction(TxId),

    /// Illegal docket state transition.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Register parameters rejected.
    #[error("invalid register: {0}")]
    InvalidRegister(String),

    /// The operation was cancelled before it committed.
    #[error("operation cancelled")]
    Cancelled,

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

impl LedgerError {
    /// Whether this is a payload hash mismatch or a signature failure.
    pub fn is_integrity_violation(&self) -> bool {
        matches!(
            self,
            LedgerError::Validation(
                ValidationError::SignatureInvalid
                    | ValidationError::TxIdMismatch
                    | ValidationError::PayloadHashMismatch { .. }
            ) | LedgerError::Payload(PayloadError::IntegrityViolation(_))
        )
    }
}

impl From<StoreError> for LedgerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::RegisterNotFound(id) => LedgerError::RegisterNotFound(id),
            StoreError::AlreadyExists(what) => LedgerError::AlreadyExists(what),
            StoreError::LimitExceeded { limit } => LedgerError::LimitExceeded { limit },
            StoreError::ConcurrencyConflict { expected, actual } => {
                LedgerError::ConcurrencyConflict { expected, actual }
            }
            StoreError::ChainIntegrityViolation(msg) => LedgerError::ChainIntegrityViolation(msg),
            StoreError::Cancelled => LedgerError::Cancelled,
            other => LedgerError::Store(other),
        }
    }
}

impl From<CoreError> for LedgerError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidStateTransition { from, to } => {
                LedgerError::InvalidState(format!("cannot move docket from {from:?} to {to:?}"))
            }
            CoreError::InvalidRegister(msg) => LedgerError::InvalidRegister(msg),
            other => LedgerError::Validation(other.into()),
        }
    }
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
