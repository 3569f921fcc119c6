//! Error types for the store module.

use thiserror::Error;

use register_ledger_core::RegisterId;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The register does not exist.
    #[error("register not found: {0}")]
    RegisterNotFound(RegisterId),

    /// A record other than a register was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A register or docket with this identity already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The installation-wide register cap has been reached.
    #[error("register limit of {limit} reached")]
    LimitExceeded { limit: usize },

    /// The register height moved between read and seal.
    #[error("concurrent modification: expected height {expected}, found {actual}")]
    ConcurrencyConflict { expected: u64, actual: u64 },

    /// The write would break a chain invariant.
    #[error("chain integrity violation: {0}")]
    ChainIntegrityViolation(String),

    /// The operation's cancellation token fired before it committed.
    #[error("operation cancelled")]
    Cancelled,

    /// The backend failed; nothing was written.
    #[error("backend error: {0}")]
    Backend(String),

    /// The backend could not be reached; nothing was written.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
