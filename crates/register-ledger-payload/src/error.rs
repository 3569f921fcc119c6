//! Error types for payload sealing and opening.

use thiserror::Error;

/// Errors that can occur while building or opening a payload envelope.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// A payload must be addressed to at least one wallet.
    #[error("payload has no recipients")]
    NoRecipients,

    /// The same wallet was given twice with different keys.
    #[error("duplicate recipient: {0}")]
    DuplicateRecipient(String),

    /// The wallet holds no challenge on this payload.
    #[error("no challenge for wallet {0}")]
    NoMatchingChallenge(String),

    /// The challenge did not open with the supplied private key.
    #[error("payload key could not be unwrapped for wallet {0}")]
    KeyUnwrapFailed(String),

    /// The ciphertext failed authentication, or the recovered plaintext does
    /// not hash to the payload's content hash.
    #[error("payload integrity violation: {0}")]
    IntegrityViolation(String),

    /// The payload uses a cipher or compression this build cannot handle.
    #[error("unsupported payload flags: {0}")]
    Unsupported(String),

    /// Encryption error.
    #[error("encryption error: {0}")]
    EncryptionError(String),

    /// Compression or decompression error.
    #[error("compression error: {0}")]
    CompressionError(String),
}

/// Result type for payload operations.
pub type Result<T> = std::result::Result<T, PayloadError>;
