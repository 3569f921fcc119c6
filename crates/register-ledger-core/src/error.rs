//! Error types for the register ledger core.

use thiserror::Error;

use crate::docket::DocketState;

/// Core errors that can occur while handling ledger primitives.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("invalid register: {0}")]
    InvalidRegister(String),

    #[error("illegal docket state transition from {from:?} to {to:?}")]
    InvalidStateTransition { from: DocketState, to: DocketState },

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// Validation errors for transaction structure and signatures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("signature verification failed")]
    SignatureInvalid,

    #[error("transaction id does not match the signed digest")]
    TxIdMismatch,

    #[error("payload {index} content hash does not match its plaintext")]
    PayloadHashMismatch { index: usize },

    #[error("unsupported transaction version: {0}")]
    UnsupportedVersion(u32),

    #[error("transaction has no recipients")]
    NoRecipients,

    #[error("transaction carries {0} payloads, more than the allowed maximum")]
    TooManyPayloads(usize),

    #[error("payload {index} has {challenges} challenges for {recipients} recipients")]
    ChallengeMismatch {
        index: usize,
        challenges: usize,
        recipients: usize,
    },

    #[error("invalid docket: {0}")]
    InvalidDocket(String),

    #[error("structural error: {0}")]
    StructuralError(String),
}

impl From<CoreError> for ValidationError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidSignature | CoreError::InvalidPublicKey => {
                ValidationError::SignatureInvalid
            }
            CoreError::InvalidIdentifier(msg)
            | CoreError::InvalidRegister(msg)
            | CoreError::EncodingError(msg)
            | CoreError::DecodingError(msg) => ValidationError::StructuralError(msg),
            CoreError::InvalidStateTransition { from, to } => ValidationError::InvalidDocket(
                format!("illegal state transition from {from:?} to {to:?}"),
            ),
        }
    }
}
