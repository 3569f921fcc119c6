//! Strong identifier types for the register ledger.
//!
//! All identifiers are newtypes to prevent misuse at compile time.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::crypto::Ed25519PublicKey;
use crate::error::CoreError;

/// A 32-byte transaction identifier: the double SHA-256 signing digest.
///
/// Two semantically identical submissions produce the same TxId, which is
/// what makes transaction inserts idempotent.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TxId(pub [u8; 32]);

crate::crypto::fixed_bytes!(TxId, 32, "TxId");

/// A register identifier: 16 bytes rendered as 32 lowercase hex characters.
///
/// The textual form has no separators, so it is safe to embed in collection
/// names, topic names and paths by storage and transport collaborators.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RegisterId(pub [u8; 16]);

impl RegisterId {
    /// Generate a new random register id.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Convert to the canonical 32-character hex form.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse the canonical form. Uppercase, separators and other lengths are rejected.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        if s.len() != 32 || !s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return Err(CoreError::InvalidIdentifier(format!("register id: {s:?}")));
        }
        let bytes =
            hex::decode(s).map_err(|e| CoreError::InvalidIdentifier(e.to_string()))?;
        let mut arr = [0u8; 16];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for RegisterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RegisterId({})", self.to_hex())
    }
}

impl fmt::Display for RegisterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for RegisterId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A wallet identifier.
///
/// Wallets are external identities; their id is the lowercase hex encoding of
/// the wallet's Ed25519 public key, which lets a verifier recover the sender's
/// key from the transaction itself.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WalletId(String);

impl WalletId {
    /// Derive the wallet id for a public key.
    pub fn from_public_key(key: &Ed25519PublicKey) -> Self {
        Self(key.to_hex())
    }

    /// Wrap a wallet id string without checking its shape.
    ///
    /// Recipient wallets are opaque to the ledger; only sender wallets must
    /// decode to a public key, which [`WalletId::public_key`] checks.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The textual id.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Recover the Ed25519 public key this wallet id encodes.
    pub fn public_key(&self) -> Result<Ed25519PublicKey, CoreError> {
        Ed25519PublicKey::from_hex(&self.0)
            .map_err(|_| CoreError::InvalidIdentifier(format!("wallet id: {:?}", self.0)))
    }
}

impl fmt::Debug for WalletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = self.0.get(..16).unwrap_or(&self.0);
        write!(f, "WalletId({shown})")
    }
}

impl fmt::Display for WalletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for WalletId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
