//! Payload: an encrypted, multi-recipient data unit inside a transaction.
//!
//! This module only describes the envelope. Building and opening envelopes
//! (key wrapping, AEAD, compression) lives in the payload codec crate.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::crypto::Sha256Hash;
use crate::types::WalletId;

/// Compression applied to the plaintext before encryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Compression {
    /// Stored as-is.
    None = 0,
    /// Zstandard frame.
    Zstd = 1,
}

impl Compression {
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::Zstd),
            _ => None,
        }
    }
}

/// Symmetric cipher used for the payload body and for every challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CipherSuite {
    /// ChaCha20-Poly1305 with a 256-bit key, keys wrapped via X25519.
    ChaCha20Poly1305 = 1,
}

impl CipherSuite {
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::ChaCha20Poly1305),
            _ => None,
        }
    }
}

/// Compression and cipher identifiers for a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PayloadFlags {
    pub compression: Compression,
    pub cipher: CipherSuite,
}

impl Default for PayloadFlags {
    fn default() -> Self {
        Self {
            compression: Compression::None,
            cipher: CipherSuite::ChaCha20Poly1305,
        }
    }
}

/// One recipient's wrapped copy of the payload key.
///
/// The key is encrypted under a key derived from an X25519 agreement between
/// a one-time ephemeral key and the recipient's static key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    /// The wallet this challenge is addressed to.
    pub wallet: WalletId,

    /// Ephemeral X25519 public key (sender's side of the agreement).
    pub ephemeral_public: [u8; 32],

    /// Nonce used to wrap the key.
    pub nonce: [u8; 12],

    /// The wrapped payload key (includes authentication tag).
    pub encrypted_key: Vec<u8>,
}

/// An encrypted payload envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    /// Wallets authorized to decrypt this payload.
    pub recipients: BTreeSet<WalletId>,

    /// Plaintext size in bytes.
    pub size: u64,

    /// SHA-256 of the plaintext, computed before any transform.
    pub content_hash: Sha256Hash,

    /// The encrypted (and possibly compressed) body, including the AEAD tag.
    pub ciphertext: Bytes,

    /// Nonce used for the body.
    pub iv: [u8; 12],

    /// Compression and cipher identifiers.
    pub flags: PayloadFlags,

    /// One wrapped key per recipient.
    pub challenges: Vec<Challenge>,
}

impl Payload {
    /// Find the challenge addressed to a wallet.
    pub fn challenge_for(&self, wallet: &WalletId) -> Option<&Challenge> {
        self.challenges.iter().find(|c| &c.wallet == wallet)
    }

    /// Whether a wallet holds a challenge for this payload.
    pub fn is_recipient(&self, wallet: &WalletId) -> bool {
        self.challenge_for(wallet).is_some()
    }

    /// Hash of the ciphertext bytes, bound into the transaction signature.
    pub fn ciphertext_hash(&self) -> Sha256Hash {
        Sha256Hash::hash(&self.ciphertext)
    }

    /// Check that challenges and recipients pair up one-to-one.
    pub fn challenges_match_recipients(&self) -> bool {
        if self.challenges.len() != self.recipients.len() {
            return false;
        }
        let wallets: BTreeSet<&WalletId> = self.challenges.iter().map(|c| &c.wallet).collect();
        wallets.len() == self.challenges.len()
            && self.recipients.iter().all(|r| wallets.contains(r))
    }
}
