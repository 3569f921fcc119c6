//! Transaction: the immutable, signed record stored in a register.
//!
//! A transaction is never edited. A rejection or correction is a new
//! transaction that points back at the original through `prev_tx_id`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::canonical::canonical_transaction_bytes;
use crate::crypto::{Ed25519PublicKey, Ed25519Signature, Keypair, Sha256Hash};
use crate::payload::Payload;
use crate::types::{RegisterId, TxId, WalletId};

/// The current transaction schema version (also versions the canonical layout).
pub const TRANSACTION_VERSION: u32 = 1;

/// Maximum number of payloads a transaction may carry.
pub const MAX_PAYLOADS: usize = 64;

/// The kind of transaction, as tagged in its metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum TransactionType {
    /// A workflow action submitted by a participant.
    Action = 1,
    /// Rejection of an earlier transaction (references it via `prev_tx_id`).
    Rejection = 2,
    /// Publication of a blueprint or other produced artefact.
    Production = 3,
    /// Participant registration or update.
    Participant = 4,
    /// Register control records.
    Control = 5,
}

impl TransactionType {
    /// Convert to u16 for serialization.
    pub fn to_u16(self) -> u16 {
        self as u16
    }

    /// Try to parse from u16.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(Self::Action),
            2 => Some(Self::Rejection),
            3 => Some(Self::Production),
            4 => Some(Self::Participant),
            5 => Some(Self::Control),
            _ => None,
        }
    }
}

/// Transaction metadata. Every field is covered by the signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionMetadata {
    /// The register this transaction belongs to.
    pub register_id: RegisterId,

    /// Transaction type tag.
    pub transaction_type: TransactionType,

    /// Blueprint the transaction was produced under, if any.
    pub blueprint_id: Option<String>,

    /// Workflow instance the transaction belongs to, if any.
    pub instance_id: Option<String>,

    /// Action within the blueprint, if any.
    pub action_id: Option<u32>,

    /// Opaque tracking key/value pairs.
    pub tracking: BTreeMap<String, String>,
}

impl TransactionMetadata {
    /// Metadata with only the register and type set.
    pub fn new(register_id: RegisterId, transaction_type: TransactionType) -> Self {
        Self {
            register_id,
            transaction_type,
            blueprint_id: None,
            instance_id: None,
            action_id: None,
            tracking: BTreeMap::new(),
        }
    }
}

/// A complete, signed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Double SHA-256 of the canonical signing document.
    pub tx_id: TxId,

    /// Logically prior transaction in the same thread, if any.
    pub prev_tx_id: Option<TxId>,

    /// Schema version.
    pub version: u32,

    /// Sender wallet (hex of the signing public key).
    pub sender_wallet: WalletId,

    /// Wallets this transaction is addressed to. Never empty.
    pub recipient_wallets: BTreeSet<WalletId>,

    /// Sender-claimed timestamp (Unix milliseconds, UTC).
    pub timestamp: i64,

    /// Register, type and tracking metadata.
    pub metadata: TransactionMetadata,

    /// Encrypted payloads, in order.
    pub payloads: Vec<Payload>,

    /// Ed25519 signature over the digest.
    pub signature: Ed25519Signature,
}

impl Transaction {
    /// The register this transaction belongs to.
    pub fn register_id(&self) -> &RegisterId {
        &self.metadata.register_id
    }

    /// Recompute the signing digest from the transaction's fields.
    pub fn compute_digest(&self) -> Sha256Hash {
        let sender = self
            .sender_wallet
            .public_key()
            .unwrap_or(Ed25519PublicKey::from_bytes([0u8; 32]));
        let bytes = canonical_transaction_bytes(
            self.version,
            &sender,
            &self.recipient_wallets,
            self.timestamp,
            self.prev_tx_id.as_ref(),
            &self.metadata,
            &self.payloads,
        );
        Sha256Hash::double(&bytes)
    }

    /// Whether this transaction starts a thread (has no predecessor).
    pub fn is_thread_root(&self) -> bool {
        self.prev_tx_id.is_none()
    }
}

/// An unsigned transaction, ready to be signed by its sender.
#[derive(Debug, Clone)]
pub struct TransactionDraft {
    version: u32,
    prev_tx_id: Option<TxId>,
    recipients: BTreeSet<WalletId>,
    timestamp: i64,
    metadata: TransactionMetadata,
    payloads: Vec<Payload>,
}

impl TransactionDraft {
    /// Start a draft for the given register and type.
    pub fn new(register_id: RegisterId, transaction_type: TransactionType) -> Self {
        Self {
            version: TRANSACTION_VERSION,
            prev_tx_id: None,
            recipients: BTreeSet::new(),
            timestamp: 0,
            metadata: TransactionMetadata::new(register_id, transaction_type),
            payloads: Vec::new(),
        }
    }

    /// Set the timestamp.
    pub fn timestamp(mut self, ts: i64) -> Self {
        self.timestamp = ts;
        self
    }

    /// Set the previous transaction in this thread.
    pub fn prev(mut self, prev: TxId) -> Self {
        self.prev_tx_id = Some(prev);
        self
    }

    /// Add a recipient wallet.
    pub fn recipient(mut self, wallet: WalletId) -> Self {
        self.recipients.insert(wallet);
        self
    }

    /// Add several recipient wallets.
    pub fn recipients(mut self, wallets: impl IntoIterator<Item = WalletId>) -> Self {
        self.recipients.extend(wallets);
        self
    }

    /// Set the blueprint id.
    pub fn blueprint(mut self, blueprint_id: impl Into<String>) -> Self {
        self.metadata.blueprint_id = Some(blueprint_id.into());
        self
    }

    /// Set the workflow instance id.
    pub fn instance(mut self, instance_id: impl Into<String>) -> Self {
        self.metadata.instance_id = Some(instance_id.into());
        self
    }

    /// Set the action id.
    pub fn action(mut self, action_id: u32) -> Self {
        self.metadata.action_id = Some(action_id);
        self
    }

    /// Add a tracking key/value pair.
    pub fn track(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.tracking.insert(key.into(), value.into());
        self
    }

    /// Append an already sealed payload.
    pub fn payload(mut self, payload: Payload) -> Self {
        self.payloads.push(payload);
        self
    }

    /// Override the schema version.
    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Sign the draft with the sender's key.
    ///
    /// The signature covers the double SHA-256 digest of the canonical
    /// encoding, and the digest becomes the transaction id, so signing the
    /// same draft with the same key always yields the same transaction.
    pub fn sign(self, keypair: &Keypair) -> Transaction {
        let sender = keypair.public_key();
        let bytes = canonical_transaction_bytes(
            self.version,
            &sender,
            &self.recipients,
            self.timestamp,
            self.prev_tx_id.as_ref(),
            &self.metadata,
            &self.payloads,
        );
        let digest = Sha256Hash::double(&bytes);
        let signature = keypair.sign(digest.as_bytes());

        Transaction {
            tx_id: TxId(digest.0),
            prev_tx_id: self.prev_tx_id,
            version: self.version,
            sender_wallet: WalletId::from_public_key(&sender),
            recipient_wallets: self.recipients,
            timestamp: self.timestamp,
            metadata: self.metadata,
            payloads: self.payloads,
            signature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(register_id: RegisterId) -> TransactionDraft {
        TransactionDraft::new(register_id, TransactionType::Action)
            .timestamp(1_736_870_400_000)
            .recipient(WalletId::new("recipient-a"))
            .blueprint("bp-1")
            .instance("inst-1")
            .action(2)
            .track("step", "review")
    }

    #[test]
    fn test_transaction_type_roundtrip() {
        for kind in [
            TransactionType::Action,
            TransactionType::Rejection,
            TransactionType::Production,
            TransactionType::Participant,
            TransactionType::Control,
        ] {
            assert_eq!(TransactionType::from_u16(kind.to_u16()), Some(kind));
        }
        assert_eq!(TransactionType::from_u16(0), None);
    }

    #[test]
    fn test_sign_is_deterministic() {
        let keypair = Keypair::from_seed(&[0x42; 32]);
        let register_id = RegisterId::from_bytes([1; 16]);

        let t1 = draft(register_id).sign(&keypair);
        let t2 = draft(register_id).sign(&keypair);

        assert_eq!(t1.tx_id, t2.tx_id);
        assert_eq!(t1.signature, t2.signature);
        assert_eq!(t1.sender_wallet, WalletId::from_public_key(&keypair.public_key()));
    }

    #[test]
    fn test_tx_id_is_digest() {
        let keypair = Keypair::from_seed(&[0x42; 32]);
        let tx = draft(RegisterId::from_bytes([1; 16])).sign(&keypair);
        assert_eq!(tx.tx_id.0, tx.compute_digest().0);
    }

    #[test]
    fn test_different_content_different_id() {
        let keypair = Keypair::from_seed(&[0x42; 32]);
        let register_id = RegisterId::from_bytes([1; 16]);

        let t1 = draft(register_id).sign(&keypair);
        let t2 = draft(register_id).track("step", "approve").sign(&keypair);
        let t3 = draft(register_id).prev(t1.tx_id).sign(&keypair);

        assert_ne!(t1.tx_id, t2.tx_id);
        assert_ne!(t1.tx_id, t3.tx_id);
        assert!(t1.is_thread_root());
        assert!(!t3.is_thread_root());
    }
}
