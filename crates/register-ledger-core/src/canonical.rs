//! Deterministic CBOR documents behind transaction ids and docket hashes.
//!
//! Every document is an integer-keyed map written under the RFC 8949 core
//! deterministic rules: shortest-form heads, definite lengths only, entries
//! ordered by their encoded key bytes. Timestamps are i64 milliseconds, so no
//! floats ever appear.
//!
//! The transaction layout below is frozen for `TRANSACTION_VERSION = 1`.
//! Changing a key or a field encoding changes every transaction id.

use ciborium::value::Value;
use std::collections::{BTreeMap, BTreeSet};

use crate::crypto::{Ed25519PublicKey, Sha256Hash};
use crate::payload::Payload;
use crate::transaction::TransactionMetadata;
use crate::types::{RegisterId, TxId, WalletId};

/// Transaction signing document keys. All below 24, so each is one byte.
mod tx_keys {
    pub const VERSION: u64 = 0;
    pub const SENDER: u64 = 1;
    pub const RECIPIENTS: u64 = 2;
    pub const TIMESTAMP: u64 = 3;
    pub const PREV_TX_ID: u64 = 4;
    pub const METADATA: u64 = 5;
    pub const PAYLOADS: u64 = 6;
}

mod metadata_keys {
    pub const REGISTER_ID: u64 = 0;
    pub const TYPE: u64 = 1;
    pub const BLUEPRINT_ID: u64 = 2;
    pub const INSTANCE_ID: u64 = 3;
    pub const ACTION_ID: u64 = 4;
    pub const TRACKING: u64 = 5;
}

mod payload_keys {
    pub const RECIPIENTS: u64 = 0;
    pub const SIZE: u64 = 1;
    pub const CONTENT_HASH: u64 = 2;
    pub const COMPRESSION: u64 = 3;
    pub const CIPHER: u64 = 4;
    pub const IV: u64 = 5;
    pub const CIPHERTEXT_HASH: u64 = 6;
}

mod docket_keys {
    pub const ID: u64 = 0;
    pub const REGISTER_ID: u64 = 1;
    pub const PREVIOUS_HASH: u64 = 2;
    pub const TRANSACTION_IDS: u64 = 3;
    pub const TIMESTAMP: u64 = 4;
    pub const METADATA: u64 = 5;
}

/// Encode the signable fields of a transaction to canonical CBOR bytes.
///
/// The signature and the transaction id are not part of the document:
/// the id is derived from it.
pub fn canonical_transaction_bytes(
    version: u32,
    sender: &Ed25519PublicKey,
    recipients: &BTreeSet<WalletId>,
    timestamp: i64,
    prev_tx_id: Option<&TxId>,
    metadata: &TransactionMetadata,
    payloads: &[Payload],
) -> Vec<u8> {
    let prev_value = prev_tx_id.map_or(Value::Null, |id| Value::Bytes(id.0.to_vec()));

    let entries = vec![
        (key(tx_keys::VERSION), Value::Integer(version.into())),
        (key(tx_keys::SENDER), Value::Bytes(sender.0.to_vec())),
        (key(tx_keys::RECIPIENTS), wallets_value(recipients)),
        (key(tx_keys::TIMESTAMP), Value::Integer(timestamp.into())),
        (key(tx_keys::PREV_TX_ID), prev_value),
        (key(tx_keys::METADATA), metadata_value(metadata)),
        (
            key(tx_keys::PAYLOADS),
            Value::Array(payloads.iter().map(payload_value).collect()),
        ),
    ];

    Writer::encode(&Value::Map(entries))
}

/// Encode the hashed fields of a docket to canonical CBOR bytes.
///
/// `state` and `hash` are excluded: state moves during sealing and the hash
/// is computed over this document.
pub fn canonical_docket_bytes(
    id: u64,
    register_id: &RegisterId,
    previous_hash: &Sha256Hash,
    transaction_ids: &[TxId],
    timestamp: i64,
    metadata: &BTreeMap<String, String>,
) -> Vec<u8> {
    let entries = vec![
        (key(docket_keys::ID), Value::Integer(id.into())),
        (
            key(docket_keys::REGISTER_ID),
            Value::Text(register_id.to_hex()),
        ),
        (
            key(docket_keys::PREVIOUS_HASH),
            Value::Bytes(previous_hash.0.to_vec()),
        ),
        (
            key(docket_keys::TRANSACTION_IDS),
            Value::Array(
                transaction_ids
                    .iter()
                    .map(|id| Value::Bytes(id.0.to_vec()))
                    .collect(),
            ),
        ),
        (key(docket_keys::TIMESTAMP), Value::Integer(timestamp.into())),
        (key(docket_keys::METADATA), text_map_value(metadata)),
    ];

    Writer::encode(&Value::Map(entries))
}

fn key(k: u64) -> Value {
    Value::Integer(k.into())
}

fn optional_text(value: &Option<String>) -> Value {
    match value {
        Some(s) => Value::Text(s.clone()),
        None => Value::Null,
    }
}

fn wallets_value(wallets: &BTreeSet<WalletId>) -> Value {
    Value::Array(
        wallets
            .iter()
            .map(|w| Value::Text(w.as_str().to_string()))
            .collect(),
    )
}

fn text_map_value(map: &BTreeMap<String, String>) -> Value {
    Value::Map(
        map.iter()
            .map(|(k, v)| (Value::Text(k.clone()), Value::Text(v.clone())))
            .collect(),
    )
}

fn metadata_value(metadata: &TransactionMetadata) -> Value {
    let action = match metadata.action_id {
        Some(a) => Value::Integer(a.into()),
        None => Value::Null,
    };

    Value::Map(vec![
        (
            key(metadata_keys::REGISTER_ID),
            Value::Text(metadata.register_id.to_hex()),
        ),
        (
            key(metadata_keys::TYPE),
            Value::Integer(metadata.transaction_type.to_u16().into()),
        ),
        (
            key(metadata_keys::BLUEPRINT_ID),
            optional_text(&metadata.blueprint_id),
        ),
        (
            key(metadata_keys::INSTANCE_ID),
            optional_text(&metadata.instance_id),
        ),
        (key(metadata_keys::ACTION_ID), action),
        (
            key(metadata_keys::TRACKING),
            text_map_value(&metadata.tracking),
        ),
    ])
}

fn payload_value(payload: &Payload) -> Value {
    Value::Map(vec![
        (
            key(payload_keys::RECIPIENTS),
            wallets_value(&payload.recipients),
        ),
        (key(payload_keys::SIZE), Value::Integer(payload.size.into())),
        (
            key(payload_keys::CONTENT_HASH),
            Value::Bytes(payload.content_hash.0.to_vec()),
        ),
        (
            key(payload_keys::COMPRESSION),
            Value::Integer(payload.flags.compression.to_u8().into()),
        ),
        (
            key(payload_keys::CIPHER),
            Value::Integer(payload.flags.cipher.to_u8().into()),
        ),
        (key(payload_keys::IV), Value::Bytes(payload.iv.to_vec())),
        (
            key(payload_keys::CIPHERTEXT_HASH),
            Value::Bytes(payload.ciphertext_hash().0.to_vec()),
        ),
    ])
}

/// Deterministic CBOR output for the value kinds this module builds.
#[derive(Default)]
struct Writer {
    out: Vec<u8>,
}

impl Writer {
    fn encode(value: &Value) -> Vec<u8> {
        let mut writer = Self::default();
        writer.value(value);
        writer.out
    }

    /// Major type in the top three bits, argument in its shortest form.
    fn head(&mut self, major: u8, arg: u64) {
        let major = major << 5;
        match arg {
            0..=23 => self.out.push(major | arg as u8),
            24..=0xff => self.out.extend_from_slice(&[major | 24, arg as u8]),
            0x100..=0xffff => {
                self.out.push(major | 25);
                self.out.extend_from_slice(&(arg as u16).to_be_bytes());
            }
            0x1_0000..=0xffff_ffff => {
                self.out.push(major | 26);
                self.out.extend_from_slice(&(arg as u32).to_be_bytes());
            }
            _ => {
                self.out.push(major | 27);
                self.out.extend_from_slice(&arg.to_be_bytes());
            }
        }
    }

    fn value(&mut self, value: &Value) {
        match value {
            Value::Integer(i) => match i128::from(*i) {
                n if n < 0 => self.head(1, (-1 - n) as u64),
                n => self.head(0, n as u64),
            },
            Value::Bytes(bytes) => {
                self.head(2, bytes.len() as u64);
                self.out.extend_from_slice(bytes);
            }
            Value::Text(text) => {
                self.head(3, text.len() as u64);
                self.out.extend_from_slice(text.as_bytes());
            }
            Value::Array(items) => {
                self.head(4, items.len() as u64);
                for item in items {
                    self.value(item);
                }
            }
            Value::Map(entries) => self.map(entries),
            Value::Bool(b) => self.out.push(0xf4 | u8::from(*b)),
            Value::Null => self.out.push(0xf6),
            // Floats and tags are never built here; release builds write null.
            other => {
                debug_assert!(false, "no canonical form for {other:?}");
                self.out.push(0xf6);
            }
        }
    }

    fn map(&mut self, entries: &[(Value, Value)]) {
        let mut sorted: Vec<(Vec<u8>, &Value)> =
            entries.iter().map(|(k, v)| (Self::encode(k), v)).collect();
        sorted.sort_unstable_by(|a, b| a.0.cmp(&b.0));

        self.head(5, sorted.len() as u64);
        for (key, value) in sorted {
            self.out.extend_from_slice(&key);
            self.value(value);
        }
    }
}
