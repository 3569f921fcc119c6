//! PayloadCodec: builds and opens multi-recipient payload envelopes.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

use register_ledger_core::{CipherSuite, Payload, PayloadFlags, Sha256Hash, WalletId};

use crate::challenge::{unwrap_key, wrap_key};
use crate::compression::{decompress, maybe_compress};
use crate::crypto::{ContentKey, PayloadNonce, X25519PublicKey, X25519StaticSecret};
use crate::error::{PayloadError, Result};

/// Payload codec settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PayloadCodecConfig {
    /// Try zstd before encrypting.
    pub compress: bool,

    /// zstd level used when compressing.
    pub compression_level: i32,

    /// Plaintexts shorter than this are never compressed.
    pub min_compress_size: usize,
}

impl Default for PayloadCodecConfig {
    fn default() -> Self {
        Self {
            compress: true,
            compression_level: 3,
            min_compress_size: 64,
        }
    }
}

/// A wallet and the X25519 key its payloads are wrapped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub wallet: WalletId,
    pub public_key: X25519PublicKey,
}

impl Recipient {
    pub fn new(wallet: WalletId, public_key: X25519PublicKey) -> Self {
        Self { wallet, public_key }
    }
}

/// Seals plaintext into encrypted payloads and opens them again.
#[derive(Debug, Clone, Default)]
pub struct PayloadCodec {
    config: PayloadCodecConfig,
}

impl PayloadCodec {
    /// Create a codec with the given settings.
    pub fn new(config: PayloadCodecConfig) -> Self {
        Self { config }
    }

    /// Get the codec settings.
    pub fn config(&self) -> &PayloadCodecConfig {
        &self.config
    }

    /// Encrypt `plaintext` for every recipient.
    ///
    /// The content hash is taken over the original plaintext. A fresh content
    /// key and nonce are drawn for each payload, and the key is wrapped once
    /// per recipient.
    pub fn seal(&self, plaintext: &[u8], recipients: &[Recipient]) -> Result<Payload> {
        if recipients.is_empty() {
            return Err(PayloadError::NoRecipients);
        }

        let mut wallets = BTreeSet::new();
        for r in recipients {
            if !wallets.insert(r.wallet.clone()) {
                return Err(PayloadError::DuplicateRecipient(r.wallet.to_string()));
            }
        }

        let content_hash = Sha256Hash::hash(plaintext);

        let (body, compression) = if self.config.compress {
            maybe_compress(
                plaintext,
                self.config.compression_level,
                self.config.min_compress_size,
            )?
        } else {
            (plaintext.to_vec(), register_ledger_core::Compression::None)
        };

        let key = ContentKey::generate();
        let nonce = PayloadNonce::generate();
        let ciphertext = key.encrypt(&body, &nonce)?;

        let challenges = recipients
            .iter()
            .map(|r| wrap_key(&key, &r.wallet, &r.public_key))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            size = plaintext.len(),
            sealed = ciphertext.len(),
            recipients = recipients.len(),
            ?compression,
            "sealed payload"
        );

        Ok(Payload {
            recipients: wallets,
            size: plaintext.len() as u64,
            content_hash,
            ciphertext: Bytes::from(ciphertext),
            iv: nonce.0,
            flags: PayloadFlags {
                compression,
                cipher: CipherSuite::ChaCha20Poly1305,
            },
            challenges,
        })
    }

    /// Decrypt a payload as `wallet`, using the wallet's X25519 secret.
    ///
    /// Errors are distinct by cause: no challenge for the wallet, a challenge
    /// that does not open with this secret, and a body that fails
    /// authentication or does not hash back to `content_hash`.
    pub fn open(
        &self,
        payload: &Payload,
        secret: &X25519StaticSecret,
        wallet: &WalletId,
    ) -> Result<Vec<u8>> {
        let challenge = payload
            .challenge_for(wallet)
            .ok_or_else(|| PayloadError::NoMatchingChallenge(wallet.to_string()))?;

        let key = unwrap_key(challenge, secret)?;

        let body = key
            .decrypt(&payload.ciphertext, &PayloadNonce(payload.iv))
            .ok_or_else(|| PayloadError::IntegrityViolation("ciphertext failed authentication".into()))?;

        let plaintext = decompress(body, payload.flags.compression, payload.size)
            .map_err(|e| PayloadError::IntegrityViolation(e.to_string()))?;

        if plaintext.len() as u64 != payload.size {
            return Err(PayloadError::IntegrityViolation(format!(
                "size mismatch: expected {}, got {}",
                payload.size,
                plaintext.len()
            )));
        }

        if Sha256Hash::hash(&plaintext) != payload.content_hash {
            return Err(PayloadError::IntegrityViolation(
                "content hash mismatch".into(),
            ));
        }

        Ok(plaintext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Holder {
        wallet: WalletId,
        secret: X25519StaticSecret,
    }

    impl Holder {
        fn new(name: &str) -> Self {
            Self {
                wallet: WalletId::new(name),
                secret: X25519StaticSecret::generate(),
            }
        }

        fn recipient(&self) -> Recipient {
            Recipient::new(self.wallet.clone(), self.secret.public_key())
        }
    }

    #[test]
    fn test_every_recipient_can_open() {
        let codec = PayloadCodec::default();
        let holders = [Holder::new("a"), Holder::new("b"), Holder::new("c")];
        let recipients: Vec<_> = holders.iter().map(Holder::recipient).collect();

        let payload = codec.seal(b"quarterly figures", &recipients).unwrap();
        assert_eq!(payload.challenges.len(), 3);
        assert!(payload.challenges_match_recipients());

        for h in &holders {
            assert_eq!(
                codec.open(&payload, &h.secret, &h.wallet).unwrap(),
                b"quarterly figures"
            );
        }
    }

    #[test]
    fn test_outsider_has_no_challenge() {
        let codec = PayloadCodec::default();
        let a = Holder::new("a");
        let outsider = Holder::new("z");
        let payload = codec.seal(b"data", &[a.recipient()]).unwrap();

        let err = codec
            .open(&payload, &outsider.secret, &outsider.wallet)
            .unwrap_err();
        assert!(matches!(err, PayloadError::NoMatchingChallenge(_)));
    }

    #[test]
    fn test_wrong_secret_is_unwrap_failure() {
        let codec = PayloadCodec::default();
        let a = Holder::new("a");
        let payload = codec.seal(b"data", &[a.recipient()]).unwrap();

        let err = codec
            .open(&payload, &X25519StaticSecret::generate(), &a.wallet)
            .unwrap_err();
        assert!(matches!(err, PayloadError::KeyUnwrapFailed(_)));
    }

    #[test]
    fn test_ciphertext_tamper_is_integrity_violation() {
        let codec = PayloadCodec::default();
        let a = Holder::new("a");
        let mut payload = codec.seal(b"data to protect", &[a.recipient()]).unwrap();

        let mut bytes = payload.ciphertext.to_vec();
        bytes[0] ^= 0x01;
        payload.ciphertext = Bytes::from(bytes);

        let err = codec.open(&payload, &a.secret, &a.wallet).unwrap_err();
        assert!(matches!(err, PayloadError::IntegrityViolation(_)));
    }

    #[test]
    fn test_content_hash_tamper_is_integrity_violation() {
        let codec = PayloadCodec::default();
        let a = Holder::new("a");
        let mut payload = codec.seal(b"data", &[a.recipient()]).unwrap();
        payload.content_hash = Sha256Hash::hash(b"other");

        let err = codec.open(&payload, &a.secret, &a.wallet).unwrap_err();
        assert!(matches!(err, PayloadError::IntegrityViolation(_)));
    }

    #[test]
    fn test_large_payload_is_compressed() {
        let codec = PayloadCodec::default();
        let a = Holder::new("a");
        let plaintext = "row,row,row,".repeat(500).into_bytes();

        let payload = codec.seal(&plaintext, &[a.recipient()]).unwrap();
        assert_eq!(payload.flags.compression, register_ledger_core::Compression::Zstd);
        assert!(payload.ciphertext.len() < plaintext.len());
        assert_eq!(payload.size, plaintext.len() as u64);
        assert_eq!(codec.open(&payload, &a.secret, &a.wallet).unwrap(), plaintext);
    }

    #[test]
    fn test_compression_can_be_disabled() {
        let codec = PayloadCodec::new(PayloadCodecConfig {
            compress: false,
            ..Default::default()
        });
        let a = Holder::new("a");
        let payload = codec.seal(&vec![0u8; 4096], &[a.recipient()]).unwrap();
        assert_eq!(payload.flags.compression, register_ledger_core::Compression::None);
    }

    #[test]
    fn test_recipient_rules() {
        let codec = PayloadCodec::default();
        assert!(matches!(
            codec.seal(b"x", &[]).unwrap_err(),
            PayloadError::NoRecipients
        ));

        let a = Holder::new("a");
        assert!(matches!(
            codec.seal(b"x", &[a.recipient(), a.recipient()]).unwrap_err(),
            PayloadError::DuplicateRecipient(_)
        ));
    }

    #[test]
    fn test_empty_plaintext() {
        let codec = PayloadCodec::default();
        let a = Holder::new("a");
        let payload = codec.seal(b"", &[a.recipient()]).unwrap();
        assert_eq!(payload.size, 0);
        assert!(codec.open(&payload, &a.secret, &a.wallet).unwrap().is_empty());
    }

    #[test]
    fn test_understated_size_stops_inflation() {
        let codec = PayloadCodec::default();
        let holder = Holder::new("a");
        let mut payload = codec.seal(&vec![0u8; 4 << 20], &[holder.recipient()]).unwrap();
        assert_eq!(payload.flags.compression, register_ledger_core::Compression::Zstd);
        payload.size = 16;

        let err = codec.open(&payload, &holder.secret, &holder.wallet).unwrap_err();
        assert!(
            matches!(&err, PayloadError::IntegrityViolation(m) if m.contains("declared size of 16")),
            "{err}"
        );
    }
}
