//! Key agreement and symmetric encryption for payload envelopes.
//!
//! X25519 agrees a shared secret per recipient, BLAKE3 derives a wrap key from
//! it, and ChaCha20-Poly1305 encrypts both payload bodies and wrapped keys.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};

use crate::error::{PayloadError, Result};

const WRAP_KEY_CONTEXT: &str = "register-ledger payload v1 key wrap";

/// The X25519 key a wallet publishes so payloads can be addressed to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct X25519PublicKey(pub [u8; 32]);

impl From<[u8; 32]> for X25519PublicKey {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl From<&X25519PublicKey> for PublicKey {
    fn from(key: &X25519PublicKey) -> Self {
        PublicKey::from(key.0)
    }
}

/// A wallet's long-lived X25519 secret. Only used to open challenges.
pub struct X25519StaticSecret(StaticSecret);

impl X25519StaticSecret {
    pub fn generate() -> Self {
        Self(StaticSecret::random_from_rng(rand::thread_rng()))
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(StaticSecret::from(bytes))
    }

    pub fn public_key(&self) -> X25519PublicKey {
        X25519PublicKey(PublicKey::from(&self.0).to_bytes())
    }

    /// Agree a secret with the sender's ephemeral key.
    pub fn agree(&self, ephemeral: &X25519PublicKey) -> SharedKey {
        SharedKey(self.0.diffie_hellman(&ephemeral.into()).to_bytes())
    }
}

/// Agree a secret with `recipient` using a fresh ephemeral key.
///
/// Returns the ephemeral public half, which travels in the challenge.
pub fn ephemeral_agreement(recipient: &X25519PublicKey) -> (X25519PublicKey, SharedKey) {
    let secret = EphemeralSecret::random_from_rng(rand::thread_rng());
    let public = X25519PublicKey(PublicKey::from(&secret).to_bytes());
    (public, SharedKey(secret.diffie_hellman(&recipient.into()).to_bytes()))
}

/// Raw X25519 output. Never used as a key directly.
pub struct SharedKey([u8; 32]);

impl SharedKey {
    /// Derive the wrap key for one recipient, bound to its wallet id.
    pub fn wrap_key_for(&self, wallet: &[u8]) -> ContentKey {
        let mut hasher = blake3::Hasher::new_derive_key(WRAP_KEY_CONTEXT);
        hasher.update(&self.0);
        hasher.update(wallet);
        ContentKey(*hasher.finalize().as_bytes())
    }
}

/// A ChaCha20-Poly1305 key: a payload's content key or a recipient's wrap key.
#[derive(Clone)]
pub struct ContentKey([u8; 32]);

impl ContentKey {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    fn cipher(&self) -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new(Key::from_slice(&self.0))
    }

    pub fn encrypt(&self, plaintext: &[u8], nonce: &PayloadNonce) -> Result<Vec<u8>> {
        self.cipher()
            .encrypt(Nonce::from_slice(&nonce.0), plaintext)
            .map_err(|e| PayloadError::EncryptionError(e.to_string()))
    }

    /// `None` when the tag does not authenticate.
    pub fn decrypt(&self, ciphertext: &[u8], nonce: &PayloadNonce) -> Option<Vec<u8>> {
        self.cipher()
            .decrypt(Nonce::from_slice(&nonce.0), ciphertext)
            .ok()
    }
}

impl std::fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ContentKey(..)")
    }
}

/// 96-bit ChaCha20-Poly1305 nonce, fresh per encryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadNonce(pub [u8; 12]);

impl PayloadNonce {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ephemeral_agreement_matches_recipient() {
        let bob = X25519StaticSecret::generate();
        let (ephemeral, sender_side) = ephemeral_agreement(&bob.public_key());
        let bob_side = bob.agree(&ephemeral);

        assert_eq!(
            sender_side.wrap_key_for(b"bob").as_bytes(),
            bob_side.wrap_key_for(b"bob").as_bytes()
        );
    }

    #[test]
    fn test_encrypt_decrypt() {
        let key = ContentKey::generate();
        let nonce = PayloadNonce::generate();

        let ciphertext = key.encrypt(b"pallet manifest", &nonce).unwrap();
        assert_eq!(ciphertext.len(), b"pallet manifest".len() + 16);
        assert_eq!(key.decrypt(&ciphertext, &nonce).unwrap(), b"pallet manifest");
        assert!(key.decrypt(&ciphertext, &PayloadNonce::generate()).is_none());
    }

    #[test]
    fn test_decrypt_wrong_key_fails() {
        let nonce = PayloadNonce::generate();
        let ciphertext = ContentKey::generate().encrypt(b"secret", &nonce).unwrap();
        assert!(ContentKey::generate().decrypt(&ciphertext, &nonce).is_none());
    }

    #[test]
    fn test_wrap_key_bound_to_wallet() {
        let shared = SharedKey([0x42; 32]);
        assert_eq!(
            shared.wrap_key_for(b"wallet-a").as_bytes(),
            shared.wrap_key_for(b"wallet-a").as_bytes()
        );
        assert_ne!(
            shared.wrap_key_for(b"wallet-a").as_bytes(),
            shared.wrap_key_for(b"wallet-b").as_bytes()
        );
    }
}
