//! # Register Ledger Payload
//!
//! Multi-recipient encrypted payload envelopes.
//!
//! ## Model
//!
//! A payload body is encrypted once under a random content key with
//! ChaCha20-Poly1305. The content key is then wrapped for every recipient
//! through an ephemeral X25519 agreement with that recipient's static key,
//! producing one [`Challenge`](register_ledger_core::Challenge) per wallet.
//!
//! The plaintext's SHA-256 is recorded before compression and encryption,
//! so a recipient who opens the payload can prove it got back exactly what
//! the sender hashed.

pub mod challenge;
pub mod codec;
pub mod compression;
pub mod crypto;
pub mod error;

pub use codec::{PayloadCodec, PayloadCodecConfig, Recipient};
pub use crypto::{X25519PublicKey, X25519StaticSecret};
pub use error::{PayloadError, Result};
