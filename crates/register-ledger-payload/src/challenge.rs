//! Per-recipient key wrapping.
//!
//! Each recipient of a payload gets a challenge: the payload's content key
//! encrypted under a key agreed between a fresh ephemeral X25519 key and the
//! recipient's static key. The wrap key is derived with the recipient's
//! wallet id as context, so a challenge cannot be re-addressed.

use register_ledger_core::{Challenge, WalletId};

use crate::crypto::{
    ephemeral_agreement, ContentKey, PayloadNonce, X25519PublicKey, X25519StaticSecret,
};
use crate::error::{PayloadError, Result};

/// Wrap `content_key` for one recipient.
pub fn wrap_key(
    content_key: &ContentKey,
    wallet: &WalletId,
    recipient_public: &X25519PublicKey,
) -> Result<Challenge> {
    let (ephemeral_public, shared) = ephemeral_agreement(recipient_public);
    let wrap = shared.wrap_key_for(wallet.as_str().as_bytes());

    let nonce = PayloadNonce::generate();
    let encrypted_key = wrap.encrypt(content_key.as_bytes(), &nonce)?;

    Ok(Challenge {
        wallet: wallet.clone(),
        ephemeral_public: ephemeral_public.0,
        nonce: nonce.0,
        encrypted_key,
    })
}

/// Recover the content key from a challenge with the recipient's secret.
pub fn unwrap_key(challenge: &Challenge, secret: &X25519StaticSecret) -> Result<ContentKey> {
    let unwrap_failed = || PayloadError::KeyUnwrapFailed(challenge.wallet.to_string());
    let wrap = secret
        .agree(&X25519PublicKey(challenge.ephemeral_public))
        .wrap_key_for(challenge.wallet.as_str().as_bytes());

    let key: [u8; 32] = wrap
        .decrypt(&challenge.encrypted_key, &PayloadNonce(challenge.nonce))
        .ok_or_else(unwrap_failed)?
        .try_into()
        .map_err(|_| unwrap_failed())?;
    Ok(ContentKey::from_bytes(key))
}
