//! TransactionSigner: canonicalizes, signs and verifies transactions.

use register_ledger_core::{
    validate_transaction, Keypair, Transaction, TransactionDraft, ValidationError, WalletId,
};
use register_ledger_payload::{PayloadCodec, PayloadError, Recipient, X25519StaticSecret};

use crate::error::Result;

/// Signs drafts and verifies signed transactions.
///
/// Holds the payload codec so a transaction and its payloads can be built
/// in one step, and so a recipient can check payload hashes while verifying.
#[derive(Debug, Clone, Default)]
pub struct TransactionSigner {
    codec: PayloadCodec,
}

impl TransactionSigner {
    pub fn new(codec: PayloadCodec) -> Self {
        Self { codec }
    }

    /// Get the payload codec.
    pub fn codec(&self) -> &PayloadCodec {
        &self.codec
    }

    /// Sign a draft. The same draft and key always give the same transaction.
    pub fn sign(&self, draft: TransactionDraft, key: &Keypair) -> Transaction {
        draft.sign(key)
    }

    /// Seal each plaintext for its recipients, add them to the draft and sign.
    ///
    /// Every payload recipient is also added to the transaction's recipients.
    pub fn build<'a>(
        &self,
        mut draft: TransactionDraft,
        payloads: impl IntoIterator<Item = (&'a [u8], &'a [Recipient])>,
        key: &Keypair,
    ) -> Result<Transaction> {
        for (plaintext, recipients) in payloads {
            let payload = self.codec.seal(plaintext, recipients)?;
            draft = draft
                .recipients(payload.recipients.iter().cloned())
                .payload(payload);
        }
        Ok(draft.sign(key))
    }

    /// Check signature, id and structure.
    ///
    /// Payload contents are opaque here; see [`TransactionSigner::verify_as`].
    pub fn verify(&self, tx: &Transaction) -> std::result::Result<(), ValidationError> {
        validate_transaction(tx)
    }

    /// Verify as the holder of `wallet`'s decryption key.
    ///
    /// After [`TransactionSigner::verify`], every payload addressed to the
    /// wallet is opened and its plaintext hash compared with the signed
    /// content hash. Returns the number of payloads checked.
    pub fn verify_as(
        &self,
        tx: &Transaction,
        wallet: &WalletId,
        secret: &X25519StaticSecret,
    ) -> Result<usize> {
        self.verify(tx)?;

        let mut checked = 0;
        for (index, payload) in tx.payloads.iter().enumerate() {
            if !payload.is_recipient(wallet) {
                continue;
            }
            match self.codec.open(payload, secret, wallet) {
                Ok(_) => checked += 1,
                Err(PayloadError::IntegrityViolation(_)) => {
                    return Err(ValidationError::PayloadHashMismatch { index }.into());
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(checked)
    }
}
