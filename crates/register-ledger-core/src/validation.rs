//! Transaction and docket validation: signature verification and structural checks.
//!
//! Payload plaintext hashes can only be checked by a holder of a recipient
//! key, so they are verified by the payload codec, not here.

use std::collections::HashSet;

use crate::docket::{Docket, DocketState};
use crate::error::ValidationError;
use crate::transaction::{Transaction, MAX_PAYLOADS, TRANSACTION_VERSION};

/// Validate a transaction's signature, id and structure.
///
/// Checks run in this order:
/// 1. Signature over the recomputed digest, using the key the sender wallet encodes
/// 2. `tx_id` equals the digest
/// 3. Structure (version, recipients, payload count, challenges)
///
/// Any change to a signed field after signing fails at step 1.
pub fn validate_transaction(tx: &Transaction) -> Result<(), ValidationError> {
    let sender = tx
        .sender_wallet
        .public_key()
        .map_err(|_| ValidationError::SignatureInvalid)?;

    let digest = tx.compute_digest();
    sender
        .verify(digest.as_bytes(), &tx.signature)
        .map_err(|_| ValidationError::SignatureInvalid)?;

    if tx.tx_id.0 != digest.0 {
        return Err(ValidationError::TxIdMismatch);
    }

    validate_transaction_structure(tx)
}

/// Validate transaction structure without signature verification.
pub fn validate_transaction_structure(tx: &Transaction) -> Result<(), ValidationError> {
    if tx.version != TRANSACTION_VERSION {
        return Err(ValidationError::UnsupportedVersion(tx.version));
    }

    if tx.recipient_wallets.is_empty() {
        return Err(ValidationError::NoRecipients);
    }

    if tx.payloads.len() > MAX_PAYLOADS {
        return Err(ValidationError::TooManyPayloads(tx.payloads.len()));
    }

    if tx.prev_tx_id == Some(tx.tx_id) {
        return Err(ValidationError::StructuralError(
            "transaction references itself".into(),
        ));
    }

    for (index, payload) in tx.payloads.iter().enumerate() {
        if payload.recipients.is_empty() || !payload.challenges_match_recipients() {
            return Err(ValidationError::ChallengeMismatch {
                index,
                challenges: payload.challenges.len(),
                recipients: payload.recipients.len(),
            });
        }
    }

    Ok(())
}

/// Validate a docket candidate before it is offered for sealing.
///
/// The candidate must hold at least one transaction, list each transaction
/// once, carry a hash matching its contents and not be in a terminal state.
pub fn validate_docket_candidate(docket: &Docket) -> Result<(), ValidationError> {
    if docket.id == 0 {
        return Err(ValidationError::InvalidDocket("docket id 0 is reserved".into()));
    }

    if docket.transaction_ids.is_empty() {
        return Err(ValidationError::InvalidDocket("no transactions".into()));
    }

    let mut seen = HashSet::with_capacity(docket.transaction_ids.len());
    for tx_id in &docket.transaction_ids {
        if !seen.insert(tx_id) {
            return Err(ValidationError::InvalidDocket(format!(
                "transaction {tx_id} listed twice"
            )));
        }
    }

    if matches!(docket.state, DocketState::Rejected | DocketState::Sealed) {
        return Err(ValidationError::InvalidDocket(format!(
            "candidate is already {:?}",
            docket.state
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{Keypair, Sha256Hash};
    use crate::docket::{DocketBuilder, GENESIS_HASH};
    use crate::payload::{Challenge, Payload, PayloadFlags};
    use crate::transaction::{TransactionDraft, TransactionType};
    use crate::types::{RegisterId, TxId, WalletId};
    use bytes::Bytes;

    fn signed() -> Transaction {
        TransactionDraft::new(RegisterId::from_bytes([1; 16]), TransactionType::Action)
            .timestamp(1_736_870_400_000)
            .recipient(WalletId::new("r1"))
            .track("k", "v")
            .sign(&Keypair::from_seed(&[0x42; 32]))
    }

    #[test]
    fn test_valid_transaction() {
        validate_transaction(&signed()).unwrap();
    }

    #[test]
    fn test_tampered_fields_fail_signature() {
        let mut tx = signed();
        tx.timestamp += 1;
        assert_eq!(validate_transaction(&tx), Err(ValidationError::SignatureInvalid));

        let mut tx = signed();
        tx.version = 2;
        assert_eq!(validate_transaction(&tx), Err(ValidationError::SignatureInvalid));

        let mut tx = signed();
        tx.recipient_wallets.insert(WalletId::new("intruder"));
        assert_eq!(validate_transaction(&tx), Err(ValidationError::SignatureInvalid));

        let mut tx = signed();
        tx.metadata.tracking.insert("k".into(), "w".into());
        assert_eq!(validate_transaction(&tx), Err(ValidationError::SignatureInvalid));
    }

    #[test]
    fn test_foreign_sender_fails_signature() {
        let mut tx = signed();
        tx.sender_wallet = WalletId::from_public_key(&Keypair::from_seed(&[1; 32]).public_key());
        assert_eq!(validate_transaction(&tx), Err(ValidationError::SignatureInvalid));

        tx.sender_wallet = WalletId::new("garbage");
        assert_eq!(validate_transaction(&tx), Err(ValidationError::SignatureInvalid));
    }

    #[test]
    fn test_tx_id_mismatch() {
        let mut tx = signed();
        tx.tx_id = TxId::from_bytes([0; 32]);
        assert_eq!(validate_transaction(&tx), Err(ValidationError::TxIdMismatch));
    }

    #[test]
    fn test_structural_rules() {
        let keypair = Keypair::from_seed(&[0x42; 32]);
        let register = RegisterId::from_bytes([1; 16]);

        let no_recipients = TransactionDraft::new(register, TransactionType::Action).sign(&keypair);
        assert_eq!(
            validate_transaction(&no_recipients),
            Err(ValidationError::NoRecipients)
        );

        let v2 = TransactionDraft::new(register, TransactionType::Action)
            .recipient(WalletId::new("r1"))
            .version(2)
            .sign(&keypair);
        assert_eq!(
            validate_transaction(&v2),
            Err(ValidationError::UnsupportedVersion(2))
        );

        let orphan_payload = Payload {
            recipients: [WalletId::new("r1"), WalletId::new("r2")].into_iter().collect(),
            size: 1,
            content_hash: Sha256Hash::hash(b"x"),
            ciphertext: Bytes::from_static(b"y"),
            iv: [0; 12],
            flags: PayloadFlags::default(),
            challenges: vec![Challenge {
                wallet: WalletId::new("r1"),
                ephemeral_public: [0; 32],
                nonce: [0; 12],
                encrypted_key: vec![0; 48],
            }],
        };
        let mismatched = TransactionDraft::new(register, TransactionType::Action)
            .recipient(WalletId::new("r1"))
            .payload(orphan_payload)
            .sign(&keypair);
        assert_eq!(
            validate_transaction(&mismatched),
            Err(ValidationError::ChallengeMismatch {
                index: 0,
                challenges: 1,
                recipients: 2
            })
        );
    }

    #[test]
    fn test_docket_candidate_rules() {
        let register = RegisterId::from_bytes([1; 16]);
        let a = TxId::from_bytes([1; 32]);

        let ok = DocketBuilder::new(register, 1, GENESIS_HASH).transaction(a).build();
        validate_docket_candidate(&ok).unwrap();

        let empty = DocketBuilder::new(register, 1, GENESIS_HASH).build();
        assert!(validate_docket_candidate(&empty).is_err());

        let dup = DocketBuilder::new(register, 1, GENESIS_HASH)
            .transaction(a)
            .transaction(a)
            .build();
        assert!(validate_docket_candidate(&dup).is_err());

        let mut rejected = ok.clone();
        rejected.state = DocketState::Rejected;
        assert!(validate_docket_candidate(&rejected).is_err());
    }
}
