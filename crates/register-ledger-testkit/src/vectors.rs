//! Golden test vectors for deterministic verification.
//!
//! These vectors pin the canonical transaction encoding so that other
//! implementations of the signing document can be checked against ours.

use register_ledger_core::{
    canonical_transaction_bytes, Keypair, RegisterId, Transaction, TransactionDraft,
    TransactionType, WalletId,
};

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Seed of the sender's signing key.
    pub seed: [u8; 32],
    /// Seed of the single recipient's signing key.
    pub recipient_seed: [u8; 32],
    pub register_id: [u8; 16],
    pub transaction_type: TransactionType,
    pub instance_id: Option<&'static str>,
    pub tracking: &'static [(&'static str, &'static str)],
    /// Timestamp (Unix ms).
    pub timestamp: i64,
    /// Expected tx id (hex).
    pub expected_tx_id: &'static str,
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "Action with instance",
            seed: [0x42; 32],
            recipient_seed: [0x43; 32],
            register_id: [0x11; 16],
            transaction_type: TransactionType::Action,
            instance_id: Some("instance-1"),
            tracking: &[],
            timestamp: 1_736_870_400_000, // 2025-01-14T16:00:00Z
            expected_tx_id: "220037dc9b33245760abd8088a2c6e1cd1cc707d89a46c705819e49a7ae6dd33",
        },
        GoldenVector {
            name: "Control with tracking",
            seed: [0x42; 32],
            recipient_seed: [0x44; 32],
            register_id: [0x11; 16],
            transaction_type: TransactionType::Control,
            instance_id: None,
            tracking: &[("batch", "7"), ("origin", "import")],
            timestamp: 1_736_870_401_000,
            expected_tx_id: "fda9fa44b1c23e696285d4cafe8f9f957efff9acd2ecf18ade3b0617275dab49",
        },
        GoldenVector {
            name: "Zero timestamp production",
            seed: [0x00; 32],
            recipient_seed: [0x01; 32],
            register_id: [0x00; 16],
            transaction_type: TransactionType::Production,
            instance_id: None,
            tracking: &[],
            timestamp: 0,
            expected_tx_id: "729a62105c67dafbf533cfbb02d4305d8079dfdd68f38fac38f4fbee5fe9f456",
        },
    ]
}

/// Sign the transaction described by a golden vector.
pub fn generate_transaction_from_vector(vector: &GoldenVector) -> Transaction {
    let keypair = Keypair::from_seed(&vector.seed);
    let recipient = WalletId::from_public_key(&Keypair::from_seed(&vector.recipient_seed).public_key());

    let mut draft = TransactionDraft::new(
        RegisterId::from_bytes(vector.register_id),
        vector.transaction_type,
    )
    .timestamp(vector.timestamp)
    .recipient(recipient);

    if let Some(instance) = vector.instance_id {
        draft = draft.instance(instance);
    }
    for (key, value) in vector.tracking {
        draft = draft.track(*key, *value);
    }

    draft.sign(&keypair)
}

/// Canonical signing document of a vector, hex encoded.
pub fn canonical_hex(vector: &GoldenVector) -> String {
    let tx = generate_transaction_from_vector(vector);
    hex::encode(canonical_transaction_bytes(
        tx.version,
        &Keypair::from_seed(&vector.seed).public_key(),
        &tx.recipient_wallets,
        tx.timestamp,
        tx.prev_tx_id.as_ref(),
        &tx.metadata,
        &tx.payloads,
    ))
}

/// Verify all golden vectors produce consistent tx ids.
///
/// Returns `(name, matches, computed hex)` per vector.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .iter()
        .map(|v| {
            let hex = generate_transaction_from_vector(v).tx_id.to_hex();
            let matches = hex == v.expected_tx_id;
            (v.name.to_string(), matches, hex)
        })
        .collect()
}
