//! Proptest generators for property-based testing.

use std::collections::BTreeMap;

use proptest::prelude::*;

use register_ledger_core::{
    Keypair, RegisterId, Transaction, TransactionDraft, TransactionType, TxId, WalletId,
};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a random TxId.
pub fn tx_id() -> impl Strategy<Value = TxId> {
    any::<[u8; 32]>().prop_map(TxId::from_bytes)
}

/// Generate a random RegisterId.
pub fn register_id() -> impl Strategy<Value = RegisterId> {
    any::<[u8; 16]>().prop_map(RegisterId::from_bytes)
}

/// Generate a wallet id backed by a real public key.
pub fn wallet_id() -> impl Strategy<Value = WalletId> {
    keypair().prop_map(|kp| WalletId::from_public_key(&kp.public_key()))
}

/// Generate a reasonable timestamp.
pub fn timestamp() -> impl Strategy<Value = i64> {
    0i64..=4_102_444_800_000i64
}

/// Generate a TransactionType.
pub fn transaction_type() -> impl Strategy<Value = TransactionType> {
    prop_oneof![
        Just(TransactionType::Action),
        Just(TransactionType::Rejection),
        Just(TransactionType::Production),
        Just(TransactionType::Participant),
        Just(TransactionType::Control),
    ]
}

/// Generate payload bytes of specified max length.
pub fn plaintext(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Generate a register name within the allowed length.
pub fn register_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,37}".prop_map(String::from)
}

/// Generate tracking data.
pub fn tracking() -> impl Strategy<Value = BTreeMap<String, String>> {
    prop::collection::btree_map("[a-z]{1,8}", "[ -~]{0,16}", 0..4)
}

/// Parameters for generating a transaction.
#[derive(Debug, Clone)]
pub struct TransactionParams {
    pub keypair: Keypair,
    pub register_id: RegisterId,
    pub transaction_type: TransactionType,
    pub timestamp: i64,
    pub recipients: Vec<WalletId>,
    pub blueprint_id: Option<String>,
    pub instance_id: Option<String>,
    pub action_id: Option<u32>,
    pub tracking: BTreeMap<String, String>,
    pub prev_tx_id: Option<TxId>,
}

impl Arbitrary for TransactionParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            any::<[u8; 32]>(),
            register_id(),
            transaction_type(),
            timestamp(),
            prop::collection::vec(wallet_id(), 1..4),
            proptest::option::of("[a-z0-9-]{1,12}"),
            proptest::option::of("[a-z0-9-]{1,12}"),
            any::<Option<u32>>(),
            tracking(),
            proptest::option::of(tx_id()),
        )
            .prop_map(
                |(seed, register_id, kind, ts, recipients, blueprint, instance, action, tracking, prev)| {
                    TransactionParams {
                        keypair: Keypair::from_seed(&seed),
                        register_id,
                        transaction_type: kind,
                        timestamp: ts,
                        recipients,
                        blueprint_id: blueprint,
                        instance_id: instance,
                        action_id: action,
                        tracking,
                        prev_tx_id: prev,
                    }
                },
            )
            .boxed()
    }
}

/// Build the unsigned draft described by `params`.
pub fn draft_from_params(params: &TransactionParams) -> TransactionDraft {
    let mut draft = TransactionDraft::new(params.register_id, params.transaction_type)
        .timestamp(params.timestamp)
        .recipients(params.recipients.iter().cloned());

    if let Some(blueprint) = &params.blueprint_id {
        draft = draft.blueprint(blueprint.clone());
    }
    if let Some(instance) = &params.instance_id {
        draft = draft.instance(instance.clone());
    }
    if let Some(action) = params.action_id {
        draft = draft.action(action);
    }
    for (key, value) in &params.tracking {
        draft = draft.track(key.clone(), value.clone());
    }
    if let Some(prev) = params.prev_tx_id {
        draft = draft.prev(prev);
    }
    draft
}

/// Generate a signed transaction from parameters.
pub fn transaction_from_params(params: &TransactionParams) -> Transaction {
    draft_from_params(params).sign(&params.keypair)
}
