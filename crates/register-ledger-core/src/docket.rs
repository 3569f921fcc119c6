//! Docket: an ordered batch of transactions sealed onto a register's chain.
//!
//! Dockets form a hash chain per register. Docket `n` carries the hash of
//! docket `n - 1` as `previous_hash`; docket 1 carries [`GENESIS_HASH`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::canonical::canonical_docket_bytes;
use crate::crypto::Sha256Hash;
use crate::error::CoreError;
use crate::types::{RegisterId, TxId};

/// The `previous_hash` of the first docket in every register.
pub const GENESIS_HASH: Sha256Hash = Sha256Hash::ZERO;

/// Lifecycle state of a docket.
///
/// The success path is `Init -> Proposed -> Accepted -> Sealed`. `Rejected`
/// is reachable from every state except `Sealed`, and is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocketState {
    Init,
    Proposed,
    Accepted,
    Rejected,
    Sealed,
}

impl DocketState {
    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(self, next: DocketState) -> bool {
        use DocketState::*;
        matches!(
            (self, next),
            (Init, Proposed)
                | (Proposed, Accepted)
                | (Accepted, Sealed)
                | (Init, Rejected)
                | (Proposed, Rejected)
                | (Accepted, Rejected)
        )
    }

    /// No further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, DocketState::Rejected | DocketState::Sealed)
    }
}

/// A docket (block) of a register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Docket {
    /// Chain position; docket `n` is sealed when the register is at height `n - 1`.
    pub id: u64,
    pub register_id: RegisterId,
    pub previous_hash: Sha256Hash,
    pub hash: Sha256Hash,
    /// Ordered, non-empty.
    pub transaction_ids: Vec<TxId>,
    pub timestamp: i64,
    pub state: DocketState,
    pub metadata: BTreeMap<String, String>,
}

impl Docket {
    /// Recompute the content hash from the hashed fields.
    pub fn compute_hash(&self) -> Sha256Hash {
        Sha256Hash::hash(&canonical_docket_bytes(
            self.id,
            &self.register_id,
            &self.previous_hash,
            &self.transaction_ids,
            self.timestamp,
            &self.metadata,
        ))
    }

    /// Whether the stored hash matches the docket's contents.
    pub fn verify_hash(&self) -> bool {
        self.hash == self.compute_hash()
    }

    /// Move to `next`, or fail without changing state.
    pub fn transition(&mut self, next: DocketState) -> Result<(), CoreError> {
        if !self.state.can_transition_to(next) {
            return Err(CoreError::InvalidStateTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }
}

/// Builder for docket candidates.
#[derive(Debug, Clone)]
pub struct DocketBuilder {
    id: u64,
    register_id: RegisterId,
    previous_hash: Sha256Hash,
    transaction_ids: Vec<TxId>,
    timestamp: i64,
    metadata: BTreeMap<String, String>,
}

impl DocketBuilder {
    /// Start a candidate for position `id` on top of `previous_hash`.
    pub fn new(register_id: RegisterId, id: u64, previous_hash: Sha256Hash) -> Self {
        Self {
            id,
            register_id,
            previous_hash,
            transaction_ids: Vec::new(),
            timestamp: 0,
            metadata: BTreeMap::new(),
        }
    }

    pub fn transaction(mut self, tx_id: TxId) -> Self {
        self.transaction_ids.push(tx_id);
        self
    }

    pub fn transactions(mut self, tx_ids: impl IntoIterator<Item = TxId>) -> Self {
        self.transaction_ids.extend(tx_ids);
        self
    }

    pub fn timestamp(mut self, ts: i64) -> Self {
        self.timestamp = ts;
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Build the docket in `Init` state with its hash filled in.
    pub fn build(self) -> Docket {
        let mut docket = Docket {
            id: self.id,
            register_id: self.register_id,
            previous_hash: self.previous_hash,
            hash: Sha256Hash::ZERO,
            transaction_ids: self.transaction_ids,
            timestamp: self.timestamp,
            state: DocketState::Init,
            metadata: self.metadata,
        };
        docket.hash = docket.compute_hash();
        docket
    }
}

/// Result of walking a register's docket chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocketChainStatus {
    Valid,
    Broken { at_height: u64 },
}

impl DocketChainStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, DocketChainStatus::Valid)
    }
}

/// Verify the dockets of a register up to `height`.
///
/// `dockets` must be ordered by id. Each position `1..=height` must be
/// present without gaps, link to its predecessor's hash (genesis for the
/// first) and match its own content hash. The first failing height is
/// reported.
pub fn verify_docket_chain(dockets: &[Docket], height: u64) -> DocketChainStatus {
    let mut previous = GENESIS_HASH;
    let mut iter = dockets.iter();

    for expected in 1..=height {
        let Some(docket) = iter.next() else {
            return DocketChainStatus::Broken { at_height: expected };
        };
        if docket.id != expected
            || docket.previous_hash != previous
            || docket.state != DocketState::Sealed
            || !docket.verify_hash()
        {
            return DocketChainStatus::Broken { at_height: expected };
        }
        previous = docket.hash;
    }

    if iter.next().is_some() {
        return DocketChainStatus::Broken {
            at_height: height + 1,
        };
    }

    DocketChainStatus::Valid
}
