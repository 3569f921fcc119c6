//! DocketSealer: validates docket candidates and extends a register's chain.
//!
//! The sealer checks a candidate against the register head it reads, then
//! hands the store a single atomic seal conditioned on that height. If
//! another sealer got there first the store reports a conflict and nothing
//! is written.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use register_ledger_core::{
    now_millis, validate_docket_candidate, verify_docket_chain, Docket, DocketBuilder,
    DocketChainStatus, DocketState, RegisterId, Sha256Hash, TxId, GENESIS_HASH,
};
use register_ledger_events::LedgerEvent;
use register_ledger_store::{LedgerStore, StoreError};

use crate::error::{LedgerError, Result};
use crate::transactions::TransactionLedger;

/// Seals dockets over transactions already stored in a register.
pub struct DocketSealer<S: LedgerStore> {
    ledger: TransactionLedger<S>,
}

impl<S: LedgerStore> Clone for DocketSealer<S> {
    fn clone(&self) -> Self {
        Self {
            ledger: self.ledger.clone(),
        }
    }
}

impl<S: LedgerStore> DocketSealer<S> {
    pub fn new(ledger: TransactionLedger<S>) -> Self {
        Self { ledger }
    }

    /// Validate a candidate and seal it at the next height.
    ///
    /// Nothing is written unless every check passes and the register is
    /// still at the height read here when the seal commits.
    pub async fn propose_and_seal(
        &self,
        mut candidate: Docket,
        cancel: &CancellationToken,
    ) -> Result<Docket> {
        let store = &self.ledger.store;
        let register_id = candidate.register_id;

        validate_docket_candidate(&candidate)?;
        if !candidate.verify_hash() {
            warn!(register = %register_id, docket = candidate.id, "docket hash does not match its contents");
            return Err(LedgerError::ChainIntegrityViolation(format!(
                "docket {} hash does not match its contents",
                candidate.id
            )));
        }

        let register = store
            .get_register(&register_id, cancel)
            .await?
            .ok_or(LedgerError::RegisterNotFound(register_id))?;

        for tx_id in &candidate.transaction_ids {
            if !store.has_transaction(&register_id, tx_id, cancel).await? {
                return Err(LedgerError::MissingTransaction(*tx_id));
            }
        }

        let height = register.height;
        if candidate.id != height + 1 {
            return Err(LedgerError::InvalidHeight {
                expected: height + 1,
                got: candidate.id,
            });
        }

        let previous = self.hash_at(&register_id, height, cancel).await?;
        if candidate.previous_hash != previous {
            warn!(register = %register_id, docket = candidate.id, "docket does not link to chain head");
            return Err(LedgerError::ChainIntegrityViolation(format!(
                "docket {} does not link to docket {height}",
                candidate.id
            )));
        }

        if candidate.state == DocketState::Init {
            candidate.transition(DocketState::Proposed)?;
        }
        if candidate.state == DocketState::Proposed {
            candidate.transition(DocketState::Accepted)?;
        }

        let Some(_guard) = self.ledger.locks.acquire_or_cancel(&register_id, cancel).await else {
            return Err(LedgerError::Cancelled);
        };

        let sealed = match store
            .seal_docket_atomic(&register_id, &candidate, height, cancel)
            .await
        {
            Ok(sealed) => sealed,
            Err(StoreError::ConcurrencyConflict { expected, actual }) => {
                warn!(register = %register_id, docket = candidate.id, expected, actual, "lost docket seal race");
                return Err(LedgerError::ConcurrencyConflict { expected, actual });
            }
            Err(e) => return Err(e.into()),
        };

        info!(
            register = %register_id,
            docket = sealed.id,
            transactions = sealed.transaction_ids.len(),
            "sealed docket"
        );
        self.ledger
            .publish(LedgerEvent::DocketConfirmed {
                register_id,
                docket_id: sealed.id,
                transaction_ids: sealed.transaction_ids.clone(),
                timestamp: sealed.timestamp,
            })
            .await;

        Ok(sealed)
    }

    /// Build the candidate for the register's next height.
    pub async fn next_candidate(
        &self,
        register_id: &RegisterId,
        transaction_ids: impl IntoIterator<Item = TxId>,
        cancel: &CancellationToken,
    ) -> Result<Docket> {
        let register = self
            .ledger
            .store
            .get_register(register_id, cancel)
            .await?
            .ok_or(LedgerError::RegisterNotFound(*register_id))?;
        let previous = self.hash_at(register_id, register.height, cancel).await?;

        Ok(DocketBuilder::new(*register_id, register.height + 1, previous)
            .transactions(transaction_ids)
            .timestamp(now_millis())
            .build())
    }

    /// Verify every sealed docket from 1 to the register's height.
    pub async fn validate_docket_chain(
        &self,
        register_id: &RegisterId,
        cancel: &CancellationToken,
    ) -> Result<DocketChainStatus> {
        let store = &self.ledger.store;
        let register = store
            .get_register(register_id, cancel)
            .await?
            .ok_or(LedgerError::RegisterNotFound(*register_id))?;
        let dockets = store.list_dockets(register_id, cancel).await?;

        let status = verify_docket_chain(&dockets, register.height);
        match status {
            DocketChainStatus::Valid => {
                debug!(register = %register_id, height = register.height, "docket chain valid");
            }
            DocketChainStatus::Broken { at_height } => {
                warn!(register = %register_id, at_height, "docket chain broken");
            }
        }
        Ok(status)
    }

    /// Get a sealed docket.
    pub async fn get_docket(
        &self,
        register_id: &RegisterId,
        id: u64,
        cancel: &CancellationToken,
    ) -> Result<Docket> {
        self.ledger
            .store
            .get_docket(register_id, id, cancel)
            .await?
            .ok_or(LedgerError::DocketNotFound {
                register_id: *register_id,
                id,
            })
    }

    /// List a register's sealed dockets by id.
    pub async fn list_dockets(
        &self,
        register_id: &RegisterId,
        cancel: &CancellationToken,
    ) -> Result<Vec<Docket>> {
        Ok(self.ledger.store.list_dockets(register_id, cancel).await?)
    }

    /// Mark a candidate rejected. Nothing is persisted.
    pub fn reject(&self, mut candidate: Docket) -> Result<Docket> {
        candidate.transition(DocketState::Rejected)?;
        debug!(register = %candidate.register_id, docket = candidate.id, "rejected docket");
        Ok(candidate)
    }

    async fn hash_at(
        &self,
        register_id: &RegisterId,
        height: u64,
        cancel: &CancellationToken,
    ) -> Result<Sha256Hash> {
        if height == 0 {
            return Ok(GENESIS_HASH);
        }
        self.ledger
            .store
            .get_docket(register_id, height, cancel)
            .await?
            .map(|d| d.hash)
            .ok_or_else(|| {
                LedgerError::ChainIntegrityViolation(format!(
                    "register {register_id} has no docket at its height {height}"
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locks::CommitLocks;
    use register_ledger_core::{
        Keypair, NewRegister, Transaction, TransactionDraft, TransactionType, WalletId,
    };
    use register_ledger_events::{ChannelNotifier, EventNotifier};
    use register_ledger_store::MemoryStore;
    use std::sync::Arc;
    use tokio::sync::mpsc::UnboundedReceiver;

    struct Setup {
        ledger: TransactionLedger<MemoryStore>,
        sealer: DocketSealer<MemoryStore>,
        events: UnboundedReceiver<LedgerEvent>,
        register_id: RegisterId,
        cancel: CancellationToken,
    }

    async fn setup() -> Setup {
        let store = Arc::new(MemoryStore::new());
        let cancel = CancellationToken::new();
        let register_id = RegisterId::from_bytes([6; 16]);
        let register = NewRegister::new("dockets", "tenant-a")
            .into_register(register_id, now_millis())
            .unwrap();
        store.insert_register(&register, 25, &cancel).await.unwrap();

        let (notifier, events) = ChannelNotifier::new();
        let notifier: Arc<dyn EventNotifier> = Arc::new(notifier);
        let ledger = TransactionLedger::new(store, notifier, Arc::new(CommitLocks::new()), true);
        Setup {
            sealer: DocketSealer::new(ledger.clone()),
            ledger,
            events,
            register_id,
            cancel,
        }
    }

    async fn stored_tx(s: &Setup, ts: i64) -> Transaction {
        let tx = TransactionDraft::new(s.register_id, TransactionType::Action)
            .timestamp(ts)
            .recipient(WalletId::from_public_key(&Keypair::from_seed(&[8; 32]).public_key()))
            .sign(&Keypair::from_seed(&[7; 32]));
        s.ledger.store(&tx, &s.cancel).await.unwrap();
        tx
    }

    #[tokio::test]
    async fn test_seal_first_docket() {
        let mut s = setup().await;
        let tx = stored_tx(&s, 1).await;
        let _ = s.events.try_recv();

        let candidate = s
            .sealer
            .next_candidate(&s.register_id, [tx.tx_id], &s.cancel)
            .await
            .unwrap();
        assert_eq!(candidate.id, 1);
        assert_eq!(candidate.previous_hash, GENESIS_HASH);

        let sealed = s.sealer.propose_and_seal(candidate, &s.cancel).await.unwrap();
        assert_eq!(sealed.state, DocketState::Sealed);
        assert!(matches!(
            s.events.try_recv().unwrap(),
            LedgerEvent::DocketConfirmed { docket_id: 1, .. }
        ));
        assert_eq!(
            s.sealer.get_docket(&s.register_id, 1, &s.cancel).await.unwrap(),
            sealed
        );
    }

    #[tokio::test]
    async fn test_height_must_be_next() {
        let s = setup().await;
        let tx = stored_tx(&s, 1).await;
        let candidate = DocketBuilder::new(s.register_id, 2, GENESIS_HASH)
            .transaction(tx.tx_id)
            .timestamp(10)
            .build();
        assert!(matches!(
            s.sealer.propose_and_seal(candidate, &s.cancel).await,
            Err(LedgerError::InvalidHeight { expected: 1, got: 2 })
        ));
        assert!(s.sealer.list_dockets(&s.register_id, &s.cancel).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_transaction() {
        let s = setup().await;
        let candidate = DocketBuilder::new(s.register_id, 1, GENESIS_HASH)
            .transaction(TxId::from_bytes([3; 32]))
            .timestamp(10)
            .build();
        assert!(matches!(
            s.sealer.propose_and_seal(candidate, &s.cancel).await,
            Err(LedgerError::MissingTransaction(_))
        ));
    }

    #[tokio::test]
    async fn test_wrong_previous_hash() {
        let s = setup().await;
        let tx = stored_tx(&s, 1).await;
        let candidate = DocketBuilder::new(s.register_id, 1, Sha256Hash::hash(b"elsewhere"))
            .transaction(tx.tx_id)
            .timestamp(10)
            .build();
        assert!(matches!(
            s.sealer.propose_and_seal(candidate, &s.cancel).await,
            Err(LedgerError::ChainIntegrityViolation(_))
        ));
    }

    #[tokio::test]
    async fn test_edited_candidate_rejected() {
        let s = setup().await;
        let a = stored_tx(&s, 1).await;
        let b = stored_tx(&s, 2).await;
        let mut candidate = s
            .sealer
            .next_candidate(&s.register_id, [a.tx_id], &s.cancel)
            .await
            .unwrap();
        candidate.transaction_ids.push(b.tx_id);
        assert!(matches!(
            s.sealer.propose_and_seal(candidate, &s.cancel).await,
            Err(LedgerError::ChainIntegrityViolation(_))
        ));
    }

    #[tokio::test]
    async fn test_chain_of_three_validates() {
        let s = setup().await;
        for ts in 1..=3 {
            let tx = stored_tx(&s, ts).await;
            let candidate = s
                .sealer
                .next_candidate(&s.register_id, [tx.tx_id], &s.cancel)
                .await
                .unwrap();
            s.sealer.propose_and_seal(candidate, &s.cancel).await.unwrap();
        }
        let status = s
            .sealer
            .validate_docket_chain(&s.register_id, &s.cancel)
            .await
            .unwrap();
        assert!(status.is_valid());
    }

    #[tokio::test]
    async fn test_reject_and_sealed_is_terminal() {
        let s = setup().await;
        let tx = stored_tx(&s, 1).await;
        let candidate = s
            .sealer
            .next_candidate(&s.register_id, [tx.tx_id], &s.cancel)
            .await
            .unwrap();

        let rejected = s.sealer.reject(candidate.clone()).unwrap();
        assert_eq!(rejected.state, DocketState::Rejected);
        assert!(s.sealer.propose_and_seal(rejected, &s.cancel).await.is_err());

        let sealed = s.sealer.propose_and_seal(candidate, &s.cancel).await.unwrap();
        assert!(matches!(
            s.sealer.reject(sealed),
            Err(LedgerError::InvalidState(_))
        ));
    }
}
