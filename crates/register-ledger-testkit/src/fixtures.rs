//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;

use register_ledger::{Ledger, LedgerConfig};
use register_ledger_core::{
    Keypair, NewRegister, Register, RegisterId, Transaction, TransactionDraft, TransactionType,
    TxId, WalletId,
};
use register_ledger_events::{ChannelNotifier, LedgerEvent};
use register_ledger_payload::{Recipient, X25519StaticSecret};
use register_ledger_store::{LedgerStore, MemoryStore};

/// A wallet holding both its signing key and its payload decryption key.
pub struct TestWallet {
    pub keypair: Keypair,
    pub secret: X25519StaticSecret,
}

impl TestWallet {
    /// Create a wallet with random keys.
    pub fn new() -> Self {
        Self {
            keypair: Keypair::generate(),
            secret: X25519StaticSecret::generate(),
        }
    }

    /// Create with deterministic keys from a seed.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        let mut x_seed = seed;
        x_seed[31] ^= 0x5a;
        Self {
            keypair: Keypair::from_seed(&seed),
            secret: X25519StaticSecret::from_bytes(x_seed),
        }
    }

    /// The wallet id derived from the signing key.
    pub fn wallet(&self) -> WalletId {
        WalletId::from_public_key(&self.keypair.public_key())
    }

    /// This wallet as a payload recipient.
    pub fn recipient(&self) -> Recipient {
        Recipient::new(self.wallet(), self.secret.public_key())
    }
}

impl Default for TestWallet {
    fn default() -> Self {
        Self::new()
    }
}

/// Create multiple deterministic wallets for multi-party tests.
pub fn test_wallets(count: usize) -> Vec<TestWallet> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[0] = i as u8;
            seed[1] = 0xa1;
            TestWallet::with_seed(seed)
        })
        .collect()
}

/// A ledger wired to an event channel, with a sender wallet.
pub struct TestFixture<S: LedgerStore = MemoryStore> {
    pub ledger: Arc<Ledger<S>>,
    pub events: UnboundedReceiver<LedgerEvent>,
    pub cancel: CancellationToken,
    pub sender: TestWallet,
}

impl TestFixture<MemoryStore> {
    /// In-memory ledger with default configuration.
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new(), LedgerConfig::default())
    }
}

impl Default for TestFixture<MemoryStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: LedgerStore> TestFixture<S> {
    /// Ledger over `store`.
    pub fn with_store(store: S, config: LedgerConfig) -> Self {
        let (notifier, events) = ChannelNotifier::new();
        Self {
            ledger: Arc::new(Ledger::new(store, Arc::new(notifier), config)),
            events,
            cancel: CancellationToken::new(),
            sender: TestWallet::with_seed([0x42; 32]),
        }
    }

    /// Create a register owned by tenant `"tenant-test"`.
    ///
    /// Panics on failure.
    pub async fn register(&self, name: &str) -> Register {
        self.ledger
            .create_register(NewRegister::new(name, "tenant-test"), &self.cancel)
            .await
            .unwrap_or_else(|e| panic!("failed to create register {name}: {e}"))
    }

    /// A signed action in `instance`, addressed to `to`, without payloads.
    pub fn action(
        &self,
        register_id: RegisterId,
        instance: &str,
        timestamp: i64,
        prev: Option<TxId>,
        to: &[&TestWallet],
    ) -> Transaction {
        let mut draft = TransactionDraft::new(register_id, TransactionType::Action)
            .timestamp(timestamp)
            .instance(instance)
            .recipients(to.iter().map(|w| w.wallet()));
        if let Some(prev) = prev {
            draft = draft.prev(prev);
        }
        draft.sign(&self.sender.keypair)
    }

    /// Take every event published so far.
    pub fn drain_events(&mut self) -> Vec<LedgerEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixture_register_and_action() {
        let mut fixture = TestFixture::new();
        let register = fixture.register("fixture").await;
        let bob = TestWallet::new();

        let tx = fixture.action(register.id, "thread", 1, None, &[&bob]);
        fixture
            .ledger
            .store_transaction(&tx, &fixture.cancel)
            .await
            .unwrap();

        assert!(tx.recipient_wallets.contains(&bob.wallet()));
        assert_eq!(tx.sender_wallet, fixture.sender.wallet());
        assert_eq!(fixture.drain_events().len(), 2);
    }

    #[test]
    fn test_wallets_are_distinct() {
        let wallets = test_wallets(3);
        assert_ne!(wallets[0].wallet(), wallets[1].wallet());
        assert_ne!(wallets[1].wallet(), wallets[2].wallet());
        assert_ne!(
            wallets[0].secret.public_key().0,
            wallets[1].secret.public_key().0
        );
    }
}
