//! Concurrent writers on the same and on different registers.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use register_ledger::events::LedgerEvent;
use register_ledger::store::{LedgerStore, MemoryStore, RegisterCache};
use register_ledger::{deadline_token, LedgerConfig, LedgerError, TransactionDraft, TransactionType};
use register_ledger_core::{now_millis, NewRegister, RegisterId};
use register_ledger_testkit::{init_tracing, test_wallets, InterceptStore, TestFixture};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_racing_sealers_one_wins() -> Result<()> {
    init_tracing();
    let mut fixture =
        TestFixture::with_store(InterceptStore::new(MemoryStore::new()), LedgerConfig::default());
    let register = fixture.register("race").await;
    let wallets = test_wallets(1);

    let a = fixture.action(register.id, "a", 1, None, &[&wallets[0]]);
    let b = fixture.action(register.id, "b", 2, None, &[&wallets[0]]);
    fixture.ledger.store_transaction(&a, &fixture.cancel).await?;
    fixture.ledger.store_transaction(&b, &fixture.cancel).await?;

    let sealer = fixture.ledger.sealer().clone();
    let first = sealer.next_candidate(&register.id, [a.tx_id], &fixture.cancel).await?;
    let second = sealer.next_candidate(&register.id, [b.tx_id], &fixture.cancel).await?;
    assert_eq!((first.id, second.id), (1, 1));
    fixture.drain_events();

    // Both sealers read the register before either one seals.
    fixture.ledger.store().gate_register_reads(2);

    let mut tasks = JoinSet::new();
    for candidate in [first, second] {
        let sealer = sealer.clone();
        let cancel = fixture.cancel.clone();
        tasks.spawn(async move { sealer.propose_and_seal(candidate, &cancel).await });
    }

    let mut sealed = Vec::new();
    let mut conflicts = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined? {
            Ok(docket) => sealed.push(docket),
            Err(LedgerError::ConcurrencyConflict { expected: 0, actual: 1 }) => conflicts += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(sealed.len(), 1);
    assert_eq!(conflicts, 1);

    let register = fixture.ledger.get_register(&register.id, &fixture.cancel).await?;
    assert_eq!(register.height, 1);
    assert_eq!(
        fixture.ledger.sealer().get_docket(&register.id, 1, &fixture.cancel).await?,
        sealed[0]
    );

    let events = fixture.drain_events();
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], LedgerEvent::DocketConfirmed { docket_id: 1, .. }));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_registers_seal_independently() -> Result<()> {
    let fixture = TestFixture::new();
    let wallets = test_wallets(1);

    let mut registers = Vec::new();
    for name in ["north", "south", "east", "west"] {
        registers.push(fixture.register(name).await);
    }

    let mut tasks = JoinSet::new();
    for register in &registers {
        let ledger = Arc::clone(&fixture.ledger);
        let cancel = fixture.cancel.clone();
        let key = fixture.sender.keypair.clone();
        let to = wallets[0].wallet();
        let register_id = register.id;
        tasks.spawn(async move {
            for ts in 1..=5 {
                let draft = TransactionDraft::new(register_id, TransactionType::Action)
                    .timestamp(ts)
                    .recipient(to.clone());
                let tx = ledger.signer().sign(draft, &key);
                ledger.store_transaction(&tx, &cancel).await?;
                ledger.seal_next(&register_id, [tx.tx_id], &cancel).await?;
            }
            Ok::<_, LedgerError>(())
        });
    }
    while let Some(joined) = tasks.join_next().await {
        joined??;
    }

    for register in &registers {
        let current = fixture.ledger.get_register(&register.id, &fixture.cancel).await?;
        assert_eq!(current.height, 5);
        assert!(fixture
            .ledger
            .sealer()
            .validate_docket_chain(&register.id, &fixture.cancel)
            .await?
            .is_valid());
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_duplicates_confirm_once() -> Result<()> {
    let mut fixture = TestFixture::new();
    let register = fixture.register("dupes").await;
    let wallets = test_wallets(1);
    let tx = fixture.action(register.id, "t", 1, None, &[&wallets[0]]);
    fixture.drain_events();

    let mut tasks = JoinSet::new();
    for _ in 0..8 {
        let ledger = Arc::clone(&fixture.ledger);
        let cancel = fixture.cancel.clone();
        let tx = tx.clone();
        tasks.spawn(async move { ledger.store_transaction(&tx, &cancel).await });
    }

    let mut accepted = 0;
    while let Some(joined) = tasks.join_next().await {
        let result = joined??;
        if result.is_accepted() {
            accepted += 1;
        }
        assert_eq!(result.into_transaction(), tx);
    }
    assert_eq!(accepted, 1);

    let confirmed = fixture
        .drain_events()
        .into_iter()
        .filter(|e| matches!(e, LedgerEvent::TransactionConfirmed { .. }))
        .count();
    assert_eq!(confirmed, 1);
    Ok(())
}

#[tokio::test]
async fn test_cancelled_seal_leaves_height() -> Result<()> {
    let fixture = TestFixture::new();
    let register = fixture.register("cancel").await;
    let wallets = test_wallets(1);
    let tx = fixture.action(register.id, "t", 1, None, &[&wallets[0]]);
    fixture.ledger.store_transaction(&tx, &fixture.cancel).await?;

    let candidate = fixture
        .ledger
        .sealer()
        .next_candidate(&register.id, [tx.tx_id], &fixture.cancel)
        .await?;
    let cancel = fixture.cancel.child_token();
    cancel.cancel();
    assert!(matches!(
        fixture.ledger.sealer().propose_and_seal(candidate, &cancel).await,
        Err(LedgerError::Cancelled)
    ));

    let register = fixture.ledger.get_register(&register.id, &fixture.cancel).await?;
    assert_eq!(register.height, 0);
    Ok(())
}

#[tokio::test]
async fn test_deadline_cancels_waiting_writer() -> Result<()> {
    let fixture = TestFixture::new();
    let register = fixture.register("deadline").await;
    let wallets = test_wallets(1);
    let tx = fixture.action(register.id, "t", 1, None, &[&wallets[0]]);

    let token = deadline_token(&fixture.cancel, Duration::from_millis(5));
    token.cancelled().await;
    assert!(matches!(
        fixture.ledger.store_transaction(&tx, &token).await,
        Err(LedgerError::Cancelled)
    ));
    assert!(!fixture.cancel.is_cancelled());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_lookup_during_delete_does_not_revive_register() -> Result<()> {
    let cancel = CancellationToken::new();
    let store = Arc::new(RegisterCache::new(InterceptStore::new(MemoryStore::new())));
    let register = NewRegister::new("slow-delete", "tenant-test")
        .into_register(RegisterId::generate(), now_millis())?;
    store.insert_register(&register, 25, &cancel).await?;

    let hold = store.inner().hold_next_delete();
    let deleting = {
        let store = Arc::clone(&store);
        let cancel = cancel.clone();
        let id = register.id;
        tokio::spawn(async move { store.delete_register(&id, &cancel).await })
    };
    hold.entered().await;

    // The backing store still holds the register while the delete is parked.
    assert!(store.has_register(&register.id, &cancel).await?);

    hold.release();
    deleting.await??;

    assert!(!store.inner().has_register(&register.id, &cancel).await?);
    assert!(!store.has_register(&register.id, &cancel).await?);
    assert_eq!(store.cached_len(), 0);
    Ok(())
}
