//! # Register Ledger Testkit
//!
//! Testing utilities for the register ledger.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: fixed transactions pinning the canonical encoding
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: wallets and ready-wired ledgers for integration tests
//! - **Stores**: a store wrapper for forcing races and simulating corruption
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use register_ledger_testkit::generators::{TransactionParams, transaction_from_params};
//!
//! proptest! {
//!     #[test]
//!     fn tx_id_is_deterministic(params: TransactionParams) {
//!         let t1 = transaction_from_params(&params);
//!         let t2 = transaction_from_params(&params);
//!         prop_assert_eq!(t1.tx_id, t2.tx_id);
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use register_ledger_testkit::fixtures::{TestFixture, TestWallet};
//!
//! async fn example() {
//!     let fixture = TestFixture::new();
//!     let register = fixture.register("orders").await;
//!     let bob = TestWallet::new();
//!     let tx = fixture.action(register.id, "order-1", 1, None, &[&bob]);
//!     fixture.ledger.store_transaction(&tx, &fixture.cancel).await.unwrap();
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod stores;
pub mod vectors;

pub use fixtures::{test_wallets, TestFixture, TestWallet};
pub use generators::{transaction_from_params, TransactionParams};
pub use stores::{DeleteHold, InterceptStore};
pub use vectors::{all_vectors, generate_transaction_from_vector, verify_all_vectors, GoldenVector};

/// Install a test log subscriber filtered by `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
