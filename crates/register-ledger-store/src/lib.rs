//! # Register Ledger Store
//!
//! Storage abstraction for the register ledger. Provides a trait-based
//! interface for registers, transactions and dockets with an in-memory
//! implementation.
//!
//! ## Key Types
//!
//! - [`LedgerStore`] - The async trait for all storage operations
//! - [`MemoryStore`] - In-memory reference backend
//! - [`RegisterCache`] - Adapter caching known register ids
//! - [`TransactionQuery`] - Declarative transaction filter
//! - [`InsertOutcome`] - Result of inserting a transaction
//!
//! ## Design Notes
//!
//! - **Idempotent inserts**: inserting a stored transaction returns the stored copy
//! - **Single write path for height**: only [`LedgerStore::seal_docket_atomic`] advances it
//! - **Cancellation**: every operation takes a `CancellationToken`

pub mod cached;
pub mod error;
pub mod memory;
pub mod query;
pub mod traits;

pub use cached::RegisterCache;
pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use query::TransactionQuery;
pub use traits::{ensure_active, InsertOutcome, LedgerStore};
