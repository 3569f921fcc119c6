//! # Register Ledger Events
//!
//! Outbound notification contract for the register ledger.
//!
//! The ledger publishes a [`LedgerEvent`] through an [`EventNotifier`] after
//! each committed mutation. Wiring events to a message bus or a socket is
//! the job of an [`EventNotifier`] implementation outside this workspace;
//! [`ChannelNotifier`] is the in-process outbox such a bridge drains.

pub mod event;
pub mod notifier;

pub use event::LedgerEvent;
pub use notifier::{ChannelNotifier, EventNotifier, NoopNotifier, NotifyError, Result};
