//! EventNotifier trait and in-process implementations.
//!
//! The ledger calls `notify` only after a mutation has committed. A failed
//! notification is reported to the caller of `notify` but never undoes the
//! mutation; delivery is at-least-once from the point of view of sinks that
//! retry.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::event::LedgerEvent;

/// Errors a notifier can report.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The receiving side has gone away.
    #[error("event channel closed")]
    Closed,

    /// The sink rejected or failed to deliver the event.
    #[error("event delivery failed: {0}")]
    Delivery(String),
}

/// Result type for notifier operations.
pub type Result<T> = std::result::Result<T, NotifyError>;

/// Outbound sink for ledger events.
///
/// Implementations must be thread-safe (Send + Sync). Calls for one register
/// arrive in commit order.
#[async_trait]
pub trait EventNotifier: Send + Sync {
    /// Publish one event.
    async fn notify(&self, event: LedgerEvent) -> Result<()>;
}

/// A notifier that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl EventNotifier for NoopNotifier {
    async fn notify(&self, _event: LedgerEvent) -> Result<()> {
        Ok(())
    }
}

/// An in-process outbox backed by an unbounded channel.
///
/// Events are queued in the order `notify` is called and never block the
/// writer.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<LedgerEvent>,
}

impl ChannelNotifier {
    /// Create a notifier and the receiver that drains it.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<LedgerEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl EventNotifier for ChannelNotifier {
    async fn notify(&self, event: LedgerEvent) -> Result<()> {
        self.sender.send(event).map_err(|_| NotifyError::Closed)
    }
}
