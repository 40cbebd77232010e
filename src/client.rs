//! Registered client record
//!
//! Represents a connection that completed the name handshake, together with
//! the queue feeding its writer task.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::error::SendError;
use crate::message::Outbound;
use crate::types::ClientId;

/// Registry entry for one handshake-complete connection
///
/// Cloning shares the same outbound queue, which is what broadcast
/// snapshots rely on.
#[derive(Debug, Clone)]
pub struct ClientRecord {
    /// Connection identity (registry key)
    pub id: ClientId,
    /// Display name announced in the handshake, unvalidated
    pub name: String,
    /// Server → Client outbound queue
    pub sender: mpsc::Sender<Outbound>,
}

impl ClientRecord {
    /// Create a new record
    pub fn new(id: ClientId, name: String, sender: mpsc::Sender<Outbound>) -> Self {
        Self { id, name, sender }
    }

    /// Queue an item for this client without waiting
    ///
    /// Fails if the queue is full (slow reader) or the writer task has ended
    /// (client gone). Either way the item is dropped.
    pub fn send(&self, item: Outbound) -> Result<(), SendError> {
        match self.sender.try_send(item) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(SendError::QueueFull),
            Err(TrySendError::Closed(_)) => Err(SendError::ChannelClosed),
        }
    }

    /// Queue a text frame for this client
    pub fn send_text(&self, text: impl Into<String>) -> Result<(), SendError> {
        self.send(Outbound::Text(text.into()))
    }
}
