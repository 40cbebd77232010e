//! Session registry
//!
//! The live membership table of handshake-complete connections. One
//! `Registry` is built per broker and handed (cloned) to every connection
//! handler; all clones share the same table.
//!
//! Every insert, remove and broadcast snapshot goes through a single mutex.
//! The lock is never held while sending: broadcast copies the recipient
//! queues out first, then delivers.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

use crate::client::ClientRecord;
use crate::message::{relay_line, Outbound};
use crate::types::ClientId;

/// Shared handle to the membership table
#[derive(Debug, Clone, Default)]
pub struct Registry {
    clients: Arc<Mutex<HashMap<ClientId, ClientRecord>>>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection under a display name
    ///
    /// No name validation or uniqueness check. Re-registering the same id
    /// replaces the previous record.
    pub async fn register(&self, id: ClientId, name: String, sender: mpsc::Sender<Outbound>) {
        let mut clients = self.clients.lock().await;
        clients.insert(id, ClientRecord::new(id, name, sender));
        debug!("Total clients: {}", clients.len());
    }

    /// Remove a connection; safe to call for unknown or already removed ids
    pub async fn unregister(&self, id: ClientId) -> Option<ClientRecord> {
        let mut clients = self.clients.lock().await;
        let removed = clients.remove(&id);
        if removed.is_some() {
            debug!("Total clients: {}", clients.len());
        }
        removed
    }

    /// Relay `text` from `sender` to every other registered connection
    ///
    /// Each recipient gets `"{sender_name}: {text}"`. Enqueueing never waits:
    /// a recipient whose queue is full or closed misses this line and stays
    /// registered; its own handler removes it. Returns the number of
    /// recipients the line was queued for.
    pub async fn broadcast(&self, sender: ClientId, sender_name: &str, text: &str) -> usize {
        let recipients = self.snapshot_except(sender).await;
        let line = relay_line(sender_name, text);

        let mut delivered = 0;
        for recipient in &recipients {
            match recipient.send_text(line.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => debug!("Dropped line for {} ({}): {}", recipient.id, recipient.name, e),
            }
        }
        delivered
    }

    /// Send `notice` to every registered connection, then close each one
    ///
    /// Empties the registry without waiting on any connection. A full or
    /// closed queue loses the notice and the close request; the broker's
    /// grace period ends such connections. Returns the number of connections
    /// that were registered.
    pub async fn close_all(&self, notice: &str) -> usize {
        let drained: Vec<ClientRecord> = {
            let mut clients = self.clients.lock().await;
            clients.drain().map(|(_, record)| record).collect()
        };

        info!("Closing {} client connection(s)", drained.len());

        for record in &drained {
            if let Err(e) = record.send_text(notice).and_then(|()| record.send(Outbound::Close)) {
                debug!("Could not close {} ({}) cleanly: {}", record.id, record.name, e);
            }
        }
        drained.len()
    }

    /// Number of registered connections
    pub async fn len(&self) -> usize {
        self.clients.lock().await.len()
    }

    /// Whether no connection is registered
    pub async fn is_empty(&self) -> bool {
        self.clients.lock().await.is_empty()
    }

    /// Whether `id` is registered
    pub async fn contains(&self, id: ClientId) -> bool {
        self.clients.lock().await.contains_key(&id)
    }

    /// Display names of all registered connections (unordered)
    pub async fn names(&self) -> Vec<String> {
        let clients = self.clients.lock().await;
        clients.values().map(|c| c.name.clone()).collect()
    }

    /// Copy the current recipients, excluding `sender`
    async fn snapshot_except(&self, sender: ClientId) -> Vec<ClientRecord> {
        let clients = self.clients.lock().await;
        clients
            .values()
            .filter(|c| c.id != sender)
            .cloned()
            .collect()
    }
}
