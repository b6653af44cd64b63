//! Connected clients and their outbound queues

use std::collections::BTreeMap;
use std::fmt;

use tokio::sync::mpsc::{self, error::TrySendError};

/// Transport-assigned connection id
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClientId(pub u64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

/// Why a client was removed during a broadcast
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Its queue was full: it is not keeping up
    Saturated,
    /// Its delivery task has gone away
    Closed,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DropReason::Saturated => "queue saturated",
            DropReason::Closed => "connection closed",
        })
    }
}

/// Outbound queues of every connected client, keyed by id.
///
/// Sending never blocks: a client whose queue is full is dropped instead of
/// delaying the others.
#[derive(Debug)]
pub struct ClientHub<F> {
    clients: BTreeMap<ClientId, mpsc::Sender<F>>,
}

impl<F> Default for ClientHub<F> {
    fn default() -> Self {
        Self {
            clients: BTreeMap::new(),
        }
    }
}

impl<F: Clone> ClientHub<F> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client. A reused id replaces the old queue.
    pub fn connect(&mut self, id: ClientId, outbox: mpsc::Sender<F>) {
        if self.clients.insert(id, outbox).is_some() {
            tracing::warn!(client = %id, "Client id reused, replacing queue");
        }
    }

    /// Forget a client. Returns whether it was connected.
    pub fn disconnect(&mut self, id: ClientId) -> bool {
        self.clients.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn contains(&self, id: ClientId) -> bool {
        self.clients.contains_key(&id)
    }

    /// Queue `frame` for every client.
    ///
    /// Clients that could not take it are removed and returned.
    pub fn broadcast(&mut self, frame: &F) -> Vec<(ClientId, DropReason)> {
        let mut dropped = Vec::new();
        self.clients.retain(|&id, outbox| match outbox.try_send(frame.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                dropped.push((id, DropReason::Saturated));
                false
            }
            Err(TrySendError::Closed(_)) => {
                dropped.push((id, DropReason::Closed));
                false
            }
        });
        dropped
    }

    /// Drop every queue, which ends each client's delivery task.
    pub fn clear(&mut self) {
        self.clients.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_reaches_every_client() {
        let mut hub = ClientHub::new();
        let (tx1, mut rx1) = mpsc::channel(4);
        let (tx2, mut rx2) = mpsc::channel(4);
        hub.connect(ClientId(1), tx1);
        hub.connect(ClientId(2), tx2);

        assert!(hub.broadcast(&"frame".to_string()).is_empty());
        assert_eq!(rx1.try_recv().unwrap(), "frame");
        assert_eq!(rx2.try_recv().unwrap(), "frame");
    }

    #[test]
    fn test_saturated_client_dropped() {
        let mut hub = ClientHub::new();
        let (slow, _slow_rx) = mpsc::channel(1);
        let (fast, mut fast_rx) = mpsc::channel(4);
        hub.connect(ClientId(1), slow);
        hub.connect(ClientId(2), fast);

        assert!(hub.broadcast(&1u32).is_empty());
        assert_eq!(fast_rx.try_recv().unwrap(), 1);

        let dropped = hub.broadcast(&2u32);
        assert_eq!(dropped, [(ClientId(1), DropReason::Saturated)]);
        assert_eq!(fast_rx.try_recv().unwrap(), 2);
        assert!(!hub.contains(ClientId(1)));
        assert_eq!(hub.len(), 1);
    }

    #[test]
    fn test_closed_client_removed() {
        let mut hub = ClientHub::new();
        let (tx, rx) = mpsc::channel(4);
        hub.connect(ClientId(7), tx);
        drop(rx);

        assert_eq!(hub.broadcast(&0u8), [(ClientId(7), DropReason::Closed)]);
        assert!(hub.is_empty());
    }

    #[test]
    fn test_disconnect() {
        let mut hub = ClientHub::new();
        let (tx, _rx) = mpsc::channel::<u8>(1);
        hub.connect(ClientId(3), tx);
        assert!(hub.disconnect(ClientId(3)));
        assert!(!hub.disconnect(ClientId(3)));
        assert_eq!(ClientId(3).to_string(), "client-3");
    }
}
