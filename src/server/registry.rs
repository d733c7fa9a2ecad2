//! Live Connection Registry
//!
//! Tracks every connection whose handler loop is still running. The accept
//! loop inserts, handler tasks remove themselves, and the drain iterates, all
//! concurrently, so the map sits behind its own lock. The lock is never held
//! across an `.await`: anything async works on handles cloned out of it.

use crate::connection::{ConnectionId, ConnectionWriter};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

/// A registered connection.
#[derive(Debug)]
struct ConnectionRecord {
    peer: SocketAddr,
    writer: ConnectionWriter,
    close_tx: watch::Sender<bool>,
}

/// The set of live connections, keyed by id.
#[derive(Debug)]
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<ConnectionId, ConnectionRecord>>,
    next_id: AtomicU64,
    /// Current size, so callers can wait for the registry to empty
    count_tx: watch::Sender<usize>,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        let (count_tx, _) = watch::channel(0);
        Self {
            connections: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            count_tx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ConnectionId, ConnectionRecord>> {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Hands out the next id. Ids start at 0 and are never reused.
    pub fn next_id(&self) -> ConnectionId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Registers a connection and returns the receiver its handler loop
    /// watches for a forced close.
    pub fn register(
        &self,
        id: ConnectionId,
        peer: SocketAddr,
        writer: ConnectionWriter,
    ) -> watch::Receiver<bool> {
        let (close_tx, close_rx) = watch::channel(false);
        let mut connections = self.lock();
        connections.insert(
            id,
            ConnectionRecord {
                peer,
                writer,
                close_tx,
            },
        );
        self.count_tx.send_replace(connections.len());
        close_rx
    }

    /// Removes a connection. Returns `false` if it was not registered.
    pub fn deregister(&self, id: ConnectionId) -> bool {
        let mut connections = self.lock();
        let removed = connections.remove(&id).is_some();
        self.count_tx.send_replace(connections.len());
        removed
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Returns the peer address of a registered connection.
    pub fn peer(&self, id: ConnectionId) -> Option<SocketAddr> {
        self.lock().get(&id).map(|record| record.peer)
    }

    /// Clones out the writers of every registered connection.
    pub fn writers(&self) -> Vec<(ConnectionId, ConnectionWriter)> {
        self.lock()
            .iter()
            .map(|(id, record)| (*id, record.writer.clone()))
            .collect()
    }

    /// Tells every registered handler loop to stop and returns their writers
    /// so the caller can shut them down.
    pub fn signal_close_all(&self) -> Vec<(ConnectionId, ConnectionWriter)> {
        self.lock()
            .iter()
            .map(|(id, record)| {
                record.close_tx.send_replace(true);
                (*id, record.writer.clone())
            })
            .collect()
    }

    /// Resolves once no connection is registered.
    pub async fn wait_empty(&self) {
        let mut count_rx = self.count_tx.subscribe();
        let _ = count_rx.wait_for(|count| *count == 0).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn writer() -> ConnectionWriter {
        let (_client, server) = tokio::io::duplex(64);
        ConnectionWriter::new(server, None)
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    #[test]
    fn test_ids_are_monotonic() {
        let registry = ConnectionRegistry::new();

        let ids: Vec<_> = (0..5).map(|_| registry.next_id()).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_register_and_deregister() {
        let registry = ConnectionRegistry::new();
        let id = registry.next_id();

        let _close_rx = registry.register(id, peer(), writer());
        assert_eq!(registry.peer(id), Some(peer()));
        assert_eq!(registry.len(), 1);

        assert!(registry.deregister(id));
        assert!(!registry.deregister(id)); // Removed exactly once
        assert!(registry.is_empty());
        assert_eq!(registry.peer(id), None);
    }

    #[tokio::test]
    async fn test_ids_not_reused_after_deregister() {
        let registry = ConnectionRegistry::new();

        let first = registry.next_id();
        let _rx = registry.register(first, peer(), writer());
        registry.deregister(first);

        let second = registry.next_id();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_signal_close_all() {
        let registry = ConnectionRegistry::new();
        let mut rx_a = registry.register(registry.next_id(), peer(), writer());
        let mut rx_b = registry.register(registry.next_id(), peer(), writer());

        let writers = registry.signal_close_all();
        assert_eq!(writers.len(), 2);

        assert!(*rx_a.wait_for(|closed| *closed).await.unwrap());
        assert!(*rx_b.wait_for(|closed| *closed).await.unwrap());
    }

    #[tokio::test]
    async fn test_wait_empty() {
        let registry = std::sync::Arc::new(ConnectionRegistry::new());
        let id = registry.next_id();
        let _rx = registry.register(id, peer(), writer());

        let waiter = {
            let registry = std::sync::Arc::clone(&registry);
            tokio::spawn(async move { registry.wait_empty().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        registry.deregister(id);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_empty_on_empty_registry() {
        let registry = ConnectionRegistry::new();
        tokio::time::timeout(Duration::from_millis(100), registry.wait_empty())
            .await
            .unwrap();
    }
}
