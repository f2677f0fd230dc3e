// ABOUTME: Mapping from connection handle to per-connection state, with safe concurrent access
// ABOUTME: A single table-wide Mutex, not a sharded map, so for_each can take one non-blocking guard

use crate::connection::{Connection, ConnectionId, ConnectionState};
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, TryLockError};
use tracing::{debug, error, warn};

/// Returned by [`ConnectionTable::insert`].
///
/// `Duplicate` is unreachable in practice, since ids are minted by this
/// table's own counter, but the type exists so the invariant is named
/// rather than expressed only as a bare panic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    #[error("duplicate connection id inserted into connection table")]
    Duplicate,
}

/// Mapping from [`ConnectionId`] to [`Connection`], serialized under a
/// single table-wide guard.
///
/// `for_each` is the only caller that needs a non-blocking acquire: the
/// liveness sweeper would rather skip a round than stall the acceptor or
/// any reader task waiting on the same lock.
#[derive(Debug, Default)]
pub struct ConnectionTable {
    connections: Mutex<HashMap<ConnectionId, Arc<Connection>>>,
    next_id: AtomicU64,
}

impl ConnectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a fresh, never-before-used connection id.
    pub fn next_id(&self) -> ConnectionId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Insert a newly accepted connection. A duplicate id can only mean
    /// `next_id` was reused, which should be unreachable, so the caller
    /// has no sensible recovery: this logs the invariant violation and
    /// then unreachable!()s rather than returning `Err` for a caller to
    /// handle.
    pub fn insert(&self, conn: Arc<Connection>) -> Result<(), TableError> {
        let mut guard = self.connections.lock().unwrap();
        if guard.insert(conn.id, conn).is_some() {
            drop(guard);
            error!("duplicate connection id inserted into connection table");
            unreachable!("{}", TableError::Duplicate);
        }
        Ok(())
    }

    /// Remove a connection, returning it so the caller can finish tearing
    /// it down (transition to `Closed`, drop the socket).
    pub fn remove(&self, id: ConnectionId) -> Option<Arc<Connection>> {
        self.connections.lock().unwrap().remove(&id)
    }

    pub fn get(&self, id: ConnectionId) -> Option<Arc<Connection>> {
        self.connections.lock().unwrap().get(&id).cloned()
    }

    /// Snapshot-style iteration for the liveness sweeper. Takes a
    /// non-blocking acquire attempt; returns `false` without visiting
    /// anything if the table is currently locked elsewhere — missing one
    /// sweep is preferable to blocking the reader/acceptor path.
    pub fn for_each(&self, mut visitor: impl FnMut(&Arc<Connection>)) -> bool {
        match self.connections.try_lock() {
            Ok(guard) => {
                for conn in guard.values() {
                    visitor(conn);
                }
                true
            }
            Err(TryLockError::WouldBlock) => {
                debug!("connection table contended, skipping this sweep");
                false
            }
            Err(TryLockError::Poisoned(_)) => {
                warn!("connection table lock poisoned");
                false
            }
        }
    }

    /// Snapshot of currently-connected peer addresses, for
    /// `get_connected_list`.
    pub fn snapshot_peers(&self) -> Vec<Ipv4Addr> {
        self.connections
            .lock()
            .unwrap()
            .values()
            .map(|c| *c.peer.ip())
            .collect()
    }

    /// Remove every connection, transitioning each to `Closed`. Used during
    /// `Server::stop`.
    pub fn clear(&self) -> Vec<Arc<Connection>> {
        let mut guard = self.connections.lock().unwrap();
        let drained: Vec<_> = guard.drain().map(|(_, conn)| conn).collect();
        for conn in &drained {
            conn.set_state(ConnectionState::Closing);
            conn.set_state(ConnectionState::Closed);
        }
        drained
    }

    pub fn len(&self) -> usize {
        self.connections.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, SocketAddrV4};

    fn conn(id: ConnectionId, port: u16) -> Arc<Connection> {
        Arc::new(Connection::new(id, SocketAddrV4::new(Ipv4Addr::LOCALHOST, port)))
    }

    #[test]
    fn insert_then_get_then_remove() {
        let table = ConnectionTable::new();
        let id = table.next_id();
        table.insert(conn(id, 1000)).unwrap();

        assert!(table.get(id).is_some());
        assert_eq!(table.len(), 1);

        let removed = table.remove(id).unwrap();
        assert_eq!(removed.id, id);
        assert!(table.get(id).is_none());
        assert!(table.is_empty());
    }

    #[test]
    #[should_panic(expected = "duplicate connection id")]
    fn duplicate_insert_panics() {
        let table = ConnectionTable::new();
        table.insert(conn(7, 1000)).unwrap();
        let _ = table.insert(conn(7, 1001));
    }

    #[test]
    fn for_each_visits_all_entries() {
        let table = ConnectionTable::new();
        for i in 0..3 {
            let id = table.next_id();
            table.insert(conn(id, 1000 + i as u16)).unwrap();
        }

        let mut visited = 0;
        let completed = table.for_each(|_| visited += 1);
        assert!(completed);
        assert_eq!(visited, 3);
    }

    #[test]
    fn snapshot_peers_reflects_current_state() {
        let table = ConnectionTable::new();
        let id1 = table.next_id();
        table.insert(conn(id1, 2000)).unwrap();
        let id2 = table.next_id();
        table.insert(conn(id2, 2001)).unwrap();

        let mut peers = table.snapshot_peers();
        peers.sort();
        assert_eq!(peers, vec![Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST]);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn clear_removes_and_closes_everything() {
        let table = ConnectionTable::new();
        let id = table.next_id();
        table.insert(conn(id, 3000)).unwrap();

        let drained = table.clear();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].state(), ConnectionState::Closed);
        assert!(table.is_empty());
    }
}
