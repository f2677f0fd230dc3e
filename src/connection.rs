// ABOUTME: Per-connection state owned exclusively by the Connection Table
// ABOUTME: The TcpStream itself lives in the reader task, not here

use std::net::SocketAddrV4;
use std::sync::Mutex as StdMutex;
use std::time::Instant;
use tokio::sync::Mutex as AsyncMutex;

/// Unique identifier for an accepted connection, generated by
/// [`crate::table::ConnectionTable`]'s own counter at accept time.
pub type ConnectionId = u64;

/// Lifecycle state of a [`Connection`]. Transitions only `Open → Closing →
/// Closed`; `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Open,
    Closing,
    Closed,
}

/// Shared, reference-counted per-connection state.
///
/// This struct does *not* own the `TcpStream` — the reader task spawned for
/// this connection does, for its entire lifetime. That ownership split is
/// what lets `read_lock` be uncontended by construction: exactly one task
/// ever reads from or closes a given connection's socket.
#[derive(Debug)]
pub struct Connection {
    pub id: ConnectionId,
    pub peer: SocketAddrV4,
    last_keep_alive: StdMutex<Instant>,
    state: StdMutex<ConnectionState>,
    /// Serializes frame-reading critical sections. Uncontended in the
    /// current single-reader-task design; kept to keep the documented
    /// invariant literally true and to leave a seam for a future second
    /// reader (e.g. an admin/inspection path).
    pub read_lock: AsyncMutex<()>,
}

impl Connection {
    pub fn new(id: ConnectionId, peer: SocketAddrV4) -> Self {
        Self {
            id,
            peer,
            last_keep_alive: StdMutex::new(Instant::now()),
            state: StdMutex::new(ConnectionState::Open),
            read_lock: AsyncMutex::new(()),
        }
    }

    pub fn last_keep_alive(&self) -> Instant {
        *self.last_keep_alive.lock().unwrap()
    }

    /// Update the liveness timestamp. Monotonically non-decreasing per
    /// connection, since it is always set to `Instant::now()` by the single
    /// reader task that owns this connection's reads.
    pub fn touch_keep_alive(&self) {
        let mut guard = self.last_keep_alive.lock().unwrap();
        let now = Instant::now();
        if now > *guard {
            *guard = now;
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap()
    }

    pub fn set_state(&self, new_state: ConnectionState) {
        *self.state.lock().unwrap() = new_state;
    }
}
