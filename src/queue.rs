// ABOUTME: The single thread-safe FIFO ingress queue all decoded/synthetic messages flow through
// ABOUTME: Consumer side is exposed synchronously as Server::read_message; never blocks the caller

use crate::message::MessageOrError;
use std::collections::VecDeque;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, TryLockError};
use std::time::SystemTime;

/// One item on the ingress queue: a decoded message or a synthetic
/// failure notice, plus the peer it came from and when it was enqueued.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueItem {
    pub message: MessageOrError,
    pub peer_address: Ipv4Addr,
    pub received_at: SystemTime,
}

/// Returned by [`IngressQueue::push`] and [`IngressQueue::try_push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PushError {
    /// [`IngressQueue::drain_and_free`] has already run; the queue no
    /// longer accepts items.
    #[error("ingress queue has been stopped")]
    Stopped,
    /// `try_push` only: the lock was held elsewhere and the item was
    /// dropped rather than waited for.
    #[error("ingress queue contended")]
    Contended,
}

/// FIFO of decoded and synthetic messages.
///
/// Backed by a plain `Mutex<VecDeque<_>>`. The lock is only ever held for
/// an O(1) push or pop, so a blocking `Mutex::lock` satisfies an informal
/// "never blocks indefinitely" contract for ordinary callers — no caller
/// can stall another for more than a pointer swap's worth of time. The
/// liveness sweeper is the one caller that would rather drop a report
/// than wait at all (missing one timeout report is fine; it re-fires
/// next sweep), so it goes through [`IngressQueue::try_push`] instead.
#[derive(Debug, Default)]
pub struct IngressQueue {
    items: Mutex<VecDeque<QueueItem>>,
    stopped: AtomicBool,
}

impl IngressQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue at the tail, blocking for the lock. Fails only once
    /// [`IngressQueue::drain_and_free`] has run.
    pub fn push(&self, item: QueueItem) -> Result<(), PushError> {
        if self.stopped.load(Ordering::Acquire) {
            return Err(PushError::Stopped);
        }
        self.items.lock().unwrap().push_back(item);
        Ok(())
    }

    /// Enqueue at the tail without waiting for the lock. Used by the
    /// liveness sweeper, which would rather drop a timeout report than
    /// stall behind a reader or acceptor holding the same lock.
    pub fn try_push(&self, item: QueueItem) -> Result<(), PushError> {
        if self.stopped.load(Ordering::Acquire) {
            return Err(PushError::Stopped);
        }
        match self.items.try_lock() {
            Ok(mut guard) => {
                guard.push_back(item);
                Ok(())
            }
            Err(TryLockError::WouldBlock) => Err(PushError::Contended),
            Err(TryLockError::Poisoned(_)) => Err(PushError::Contended),
        }
    }

    /// Remove and return the head item, if any.
    pub fn pop(&self) -> Option<QueueItem> {
        self.items.lock().unwrap().pop_front()
    }

    /// Number of items currently queued. Diagnostics/tests only.
    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mark the queue stopped (rejecting further pushes) and drop any
    /// remaining items. Called once, during `Server::stop`.
    pub fn drain_and_free(&self) {
        self.stopped.store(true, Ordering::Release);
        self.items.lock().unwrap().clear();
    }
}
