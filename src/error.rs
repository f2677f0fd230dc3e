// ABOUTME: Top-level error types for server startup and internal invariant violations
// ABOUTME: Per-connection failures never surface here; they are handled entirely inside the reader task

use std::net::SocketAddrV4;
use thiserror::Error;

/// Errors surfaced by the public API.
///
/// Per-connection errors (framing, decode, remote close, liveness timeout)
/// are never wrapped in this type — they are converted to synthetic
/// [`crate::message::SoftwareError`] items on the ingress queue instead.
/// `ServerError` is reserved for the two things a caller of
/// [`crate::server::Server::start`] can actually act on: a failed bind, and
/// a table invariant violation severe enough that it should not be
/// silently absorbed.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Binding the listening socket failed.
    #[error("failed to bind {0}: {1}")]
    Bind(SocketAddrV4, #[source] std::io::Error),

    /// An internal invariant was violated (e.g. duplicate connection id).
    ///
    /// This should be unreachable in correct operation; see
    /// [`crate::table::ConnectionTable::insert`].
    #[error("internal invariant violated: {0}")]
    Invariant(&'static str),
}

/// A specialized `Result` type for server operations.
pub type ServerResult<T> = std::result::Result<T, ServerError>;
