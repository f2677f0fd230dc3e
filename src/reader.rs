// ABOUTME: Per-connection task: owns the TcpStream, frames it, decodes messages, and routes them
// ABOUTME: Exactly one task ever reads a given connection's socket, for its entire lifetime

use crate::connection::{Connection, ConnectionState};
use crate::frame::{FrameError, FrameOutcome, FrameReader};
use crate::message::{decode_message, software_error, Message, MessageOrError, SoftwareError};
use crate::queue::{IngressQueue, QueueItem};
use crate::table::ConnectionTable;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

/// Drive one accepted connection until it closes or faults, then tear it
/// down.
///
/// This is the task that owns `stream` for its entire lifetime, so there is
/// no separate "destroyed" flag to check before each read: no other task
/// ever touches this socket.
pub async fn run_reader(
    conn: Arc<Connection>,
    stream: TcpStream,
    queue: Arc<IngressQueue>,
    table: Arc<ConnectionTable>,
    mut stop: tokio::sync::watch::Receiver<bool>,
) {
    let peer = conn.peer;
    let mut reader = FrameReader::new(stream);

    loop {
        let outcome = tokio::select! {
            biased;
            _ = stop.changed() => {
                if *stop.borrow() {
                    info!(%peer, "reader stopping, server shutting down");
                    break;
                }
                continue;
            }
            outcome = reader.read_frame() => outcome,
        };

        match outcome {
            Ok(FrameOutcome::Frame(bytes)) => match decode_message(&bytes) {
                Ok(message) => handle_message(&conn, &queue, message),
                Err(err) => {
                    debug!(%peer, error = %err, "could not decode message");
                    enqueue(&queue, *peer.ip(), SoftwareError::CouldNotDecodeMessage);
                    // A decode failure reports an error but does not close
                    // the connection; the sender may recover on its next frame.
                }
            },
            Ok(FrameOutcome::End) => {
                info!(%peer, "connection closed by peer");
                enqueue(&queue, *peer.ip(), SoftwareError::ConnectionClosed);
                break;
            }
            Err(FrameError::BadLeadingByte(byte)) => {
                warn!(%peer, byte, "bad leading byte, destroying connection");
                break;
            }
            Err(FrameError::PartialFrame) => {
                warn!(%peer, "connection closed mid-frame, destroying connection");
                break;
            }
            Err(FrameError::Io(err)) => {
                warn!(%peer, error = %err, "I/O error reading frame, destroying connection");
                break;
            }
        }
    }

    conn.set_state(ConnectionState::Closing);
    table.remove(conn.id);
    conn.set_state(ConnectionState::Closed);
}

fn handle_message(conn: &Connection, queue: &IngressQueue, message: Message) {
    if message.is_keep_alive() {
        conn.touch_keep_alive();
        return;
    }
    let _ = queue.push(QueueItem {
        message: MessageOrError::Message(message),
        peer_address: *conn.peer.ip(),
        received_at: SystemTime::now(),
    });
}

fn enqueue(
    queue: &IngressQueue,
    peer_address: std::net::Ipv4Addr,
    error: SoftwareError,
) {
    let _ = queue.push(QueueItem {
        message: MessageOrError::SoftwareError(software_error(error)),
        peer_address,
        received_at: SystemTime::now(),
    });
}
