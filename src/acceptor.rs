// ABOUTME: Accept loop: binds the listening socket and spawns one reader task per connection
// ABOUTME: Reader task handles are tracked in a shared JoinSet so Server::stop can await them

use crate::connection::Connection;
use crate::error::{ServerError, ServerResult};
use crate::queue::IngressQueue;
use crate::reader::run_reader;
use crate::table::ConnectionTable;
use std::net::SocketAddrV4;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Binds a single IPv4 listening socket and spawns a [`run_reader`] task for
/// every accepted connection. IPv6 listeners are out of scope.
#[derive(Debug)]
pub struct Acceptor {
    listener: TcpListener,
    table: Arc<ConnectionTable>,
    queue: Arc<IngressQueue>,
    reader_tasks: Arc<AsyncMutex<JoinSet<()>>>,
}

impl Acceptor {
    pub async fn bind(
        addr: SocketAddrV4,
        table: Arc<ConnectionTable>,
        queue: Arc<IngressQueue>,
        reader_tasks: Arc<AsyncMutex<JoinSet<()>>>,
    ) -> ServerResult<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind(addr, e))?;
        Ok(Self {
            listener,
            table,
            queue,
            reader_tasks,
        })
    }

    /// Accept connections until `stop` fires. Each connection is handed to
    /// its own [`run_reader`] task; the acceptor itself never blocks on a
    /// connection's lifetime.
    ///
    /// Transient accept errors are logged and the loop continues —
    /// `Server::stop`'s watch signal is the only way out, there is no
    /// give-up-after-backoff path, since a fatal accept error here should
    /// not take the whole server down.
    pub async fn run(self, mut stop: tokio::sync::watch::Receiver<bool>) {
        info!("accepting inbound connections");

        loop {
            tokio::select! {
                biased;
                _ = stop.changed() => {
                    if *stop.borrow() {
                        info!("acceptor stopping");
                        return;
                    }
                }
                accepted = self.listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(pair) => pair,
                        Err(err) => {
                            warn!(error = %err, "accept failed, continuing");
                            continue;
                        }
                    };
                    let peer_v4 = match peer {
                        std::net::SocketAddr::V4(v4) => v4,
                        std::net::SocketAddr::V6(_) => {
                            warn!("rejecting IPv6 peer, out of scope");
                            continue;
                        }
                    };

                    let id = self.table.next_id();
                    let conn = Arc::new(Connection::new(id, peer_v4));
                    self.table
                        .insert(conn.clone())
                        .expect("connection ids are unique");

                    let queue = self.queue.clone();
                    let table = self.table.clone();
                    let reader_stop = stop.clone();
                    self.reader_tasks.lock().await.spawn(async move {
                        run_reader(conn, stream, queue, table, reader_stop).await;
                    });
                }
            }
        }
    }
}
