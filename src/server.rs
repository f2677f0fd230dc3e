// ABOUTME: Public API surface: start_server/stop_server, read_message, get_connected_list
// ABOUTME: Owns the acceptor and sweeper background tasks and the shared table/queue state

use crate::acceptor::Acceptor;
use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::queue::{IngressQueue, QueueItem};
use crate::sweeper::Sweeper;
use crate::table::ConnectionTable;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::Arc;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::task::{JoinHandle, JoinSet};
use tracing::info;

/// A running instance of the connection-ingress server.
///
/// `Server` owns the acceptor and liveness-sweeper background tasks and the
/// shared connection table / ingress queue they operate on. It has no
/// global or process-wide state: nothing prevents two independent `Server`s
/// from running in the same process bound to different addresses.
#[derive(Debug)]
pub struct Server {
    queue: Arc<IngressQueue>,
    table: Arc<ConnectionTable>,
    stop_tx: watch::Sender<bool>,
    acceptor_handle: JoinHandle<()>,
    sweeper_handle: JoinHandle<()>,
    reader_tasks: Arc<AsyncMutex<JoinSet<()>>>,
}

impl Server {
    /// Bind the listening socket and start the acceptor and sweeper tasks.
    ///
    /// IPv6 listening addresses are not supported.
    pub async fn start(addr: SocketAddrV4, config: ServerConfig) -> ServerResult<Self> {
        let table = Arc::new(ConnectionTable::new());
        let queue = Arc::new(IngressQueue::new());
        let config = Arc::new(config);
        let reader_tasks = Arc::new(AsyncMutex::new(JoinSet::new()));

        let acceptor = Acceptor::bind(addr, table.clone(), queue.clone(), reader_tasks.clone()).await?;
        let sweeper = Sweeper::new(table.clone(), queue.clone(), config.clone());

        let (stop_tx, stop_rx) = watch::channel(false);
        let acceptor_handle = tokio::spawn(acceptor.run(stop_rx.clone()));
        let sweeper_handle = tokio::spawn(sweeper.run(stop_rx));

        info!(%addr, "server started");

        Ok(Self {
            queue,
            table,
            stop_tx,
            acceptor_handle,
            sweeper_handle,
            reader_tasks,
        })
    }

    /// Stop accepting and sweeping, tear down every open connection, and
    /// drain the ingress queue.
    ///
    /// Sends the stop signal, aborts the acceptor so it takes no more
    /// connections, awaits every outstanding reader task via the shared
    /// `JoinSet`, then destroys any connections still left in the table and
    /// drains the queue.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        self.acceptor_handle.abort();
        let _ = self.acceptor_handle.await;
        let _ = self.sweeper_handle.await;

        let mut reader_tasks = self.reader_tasks.lock().await;
        while reader_tasks.join_next().await.is_some() {}
        drop(reader_tasks);

        self.table.clear();
        self.queue.drain_and_free();

        info!("server stopped");
    }

    /// Pop the next queued message or synthetic error, if any. Never
    /// blocks: returns `None` immediately if the queue is empty.
    pub fn read_message(&self) -> Option<QueueItem> {
        self.queue.pop()
    }

    /// Snapshot of currently connected peer addresses.
    pub fn get_connected_list(&self) -> Vec<Ipv4Addr> {
        self.table.snapshot_peers()
    }
}
