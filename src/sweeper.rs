// ABOUTME: Liveness Sweeper: periodically scans the connection table for stale KEEP_ALIVE timestamps
// ABOUTME: Reports timeouts to the ingress queue; never closes a connection itself

use crate::config::ServerConfig;
use crate::message::{software_error, MessageOrError, SoftwareError};
use crate::queue::{IngressQueue, QueueItem};
use crate::table::ConnectionTable;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info};

/// Periodically checks every open connection's liveness timestamp and
/// reports ones that have gone quiet for longer than
/// [`ServerConfig::keep_alive_prod`].
///
/// This component only *reports* timeouts to the ingress queue — it never
/// removes the connection from the table or closes its socket. Destroying
/// a non-responsive connection is left to the embedding application, since
/// it may prefer to keep the connection open for diagnostic purposes.
#[derive(Debug)]
pub struct Sweeper {
    table: Arc<ConnectionTable>,
    queue: Arc<IngressQueue>,
    config: Arc<ServerConfig>,
}

impl Sweeper {
    pub fn new(table: Arc<ConnectionTable>, queue: Arc<IngressQueue>, config: Arc<ServerConfig>) -> Self {
        Self { table, queue, config }
    }

    /// Run sweep rounds every [`ServerConfig::sweep_period`] until `stop`
    /// fires.
    pub async fn run(self, mut stop: tokio::sync::watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.sweep_period());
        // The first tick fires immediately; skip it so the first real sweep
        // happens one full period after startup.
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;
                _ = stop.changed() => {
                    if *stop.borrow() {
                        info!("sweeper stopping");
                        return;
                    }
                }
                _ = ticker.tick() => {
                    self.sweep_once();
                }
            }
        }
    }

    fn sweep_once(&self) {
        let prod = self.config.keep_alive_prod;
        let mut timed_out = Vec::new();

        let completed = self.table.for_each(|conn| {
            if conn.last_keep_alive().elapsed() > prod {
                timed_out.push(*conn.peer.ip());
            }
        });

        if !completed {
            debug!("sweep skipped, connection table contended");
            return;
        }

        for peer_address in timed_out {
            let item = QueueItem {
                message: MessageOrError::SoftwareError(software_error(SoftwareError::ConnectionTimeout)),
                peer_address,
                received_at: SystemTime::now(),
            };
            if let Err(err) = self.queue.try_push(item) {
                debug!(%peer_address, error = %err, "timeout report dropped, will re-emit next sweep");
            }
        }
    }
}
