use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::store::ClinicStore;

/// Background refresh of the cache from the server.
pub struct SyncWorker {
    store: Arc<ClinicStore>,
    interval: Duration,
}

/// Stops the worker when asked, or when dropped.
pub struct SyncHandle {
    shutdown_tx: oneshot::Sender<()>,
    join_handle: JoinHandle<()>,
}

impl SyncHandle {
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.join_handle.await {
            warn!(error = %e, "sync worker did not stop cleanly");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.join_handle.is_finished()
    }
}

impl SyncWorker {
    pub fn new(store: Arc<ClinicStore>, interval: Duration) -> Self {
        Self { store, interval }
    }

    pub fn spawn(self) -> SyncHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let join_handle = tokio::spawn(self.run(shutdown_rx));
        SyncHandle {
            shutdown_tx,
            join_handle,
        }
    }

    async fn run(self, mut shutdown_rx: oneshot::Receiver<()>) {
        let mut ticker = interval(self.interval);
        // A slow server delays the next pass instead of queueing a burst.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_ms = self.interval.as_millis() as u64, "sync worker started");
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => break,
                _ = ticker.tick() => {
                    match self.store.sync_once().await {
                        Ok(true) => debug!("sync pass done"),
                        Ok(false) => debug!("sync pass skipped"),
                        Err(e) => warn!(error = %e, breaker = ?self.store.breaker_state(), "sync pass failed"),
                    }
                }
            }
        }
        info!("sync worker stopped");
    }
}
