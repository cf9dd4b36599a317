//! Background expiry sweep
//!
//! Periodically evicts cache entries that have outlived their time-to-live,
//! reporting each pass that removed something over a tokio channel.
//!
//! Passes are scheduled on the tokio clock, but entry ages are measured
//! against the wall clock (`Utc::now()`). A paused test clock therefore only
//! moves the schedule; the ttl boundary itself is covered through
//! `CacheManager::sweep_at`.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Weak;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::manager::CacheStore;

/// Outcome of a sweep pass that evicted at least one entry
#[derive(Debug, Clone)]
pub struct SweepReport {
    /// Identifiers removed in this pass, in insertion order
    pub evicted: Vec<String>,
    /// When the pass ran
    pub swept_at: DateTime<Utc>,
}

/// Handle for controlling a background sweep task
///
/// Dropping the handle stops the task. The task also stops by itself once the
/// cache it sweeps has been dropped.
pub struct SweepHandle {
    /// Channel for receiving sweep reports
    pub receiver: mpsc::Receiver<SweepReport>,
    /// Flag to signal shutdown
    shutdown_tx: mpsc::Sender<()>,
}

impl SweepHandle {
    pub(crate) fn spawn<E: Send + Sync + 'static>(
        store: Weak<RwLock<CacheStore<E>>>,
        ttl: Duration,
        every: Duration,
    ) -> Self {
        let (report_tx, report_rx) = mpsc::channel(32);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            // Skip the first tick (immediate)
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let Some(store) = store.upgrade() else {
                            debug!("cache dropped, stopping sweep");
                            break;
                        };

                        let now = Utc::now();
                        let evicted = store.write().evict_older_than(ttl, now);
                        drop(store);

                        if !evicted.is_empty() {
                            info!(count = evicted.len(), "sweep evicted expired entries");
                            // A full channel only means nobody is listening closely.
                            let _ = report_tx.try_send(SweepReport {
                                evicted,
                                swept_at: now,
                            });
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        Self {
            receiver: report_rx,
            shutdown_tx,
        }
    }

    /// Checks for a pending sweep report without blocking
    pub fn try_recv(&mut self) -> Option<SweepReport> {
        self.receiver.try_recv().ok()
    }

    /// Shuts down the background sweep task
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}
