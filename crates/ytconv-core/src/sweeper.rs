//! Background cleanup of abandoned job files.
//!
//! The sweeper is owned by the process: [`Sweeper::spawn`] returns a
//! [`SweeperHandle`] that stops the loop on [`SweeperHandle::shutdown`].
//! [`Sweeper::run_once`] performs a single sweep without any timer.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::store::{JobStore, SweepReport};

#[derive(Debug, Clone)]
pub struct Sweeper {
    store: JobStore,
    interval: Duration,
    max_age: Duration,
}

impl Sweeper {
    pub fn new(store: JobStore, interval: Duration, max_age: Duration) -> Self {
        Self {
            store,
            interval,
            max_age,
        }
    }

    /// Sweeps the store once.
    pub async fn run_once(&self) -> SweepReport {
        let report = self.store.sweep(self.max_age).await;
        if report.removed > 0 || report.skipped > 0 {
            info!(
                scanned = report.scanned,
                removed = report.removed,
                skipped = report.skipped,
                "job store swept"
            );
        } else {
            debug!(scanned = report.scanned, "job store swept");
        }
        report
    }

    /// Starts sweeping every `interval`, first run one interval from now.
    pub fn spawn(self) -> SweeperHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        info!(
            interval_secs = self.interval.as_secs(),
            max_age_secs = self.max_age.as_secs(),
            "sweeper started"
        );

        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(
                tokio::time::Instant::now() + self.interval,
                self.interval,
            );
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.run_once().await;
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("sweeper stopped");
        });

        SweeperHandle { shutdown_tx, join }
    }
}

/// Owner of a running sweeper task.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stops the loop and waits for an in-flight sweep to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.join.await {
            warn!(error = %e, "sweeper task ended abnormally");
        }
    }
}
