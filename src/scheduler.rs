//! The polling scheduler.
//!
//! Runs the ingestion pipeline once per interval, forever, until told to
//! stop. The first cycle runs immediately on spawn; ticks that would land
//! while a cycle is still running are skipped, not bursted. Cycle failures
//! are logged and swallowed; only shutdown ends the loop.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::feed::Fetcher;
use crate::ingest::{self, CycleSummary, IngestError};
use crate::storage::Database;

/// Handle to a running scheduler task.
///
/// Dropping the handle without calling [`shutdown`](Self::shutdown) also
/// stops the loop, but without waiting for it to finish.
pub struct SchedulerHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Deliver the stop signal and wait for the loop to exit.
    ///
    /// An in-flight ingestion cycle is abandoned, not awaited; its
    /// fetched-stamp from the claim stands.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        let _ = self.task.await;
    }
}

/// Spawn the polling scheduler. `interval` must be non-zero.
pub fn spawn(db: Database, fetcher: Fetcher, interval: Duration) -> SchedulerHandle {
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

    let task = tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(interval = ?interval, "Collecting feeds");

        loop {
            // Waiting: the first tick completes immediately
            tokio::select! {
                _ = timer.tick() => {}
                _ = shutdown_rx.recv() => break,
            }
            // Running: shutdown abandons the in-flight cycle
            tokio::select! {
                result = ingest::run_cycle(&db, &fetcher) => report(result),
                _ = shutdown_rx.recv() => break,
            }
        }

        tracing::info!("Scheduler stopped");
    });

    SchedulerHandle { shutdown_tx, task }
}

fn report(result: Result<CycleSummary, IngestError>) {
    match result {
        // run_cycle logs its own summary
        Ok(_) => {}
        Err(IngestError::NoFeedsRegistered) => {
            tracing::warn!("No feeds registered, nothing to poll");
        }
        Err(e) => {
            tracing::warn!(error = %e, "Ingestion cycle failed, will try again next tick");
        }
    }
}
