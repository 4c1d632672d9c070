//! Offline queue sync engine.
//!
//! Drains pending records against the backend in FIFO order. At most one
//! pass runs at a time system-wide: the in-flight flag is claimed with a
//! compare-exchange and a concurrent call is a no-op, not queued. Per-record
//! failures are collected into the pass report and never stop the rest of
//! the pass.

use crate::backend::{deliver, SyncTarget};
use crate::config::SyncConfig;
use crate::error::Result;
use crate::network::NetworkMonitor;
use crate::record::{ScanRecord, SyncState};
use crate::store::OfflineQueue;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Aggregated outcome of one sync pass, exposed as a batch for display.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncReport {
    pub attempted: usize,
    pub synced: usize,
    pub failed: usize,
    /// One entry per failed record: "record_id: error".
    pub errors: Vec<String>,
}

pub struct SyncEngine {
    queue: Arc<OfflineQueue>,
    target: Arc<dyn SyncTarget>,
    config: SyncConfig,
    in_flight: AtomicBool,
}

impl SyncEngine {
    pub fn new(queue: Arc<OfflineQueue>, target: Arc<dyn SyncTarget>, config: SyncConfig) -> Self {
        Self {
            queue,
            target,
            config,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Run one sync pass. Returns `None` when a pass is already running.
    pub async fn sync_all(&self) -> Result<Option<SyncReport>> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Sync pass already in flight, skipping");
            return Ok(None);
        }

        let result = self.run_pass().await;
        self.in_flight.store(false, Ordering::SeqCst);
        result.map(Some)
    }

    async fn run_pass(&self) -> Result<SyncReport> {
        crate::metrics::SYNC_PASSES.inc();

        let pending = self.queue.list_pending(self.config.max_retries)?;
        if pending.is_empty() {
            debug!("No pending records to sync");
            return Ok(SyncReport::default());
        }
        info!(pending = pending.len(), "Starting sync pass");

        let mut report = SyncReport::default();
        for (i, record) in pending.into_iter().enumerate() {
            if i > 0 {
                // Pacing between records so the backend is not hammered.
                tokio::time::sleep(self.config.pacing()).await;
            }

            report.attempted += 1;
            if let Err(e) = self.sync_one(record).await {
                report.failed += 1;
                report.errors.push(e);
            } else {
                report.synced += 1;
            }
        }

        info!(
            attempted = report.attempted,
            synced = report.synced,
            failed = report.failed,
            "Sync pass finished"
        );
        Ok(report)
    }

    /// Deliver one record, with full retry/terminal bookkeeping persisted
    /// back to the queue. Returns the displayable error string on failure.
    async fn sync_one(&self, mut record: ScanRecord) -> std::result::Result<(), String> {
        let record_id = record.id.clone();

        record
            .transition(SyncState::Syncing)
            .and_then(|_| self.queue.update(&record))
            .map_err(|e| format!("{}: {}", record_id, e))?;

        match deliver(self.target.as_ref(), &record).await {
            Ok(()) => {
                // Mark synced and compact in one breath so confirmed
                // records never accumulate locally.
                record
                    .transition(SyncState::Synced)
                    .and_then(|_| self.queue.update(&record))
                    .and_then(|_| self.queue.compact().map(|_| ()))
                    .map_err(|e| format!("{}: {}", record_id, e))?;

                crate::metrics::SYNC_RECORDS_SYNCED.inc();
                info!(record_id = %record_id, "Record synced");
                Ok(())
            }
            Err(delivery_err) => {
                crate::metrics::SYNC_RECORDS_FAILED.inc();

                if let Err(e) = record
                    .record_failure(self.config.max_retries)
                    .and_then(|_| self.queue.update(&record))
                {
                    return Err(format!("{}: {}", record_id, e));
                }

                if record.sync_state == SyncState::FailedTerminal {
                    crate::metrics::SYNC_RECORDS_TERMINAL.inc();
                    warn!(
                        record_id = %record_id,
                        retries = record.retry_count,
                        "Record reached retry ceiling, excluded from further automatic sync"
                    );
                } else {
                    warn!(
                        record_id = %record_id,
                        retries = record.retry_count,
                        error = %delivery_err,
                        "Record sync failed, will retry"
                    );
                }
                Err(format!("{}: {}", record_id, delivery_err))
            }
        }
    }

    /// Spawn the auto-sync task: after a reconnect is observed, wait out the
    /// debounce window, re-check that we are still online, then run a pass.
    /// Flapping inside the window never produces overlapping passes; the
    /// in-flight flag covers the manual trigger too.
    pub fn spawn_auto_sync(self: &Arc<Self>, network: &NetworkMonitor) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        let mut rx = network.subscribe();
        let debounce = engine.config.reconnect_debounce();

        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                if !*rx.borrow() {
                    continue;
                }

                tokio::time::sleep(debounce).await;
                if !*rx.borrow() {
                    debug!("Connectivity dropped during debounce, skipping auto sync");
                    continue;
                }

                match engine.sync_all().await {
                    Ok(Some(report)) => {
                        debug!(synced = report.synced, failed = report.failed, "Auto sync pass done")
                    }
                    Ok(None) => debug!("Auto sync skipped, pass already running"),
                    Err(e) => warn!(error = %e, "Auto sync pass errored"),
                }
            }
        })
    }
}
