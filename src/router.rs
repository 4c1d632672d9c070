//! Persistence router.
//!
//! Decides between direct backend delivery and the durable offline queue.
//! Any failure on the online path falls back to enqueueing the full record
//! rather than surfacing a network error for an otherwise successful scan.

use crate::backend::{deliver, SyncTarget};
use crate::error::Result;
use crate::network::NetworkMonitor;
use crate::record::ScanRecord;
use crate::store::OfflineQueue;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Submitted to the backend on the online path.
    Direct,
    /// Enqueued locally for the sync engine to deliver later.
    Queued,
}

pub struct PersistenceRouter {
    network: Arc<NetworkMonitor>,
    target: Arc<dyn SyncTarget>,
    queue: Arc<OfflineQueue>,
}

impl PersistenceRouter {
    pub fn new(
        network: Arc<NetworkMonitor>,
        target: Arc<dyn SyncTarget>,
        queue: Arc<OfflineQueue>,
    ) -> Self {
        Self { network, target, queue }
    }

    /// Finalize an accepted, located scan record.
    pub async fn finalize(&self, record: ScanRecord) -> Result<DeliveryOutcome> {
        if self.network.is_online() {
            match deliver(self.target.as_ref(), &record).await {
                Ok(()) => {
                    info!(record_id = %record.id, "Record delivered directly");
                    crate::metrics::RECORDS_SUBMITTED_DIRECT.inc();
                    return Ok(DeliveryOutcome::Direct);
                }
                Err(e) => {
                    // Transient failure is recovered locally; the user never
                    // sees a raw network error here.
                    warn!(record_id = %record.id, error = %e, "Online path failed, queueing record");
                }
            }
        }

        self.queue.insert(&record)?;
        crate::metrics::RECORDS_QUEUED.inc();
        info!(record_id = %record.id, "Record enqueued for later sync");
        Ok(DeliveryOutcome::Queued)
    }
}
