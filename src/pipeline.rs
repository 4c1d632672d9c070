//! Scan pipeline orchestrator.
//!
//! Enforces the strict step order for a single scan: preprocess ->
//! classify -> decision gate -> geolocate -> persist. No step starts before
//! its predecessor's result is available, and at most one scan is in flight
//! at a time (a second start is refused while `is_scanning` is held).

use crate::error::{Result, ScanError};
use crate::gate::{DecisionGate, GateDecision, RejectReason};
use crate::labels::{label_info, LabelInfo};
use crate::location::LocationAcquirer;
use crate::model::LocalClassifier;
use crate::network::NetworkMonitor;
use crate::preprocess::preprocess;
use crate::record::{LabelScore, RankedLabels, ScanRecord};
use crate::router::{DeliveryOutcome, PersistenceRouter};
use base64::Engine;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Debug, Clone)]
pub enum ScanOutcome {
    /// The gate rejected the subject; nothing was persisted.
    Rejected(RejectReason),
    /// Accepted, located and routed to the backend or the offline queue.
    Completed {
        record_id: String,
        ranked_labels: RankedLabels,
        delivery: DeliveryOutcome,
    },
}

impl ScanOutcome {
    pub fn top_label(&self) -> Option<&LabelScore> {
        match self {
            ScanOutcome::Rejected(_) => None,
            ScanOutcome::Completed { ranked_labels, .. } => ranked_labels.first(),
        }
    }

    /// Display metadata (severity, treatment advice) for the top label.
    pub fn advice(&self) -> Option<&'static LabelInfo> {
        self.top_label().and_then(|top| label_info(&top.label))
    }
}

/// Resets the in-flight flag when the scan ends on any path.
struct ScanGuard<'a>(&'a AtomicBool);

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct ScanPipeline {
    classifier: Arc<dyn LocalClassifier>,
    gate: DecisionGate,
    acquirer: LocationAcquirer,
    router: PersistenceRouter,
    network: Arc<NetworkMonitor>,
    is_scanning: AtomicBool,
}

impl ScanPipeline {
    pub fn new(
        classifier: Arc<dyn LocalClassifier>,
        gate: DecisionGate,
        acquirer: LocationAcquirer,
        router: PersistenceRouter,
        network: Arc<NetworkMonitor>,
    ) -> Self {
        Self {
            classifier,
            gate,
            acquirer,
            router,
            network,
            is_scanning: AtomicBool::new(false),
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.is_scanning.load(Ordering::SeqCst)
    }

    /// Run one user-initiated scan over raw image bytes.
    #[instrument(skip_all)]
    pub async fn run_scan(&self, image_bytes: &[u8]) -> Result<ScanOutcome> {
        if self
            .is_scanning
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ScanError::ScanInProgress);
        }
        let _guard = ScanGuard(&self.is_scanning);

        crate::metrics::SCANS_STARTED.inc();

        let tensor = preprocess(image_bytes)?;

        // Inference is CPU-bound; run it off the async threads.
        let classifier = Arc::clone(&self.classifier);
        let ranked = tokio::task::spawn_blocking(move || classifier.classify(&tensor))
            .await
            .map_err(|e| ScanError::Inference(e.to_string()))??;

        let online = self.network.is_online();
        let decision = self.gate.decide(&ranked, image_bytes, online).await;

        let reason = match decision {
            GateDecision::Accepted { remotely_verified } => {
                crate::metrics::SCANS_ACCEPTED.inc();
                info!(
                    top = %ranked[0].label,
                    percentage = ranked[0].percentage,
                    remotely_verified,
                    "Scan accepted"
                );
                None
            }
            GateDecision::Rejected(reason) => Some(reason),
        };

        if let Some(reason) = reason {
            crate::metrics::SCANS_REJECTED.inc();
            info!(?reason, "Scan rejected");
            return Ok(ScanOutcome::Rejected(reason));
        }

        // Location is a hard precondition: failure here halts the scan and
        // nothing is persisted.
        let location = self.acquirer.acquire().await?;

        let record = ScanRecord::new(
            base64::engine::general_purpose::STANDARD.encode(image_bytes),
            ranked.clone(),
            location,
        );
        let record_id = record.id.clone();

        let delivery = self.router.finalize(record).await?;

        Ok(ScanOutcome::Completed {
            record_id,
            ranked_labels: ranked,
            delivery,
        })
    }
}
