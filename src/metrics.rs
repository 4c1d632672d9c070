use lazy_static::lazy_static;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntGauge, Registry};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // Scan pipeline metrics
    pub static ref SCANS_STARTED: IntCounter = IntCounter::new(
        "scans_started_total",
        "Total number of scans started"
    ).unwrap();

    pub static ref SCANS_REJECTED: IntCounter = IntCounter::new(
        "scans_rejected_total",
        "Total number of scans rejected by the decision gate"
    ).unwrap();

    pub static ref SCANS_ACCEPTED: IntCounter = IntCounter::new(
        "scans_accepted_total",
        "Total number of scans accepted by the decision gate"
    ).unwrap();

    pub static ref INFERENCE_LATENCY: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "inference_duration_seconds",
            "Local classifier inference latency in seconds"
        )
        .buckets(vec![0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0])
    ).unwrap();

    // Persistence metrics
    pub static ref RECORDS_SUBMITTED_DIRECT: IntCounter = IntCounter::new(
        "records_submitted_direct_total",
        "Records delivered to the backend on the online path"
    ).unwrap();

    pub static ref RECORDS_QUEUED: IntCounter = IntCounter::new(
        "records_queued_total",
        "Records enqueued into the durable offline queue"
    ).unwrap();

    pub static ref QUEUE_PENDING: IntGauge = IntGauge::new(
        "queue_pending_records",
        "Current number of pending records in the offline queue"
    ).unwrap();

    // Sync engine metrics
    pub static ref SYNC_PASSES: IntCounter = IntCounter::new(
        "sync_passes_total",
        "Total number of sync passes executed"
    ).unwrap();

    pub static ref SYNC_RECORDS_SYNCED: IntCounter = IntCounter::new(
        "sync_records_synced_total",
        "Records successfully delivered during sync passes"
    ).unwrap();

    pub static ref SYNC_RECORDS_FAILED: IntCounter = IntCounter::new(
        "sync_records_failed_total",
        "Record delivery failures during sync passes"
    ).unwrap();

    pub static ref SYNC_RECORDS_TERMINAL: IntCounter = IntCounter::new(
        "sync_records_terminal_total",
        "Records moved to the terminal failed state"
    ).unwrap();
}

/// Register all metrics with the global registry. Call once at startup.
pub fn register_metrics() {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(SCANS_STARTED.clone()),
        Box::new(SCANS_REJECTED.clone()),
        Box::new(SCANS_ACCEPTED.clone()),
        Box::new(INFERENCE_LATENCY.clone()),
        Box::new(RECORDS_SUBMITTED_DIRECT.clone()),
        Box::new(RECORDS_QUEUED.clone()),
        Box::new(QUEUE_PENDING.clone()),
        Box::new(SYNC_PASSES.clone()),
        Box::new(SYNC_RECORDS_SYNCED.clone()),
        Box::new(SYNC_RECORDS_FAILED.clone()),
        Box::new(SYNC_RECORDS_TERMINAL.clone()),
    ];

    for metric in metrics {
        // Duplicate registration only happens in tests; ignore it.
        let _ = REGISTRY.register(metric);
    }
}
