use async_trait::async_trait;
use bananascan::{
    GeoFix, LabelScore, NetworkMonitor, OfflineQueue, ScanError, ScanRecord, ScanSubmission,
    SyncConfig, SyncEngine, SyncState, SyncTarget,
};
use chrono::{Duration as ChronoDuration, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Backend stub: fails submissions whose top label is in `fail_labels`,
/// optionally holding each submit open to exercise the in-flight lock.
struct StubTarget {
    fail_labels: Mutex<HashSet<String>>,
    submit_delay: Duration,
    submits: AtomicUsize,
    uploads: AtomicUsize,
}

impl StubTarget {
    fn new() -> Self {
        Self {
            fail_labels: Mutex::new(HashSet::new()),
            submit_delay: Duration::ZERO,
            submits: AtomicUsize::new(0),
            uploads: AtomicUsize::new(0),
        }
    }

    fn failing_label(self, label: &str) -> Self {
        self.fail_labels.lock().unwrap().insert(label.to_string());
        self
    }

    fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = delay;
        self
    }
}

#[async_trait]
impl SyncTarget for StubTarget {
    async fn upload_image(&self, _bytes: &[u8]) -> bananascan::Result<String> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok("https://cdn.example/scan.jpg".to_string())
    }

    async fn resolve_address(&self, lat: f64, lon: f64) -> bananascan::Result<String> {
        Ok(format!("{},{}", lat, lon))
    }

    async fn submit(&self, submission: &ScanSubmission) -> bananascan::Result<()> {
        if !self.submit_delay.is_zero() {
            tokio::time::sleep(self.submit_delay).await;
        }
        self.submits.fetch_add(1, Ordering::SeqCst);
        if self.fail_labels.lock().unwrap().contains(&submission.result) {
            Err(ScanError::RemoteStatus { status: 500, body: "boom".into() })
        } else {
            Ok(())
        }
    }
}

fn record_with_label(label: &str, age_minutes: i64) -> ScanRecord {
    let mut record = ScanRecord::new(
        "c2Nhbg==".to_string(),
        vec![LabelScore { label: label.to_string(), percentage: 90.0 }],
        GeoFix {
            latitude: 13.1,
            longitude: 121.1,
            accuracy: None,
            timestamp: Utc::now(),
        },
    );
    record.timestamp = Utc::now() - ChronoDuration::minutes(age_minutes);
    record
}

fn engine_with(target: StubTarget, dir: &TempDir) -> (Arc<SyncEngine>, Arc<OfflineQueue>) {
    let queue = Arc::new(OfflineQueue::open(dir.path()).unwrap());
    let engine = Arc::new(SyncEngine::new(
        Arc::clone(&queue),
        Arc::new(target),
        SyncConfig::default(),
    ));
    (engine, queue)
}

#[tokio::test]
async fn test_empty_queue_pass_is_a_noop() {
    let dir = TempDir::new().unwrap();
    let (engine, _queue) = engine_with(StubTarget::new(), &dir);

    let report = engine.sync_all().await.unwrap().unwrap();
    assert_eq!(report.attempted, 0);
    assert!(report.errors.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_successful_pass_syncs_and_compacts() {
    let dir = TempDir::new().unwrap();
    let (engine, queue) = engine_with(StubTarget::new(), &dir);

    queue.insert(&record_with_label("cordana", 10)).unwrap();
    queue.insert(&record_with_label("healthy", 5)).unwrap();

    let report = engine.sync_all().await.unwrap().unwrap();
    assert_eq!(report.attempted, 2);
    assert_eq!(report.synced, 2);
    assert_eq!(report.failed, 0);

    // Synced records never accumulate locally.
    assert!(queue.list_all().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_partial_failure_keeps_failed_record() {
    let dir = TempDir::new().unwrap();
    let (engine, queue) = engine_with(StubTarget::new().failing_label("moko"), &dir);

    // FIFO order: the succeeding record is older.
    queue.insert(&record_with_label("cordana", 10)).unwrap();
    queue.insert(&record_with_label("moko", 5)).unwrap();

    let report = engine.sync_all().await.unwrap().unwrap();
    assert_eq!(report.attempted, 2);
    assert_eq!(report.synced, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.errors.len(), 1);

    let remaining = queue.list_all().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].retry_count, 1);
    assert_eq!(remaining[0].sync_state, SyncState::FailedRetryable);
    assert!(remaining[0].last_sync_attempt.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_one_failure_does_not_stop_the_pass() {
    let dir = TempDir::new().unwrap();
    let (engine, queue) = engine_with(StubTarget::new().failing_label("moko"), &dir);

    queue.insert(&record_with_label("moko", 10)).unwrap();
    queue.insert(&record_with_label("healthy", 5)).unwrap();

    let report = engine.sync_all().await.unwrap().unwrap();
    assert_eq!(report.attempted, 2);
    assert_eq!(report.synced, 1);
    assert_eq!(report.failed, 1);
}

#[tokio::test(start_paused = true)]
async fn test_retry_ceiling_moves_record_to_terminal() {
    let dir = TempDir::new().unwrap();
    let (engine, queue) = engine_with(StubTarget::new().failing_label("moko"), &dir);

    queue.insert(&record_with_label("moko", 10)).unwrap();

    for expected_retries in 1..=3 {
        let report = engine.sync_all().await.unwrap().unwrap();
        assert_eq!(report.attempted, 1);
        assert_eq!(report.failed, 1);

        let record = queue.list_all().unwrap().pop().unwrap();
        assert_eq!(record.retry_count, expected_retries);
    }

    let record = queue.list_all().unwrap().pop().unwrap();
    assert_eq!(record.sync_state, SyncState::FailedTerminal);

    // A terminal record is excluded from the next pass's attempt list but
    // stays visible for manual inspection.
    let report = engine.sync_all().await.unwrap().unwrap();
    assert_eq!(report.attempted, 0);
    assert_eq!(queue.list_all().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_sync_all_runs_one_pass() {
    let dir = TempDir::new().unwrap();
    let (engine, queue) = engine_with(
        StubTarget::new().with_submit_delay(Duration::from_millis(200)),
        &dir,
    );
    queue.insert(&record_with_label("cordana", 10)).unwrap();

    let (first, second) = tokio::join!(engine.sync_all(), engine.sync_all());

    let reports = [first.unwrap(), second.unwrap()];
    let completed = reports.iter().filter(|r| r.is_some()).count();
    let skipped = reports.iter().filter(|r| r.is_none()).count();

    assert_eq!(completed, 1);
    assert_eq!(skipped, 1);
    assert!(queue.list_all().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_auto_sync_runs_after_reconnect_debounce() {
    let dir = TempDir::new().unwrap();
    let (engine, queue) = engine_with(StubTarget::new(), &dir);
    queue.insert(&record_with_label("cordana", 10)).unwrap();

    let network = NetworkMonitor::new(false);
    let _task = engine.spawn_auto_sync(&network);
    tokio::task::yield_now().await;

    network.set_online(true);

    // Debounce is 2s; well past it the queue must be drained.
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(queue.list_all().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_auto_sync_skips_when_connectivity_flaps() {
    let dir = TempDir::new().unwrap();
    let (engine, queue) = engine_with(StubTarget::new(), &dir);
    queue.insert(&record_with_label("cordana", 10)).unwrap();

    let network = NetworkMonitor::new(false);
    let _task = engine.spawn_auto_sync(&network);
    tokio::task::yield_now().await;

    // Reconnect, then drop again inside the debounce window.
    network.set_online(true);
    tokio::time::sleep(Duration::from_millis(500)).await;
    network.set_online(false);
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(queue.list_all().unwrap().len(), 1);
}
