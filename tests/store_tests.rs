use bananascan::{GeoFix, LabelScore, OfflineQueue, ScanRecord, SyncState};
use chrono::{Duration, Utc};
use tempfile::TempDir;

fn create_test_record(top: &str, percentage: f64) -> ScanRecord {
    ScanRecord::new(
        "aW1hZ2UtYnl0ZXM=".to_string(),
        vec![
            LabelScore { label: top.to_string(), percentage },
            LabelScore { label: "healthy".to_string(), percentage: 100.0 - percentage },
        ],
        GeoFix {
            latitude: 13.1,
            longitude: 121.1,
            accuracy: Some(10.0),
            timestamp: Utc::now(),
        },
    )
}

#[test]
fn test_insert_and_get() {
    let dir = TempDir::new().unwrap();
    let queue = OfflineQueue::open(dir.path()).unwrap();

    let record = create_test_record("cordana", 88.0);
    queue.insert(&record).unwrap();

    let loaded = queue.get(&record.id).unwrap().unwrap();
    assert_eq!(loaded.id, record.id);
    assert_eq!(loaded.sync_state, SyncState::Pending);
    assert_eq!(loaded.ranked_labels, record.ranked_labels);

    assert!(queue.get("no-such-id").unwrap().is_none());
}

#[test]
fn test_duplicate_insert_is_rejected() {
    let dir = TempDir::new().unwrap();
    let queue = OfflineQueue::open(dir.path()).unwrap();

    let record = create_test_record("moko", 75.0);
    queue.insert(&record).unwrap();
    assert!(queue.insert(&record).is_err());
    assert_eq!(queue.len(), 1);
}

#[test]
fn test_queue_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let record = create_test_record("black_sigatoka", 91.2);

    {
        let queue = OfflineQueue::open(dir.path()).unwrap();
        queue.insert(&record).unwrap();
    }

    // Simulated process restart: reopen from the same path.
    let queue = OfflineQueue::open(dir.path()).unwrap();
    let pending = queue.list_pending(3).unwrap();

    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, record.id);
    assert_eq!(pending[0].sync_state, SyncState::Pending);
}

// A crash between persisting Syncing and the delivery result must not
// strand the record: on reopen it is rolled back to retryable and stays
// eligible for the next pass, with no retry attempt consumed.
#[test]
fn test_record_interrupted_mid_sync_recovers_on_reopen() {
    let dir = TempDir::new().unwrap();
    let mut record = create_test_record("panama_wilt", 81.0);

    {
        let queue = OfflineQueue::open(dir.path()).unwrap();
        queue.insert(&record).unwrap();
        record.transition(SyncState::Syncing).unwrap();
        queue.update(&record).unwrap();
    }

    let queue = OfflineQueue::open(dir.path()).unwrap();
    let pending = queue.list_pending(3).unwrap();

    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, record.id);
    assert_eq!(pending[0].sync_state, SyncState::FailedRetryable);
    assert_eq!(pending[0].retry_count, 0);
}

#[test]
fn test_update_requires_existing_record() {
    let dir = TempDir::new().unwrap();
    let queue = OfflineQueue::open(dir.path()).unwrap();

    let record = create_test_record("healthy", 99.0);
    assert!(queue.update(&record).is_err());

    queue.insert(&record).unwrap();
    let mut updated = record.clone();
    updated.transition(SyncState::Syncing).unwrap();
    queue.update(&updated).unwrap();

    assert_eq!(queue.get(&record.id).unwrap().unwrap().sync_state, SyncState::Syncing);
}

#[test]
fn test_compact_drops_synced_records() {
    let dir = TempDir::new().unwrap();
    let queue = OfflineQueue::open(dir.path()).unwrap();

    let mut synced = create_test_record("cordana", 80.0);
    let pending = create_test_record("moko", 70.0);
    queue.insert(&synced).unwrap();
    queue.insert(&pending).unwrap();

    synced.transition(SyncState::Syncing).unwrap();
    synced.transition(SyncState::Synced).unwrap();
    queue.update(&synced).unwrap();

    let removed = queue.compact().unwrap();
    assert_eq!(removed, 1);

    let remaining = queue.list_all().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, pending.id);
}

#[test]
fn test_list_pending_excludes_terminal_and_exhausted() {
    let dir = TempDir::new().unwrap();
    let queue = OfflineQueue::open(dir.path()).unwrap();

    let fresh = create_test_record("healthy", 95.0);
    queue.insert(&fresh).unwrap();

    let mut terminal = create_test_record("cordana", 60.0);
    queue.insert(&terminal).unwrap();
    for _ in 0..3 {
        terminal.transition(SyncState::Syncing).unwrap();
        terminal.record_failure(3).unwrap();
    }
    assert_eq!(terminal.sync_state, SyncState::FailedTerminal);
    queue.update(&terminal).unwrap();

    let pending = queue.list_pending(3).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, fresh.id);
}

#[test]
fn test_list_pending_is_fifo_by_creation_time() {
    let dir = TempDir::new().unwrap();
    let queue = OfflineQueue::open(dir.path()).unwrap();

    let mut older = create_test_record("moko", 70.0);
    older.timestamp = Utc::now() - Duration::minutes(10);
    let newer = create_test_record("cordana", 80.0);

    // Insert out of order; listing must come back oldest first.
    queue.insert(&newer).unwrap();
    queue.insert(&older).unwrap();

    let pending = queue.list_pending(3).unwrap();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].id, older.id);
    assert_eq!(pending[1].id, newer.id);
}

#[test]
fn test_stats_counts_states() {
    let dir = TempDir::new().unwrap();
    let queue = OfflineQueue::open(dir.path()).unwrap();

    queue.insert(&create_test_record("healthy", 90.0)).unwrap();

    let mut terminal = create_test_record("moko", 55.0);
    queue.insert(&terminal).unwrap();
    for _ in 0..3 {
        terminal.transition(SyncState::Syncing).unwrap();
        terminal.record_failure(3).unwrap();
    }
    queue.update(&terminal).unwrap();

    let stats = queue.stats(3).unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.terminal, 1);
}
