//! Durable offline queue.
//!
//! Sled-backed store of scan records keyed by record id. Survives process
//! restarts; a record is removed only by compaction after the backend has
//! confirmed receipt. Records left in `Syncing` by an interrupted process
//! are rolled back to retryable on open so they stay eligible for the next
//! pass. Values are JSON so the schema can evolve without a migration step.

use crate::error::{Result, ScanError};
use crate::record::{ScanRecord, SyncState};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

const QUEUE_TREE: &str = "scan_queue";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub total: usize,
    pub pending: usize,
    pub terminal: usize,
}

pub struct OfflineQueue {
    tree: sled::Tree,
    _db: sled::Db,
}

impl OfflineQueue {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = sled::open(path)?;
        let tree = db.open_tree(QUEUE_TREE)?;
        let queue = Self { tree, _db: db };

        let recovered = queue.recover_interrupted()?;
        if recovered > 0 {
            warn!(recovered, "Rolled back records interrupted mid-sync");
        }
        info!(records = queue.tree.len(), "Offline queue opened");
        Ok(queue)
    }

    /// Roll back records a previous process left in `Syncing`: the delivery
    /// outcome is unknown, so they become retryable without consuming a
    /// retry attempt.
    fn recover_interrupted(&self) -> Result<usize> {
        let mut recovered = 0;
        for entry in self.tree.iter() {
            let (key, bytes) = entry?;
            let mut record: ScanRecord = serde_json::from_slice(&bytes)?;
            if record.sync_state == SyncState::Syncing {
                record.transition(SyncState::FailedRetryable)?;
                self.tree.insert(key, serde_json::to_vec(&record)?)?;
                recovered += 1;
            }
        }
        if recovered > 0 {
            self.tree.flush()?;
        }
        Ok(recovered)
    }

    /// Insert a new record. Refuses to silently overwrite an existing id:
    /// exactly one record exists per scan action.
    pub fn insert(&self, record: &ScanRecord) -> Result<()> {
        if self.tree.contains_key(record.id.as_bytes())? {
            return Err(ScanError::Storage(format!(
                "record {} already queued",
                record.id
            )));
        }
        let value = serde_json::to_vec(record)?;
        self.tree.insert(record.id.as_bytes(), value)?;
        self.tree.flush()?;
        debug!(record_id = %record.id, "Record enqueued");
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Option<ScanRecord>> {
        match self.tree.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Replace an existing record by id.
    pub fn update(&self, record: &ScanRecord) -> Result<()> {
        if !self.tree.contains_key(record.id.as_bytes())? {
            return Err(ScanError::RecordNotFound(record.id.clone()));
        }
        let value = serde_json::to_vec(record)?;
        self.tree.insert(record.id.as_bytes(), value)?;
        self.tree.flush()?;
        Ok(())
    }

    /// All records, FIFO by creation timestamp.
    pub fn list_all(&self) -> Result<Vec<ScanRecord>> {
        let mut records = Vec::with_capacity(self.tree.len());
        for entry in self.tree.iter() {
            let (_, bytes) = entry?;
            records.push(serde_json::from_slice::<ScanRecord>(&bytes)?);
        }
        records.sort_by_key(|r| r.timestamp);
        Ok(records)
    }

    /// Records eligible for an automatic sync attempt, FIFO by creation
    /// timestamp: not yet synced, not terminal, below the retry ceiling.
    pub fn list_pending(&self, max_retries: u32) -> Result<Vec<ScanRecord>> {
        let mut records: Vec<ScanRecord> = self
            .list_all()?
            .into_iter()
            .filter(|r| r.is_pending(max_retries))
            .collect();
        records.sort_by_key(|r| r.timestamp);
        Ok(records)
    }

    /// Drop every synced record. Called right after each successful
    /// delivery so confirmed records never accumulate locally.
    pub fn compact(&self) -> Result<usize> {
        let mut removed = 0;
        for entry in self.tree.iter() {
            let (key, bytes) = entry?;
            let record: ScanRecord = serde_json::from_slice(&bytes)?;
            if record.sync_state == SyncState::Synced {
                self.tree.remove(key)?;
                removed += 1;
            }
        }
        if removed > 0 {
            self.tree.flush()?;
            debug!(removed, "Compacted synced records");
        }
        Ok(removed)
    }

    pub fn stats(&self, max_retries: u32) -> Result<QueueStats> {
        let records = self.list_all()?;
        let stats = QueueStats {
            total: records.len(),
            pending: records.iter().filter(|r| r.is_pending(max_retries)).count(),
            terminal: records
                .iter()
                .filter(|r| r.sync_state == SyncState::FailedTerminal)
                .count(),
        };
        crate::metrics::QUEUE_PENDING.set(stats.pending as i64);
        Ok(stats)
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}
