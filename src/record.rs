//! Scan record model.
//!
//! A `ScanRecord` is the unit of work flowing through the pipeline: created
//! in memory once classification is accepted, enqueued durably when the
//! online path is unavailable, and deleted only after the backend confirms
//! receipt. Sync state lives in a validated tagged enum rather than loose
//! counters so an invalid combination (synced yet still retrying) cannot be
//! represented.

use crate::error::{Result, ScanError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One (label, confidence) pair produced by the local classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,
    /// Confidence as a percentage with 2-decimal precision.
    pub percentage: f64,
}

/// Ranked label list, descending by percentage, ties broken by the fixed
/// label declaration order. Produced once, immutable thereafter.
pub type RankedLabels = Vec<LabelScore>;

/// Device coordinates captured after the gate accepts a scan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Reported accuracy in meters, if the provider knows it.
    pub accuracy: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

/// Delivery state of a record. Transitions are monotonic except for the
/// Pending -> Syncing -> FailedRetryable -> Syncing cycle; Synced is
/// terminal and triggers local deletion via compaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncState {
    Pending,
    Syncing,
    Synced,
    FailedRetryable,
    FailedTerminal,
}

impl SyncState {
    fn can_transition(self, next: SyncState) -> bool {
        use SyncState::*;
        matches!(
            (self, next),
            (Pending, Syncing)
                | (Syncing, Synced)
                | (Syncing, FailedRetryable)
                | (Syncing, FailedTerminal)
                | (FailedRetryable, Syncing)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncState::Pending => "pending",
            SyncState::Syncing => "syncing",
            SyncState::Synced => "synced",
            SyncState::FailedRetryable => "failed_retryable",
            SyncState::FailedTerminal => "failed_terminal",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRecord {
    /// Locally generated, stable across retries.
    pub id: String,
    /// Creation time, immutable.
    pub timestamp: DateTime<Utc>,
    /// Captured image bytes, base64-encoded. Owned by the record until the
    /// upload is confirmed; re-uploaded from here on every retry.
    pub image_b64: String,
    pub ranked_labels: RankedLabels,
    pub location: GeoFix,
    pub sync_state: SyncState,
    pub retry_count: u32,
    pub last_sync_attempt: Option<DateTime<Utc>>,
}

impl ScanRecord {
    pub fn new(image_b64: String, ranked_labels: RankedLabels, location: GeoFix) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            image_b64,
            ranked_labels,
            location,
            sync_state: SyncState::Pending,
            retry_count: 0,
            last_sync_attempt: None,
        }
    }

    /// Top-ranked label. `ranked_labels` is produced non-empty by the
    /// classifier, so this only fails for hand-built records.
    pub fn top_label(&self) -> Option<&LabelScore> {
        self.ranked_labels.first()
    }

    /// Apply a validated sync state transition.
    pub fn transition(&mut self, next: SyncState) -> Result<()> {
        if !self.sync_state.can_transition(next) {
            return Err(ScanError::InvalidTransition {
                from: self.sync_state.as_str().to_string(),
                to: next.as_str().to_string(),
            });
        }
        self.sync_state = next;
        Ok(())
    }

    /// Record a failed delivery attempt: bump the retry counter, stamp the
    /// attempt time, and move to the retryable or terminal failed state
    /// depending on the configured ceiling.
    pub fn record_failure(&mut self, max_retries: u32) -> Result<()> {
        self.retry_count += 1;
        self.last_sync_attempt = Some(Utc::now());
        if self.retry_count >= max_retries {
            self.transition(SyncState::FailedTerminal)
        } else {
            self.transition(SyncState::FailedRetryable)
        }
    }

    /// Eligible for an automatic sync attempt.
    pub fn is_pending(&self, max_retries: u32) -> bool {
        !matches!(
            self.sync_state,
            SyncState::Synced | SyncState::FailedTerminal | SyncState::Syncing
        ) && self.retry_count < max_retries
    }
}
