//! Decision gate: combines the local and secondary verdicts into a single
//! accept/reject decision.
//!
//! Explicit state machine:
//!
//! ```text
//! AwaitingLocal ──sentinel top label──────────────▶ Rejected
//! AwaitingLocal ──genuine + offline───────────────▶ Accepted
//! AwaitingLocal ──genuine + online────────────────▶ AwaitingVerifier
//! AwaitingVerifier ──verifier confirms────────────▶ Accepted
//! AwaitingVerifier ──verifier disagrees───────────▶ Rejected
//! AwaitingVerifier ──verifier call fails──────────▶ local-only verdict
//! ```
//!
//! A verifier outage must never block scanning, so a failed call degrades
//! to the local verdict alone. On rejection the caller halts the pipeline:
//! no geolocation request, no persistence attempt.

use crate::labels::SENTINEL_LABEL;
use crate::record::RankedLabels;
use crate::verifier::RemoteVerifier;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    AwaitingLocal,
    AwaitingVerifier,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The local classifier's top label is the "not a banana" sentinel.
    NotRecognized,
    /// The verifier disagreed with the local verdict.
    VerifierRejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Accepted {
        /// False when the verifier was skipped (offline) or unreachable.
        remotely_verified: bool,
    },
    Rejected(RejectReason),
}

impl GateDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, GateDecision::Accepted { .. })
    }
}

pub struct DecisionGate {
    verifier: Arc<dyn RemoteVerifier>,
}

impl DecisionGate {
    pub fn new(verifier: Arc<dyn RemoteVerifier>) -> Self {
        Self { verifier }
    }

    /// Walk the gate state machine for one scan.
    pub async fn decide(
        &self,
        ranked: &RankedLabels,
        image_bytes: &[u8],
        online: bool,
    ) -> GateDecision {
        let mut state = GateState::AwaitingLocal;
        debug!(?state, "Evaluating local verdict");

        let local_genuine = ranked
            .first()
            .map(|top| top.label != SENTINEL_LABEL)
            .unwrap_or(false);

        if !local_genuine {
            // Short-circuit: no verifier call is made.
            state = GateState::Rejected;
            debug!(?state, "Top label is the sentinel, rejecting");
            return GateDecision::Rejected(RejectReason::NotRecognized);
        }

        if !online {
            // Offline: the local verdict is trusted alone.
            state = GateState::Accepted;
            debug!(?state, "Offline, accepting on local verdict");
            return GateDecision::Accepted { remotely_verified: false };
        }

        state = GateState::AwaitingVerifier;
        debug!(?state, "Consulting secondary verifier");

        match self.verifier.confirms_subject(image_bytes).await {
            Ok(true) => {
                debug!(state = ?GateState::Accepted, "Verifier confirmed subject");
                GateDecision::Accepted { remotely_verified: true }
            }
            Ok(false) => {
                debug!(state = ?GateState::Rejected, "Verifier disagreed");
                GateDecision::Rejected(RejectReason::VerifierRejected)
            }
            Err(e) => {
                // Degrade gracefully to the local-only verdict.
                warn!(error = %e, "Verifier unreachable, falling back to local verdict");
                GateDecision::Accepted { remotely_verified: false }
            }
        }
    }
}
