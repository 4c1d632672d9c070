pub mod backend;
pub mod config;
pub mod error;
pub mod gate;
pub mod labels;
pub mod location;
pub mod metrics;
pub mod model;
pub mod network;
pub mod pipeline;
pub mod preprocess;
pub mod record;
pub mod retry;
pub mod router;
pub mod store;
pub mod sync_engine;
pub mod verifier;

// Re-export commonly used types for easier testing
pub use crate::backend::{deliver, HttpBackend, ScanSubmission, SyncTarget};
pub use crate::config::{Config, Platform, SyncConfig};
pub use crate::error::{LocationError, Result, ScanError};
pub use crate::gate::{DecisionGate, GateDecision, RejectReason};
pub use crate::location::{LocationAcquirer, LocationProvider};
pub use crate::model::{rank_scores, LocalClassifier, ModelLoader, OnnxClassifier};
pub use crate::network::NetworkMonitor;
pub use crate::pipeline::{ScanOutcome, ScanPipeline};
pub use crate::record::{GeoFix, LabelScore, RankedLabels, ScanRecord, SyncState};
pub use crate::router::{DeliveryOutcome, PersistenceRouter};
pub use crate::store::{OfflineQueue, QueueStats};
pub use crate::sync_engine::{SyncEngine, SyncReport};
pub use crate::verifier::{HttpVerifier, RemoteVerifier};
