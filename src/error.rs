use thiserror::Error;

/// Geolocation failure reasons, each surfaced with its own user-facing message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Position unavailable")]
    PositionUnavailable,

    #[error("Location request timed out")]
    Timeout,

    #[error("Geolocation is not supported on this platform")]
    Unsupported,
}

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Model load failed: {0}")]
    ModelLoad(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Geolocation failed: {0}")]
    Location(#[from] LocationError),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Remote service returned {status}: {body}")]
    RemoteStatus { status: u16, body: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid sync state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("A scan is already in progress")]
    ScanInProgress,

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ScanError {
    /// Whether the retry layer may re-attempt the failed operation.
    /// Only transport-level failures qualify; rejections, bad input and
    /// invalid states are permanent.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ScanError::Network(_)
                | ScanError::Timeout(_)
                | ScanError::RemoteStatus { status: 500..=599, .. }
        )
    }
}

impl From<reqwest::Error> for ScanError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ScanError::Timeout(err.to_string())
        } else {
            ScanError::Network(err.to_string())
        }
    }
}

impl From<sled::Error> for ScanError {
    fn from(err: sled::Error) -> Self {
        ScanError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for ScanError {
    fn from(err: serde_json::Error) -> Self {
        ScanError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
