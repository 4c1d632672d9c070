//! Geolocation acquisition.
//!
//! A scan may only be finalized with a location fix, so the acquirer runs
//! strictly after the decision gate accepts. One high-accuracy request with
//! a hard timeout; every failure reason maps to its own `LocationError`
//! variant so the caller can show a distinct message and a retry affordance.

use crate::config::Platform;
use crate::error::LocationError;
use crate::record::GeoFix;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_position(&self) -> Result<GeoFix, LocationError>;
}

/// Wraps a provider with the single-request timeout policy.
pub struct LocationAcquirer {
    provider: Arc<dyn LocationProvider>,
    timeout: Duration,
}

impl LocationAcquirer {
    pub fn new(provider: Arc<dyn LocationProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    /// Build the acquirer appropriate for the configured platform. Web
    /// builds have no position source of their own here; they must inject
    /// a provider or fail as unsupported.
    pub fn for_platform(platform: Platform, timeout: Duration) -> Self {
        let provider: Arc<dyn LocationProvider> = match platform {
            Platform::Native => Arc::new(EnvFixProvider),
            Platform::Web => Arc::new(UnsupportedProvider),
        };
        Self::new(provider, timeout)
    }

    pub async fn acquire(&self) -> Result<GeoFix, LocationError> {
        let fix = tokio::time::timeout(self.timeout, self.provider.current_position())
            .await
            .map_err(|_| LocationError::Timeout)??;

        debug!(
            latitude = fix.latitude,
            longitude = fix.longitude,
            accuracy = ?fix.accuracy,
            "Location acquired"
        );
        Ok(fix)
    }
}

/// Native fallback provider reading a fixed position from the environment
/// (`DEVICE_LAT` / `DEVICE_LON`). Stands in for a GPS daemon on headless
/// deployments; absent variables report as position-unavailable.
pub struct EnvFixProvider;

#[async_trait]
impl LocationProvider for EnvFixProvider {
    async fn current_position(&self) -> Result<GeoFix, LocationError> {
        let latitude = std::env::var("DEVICE_LAT")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .ok_or(LocationError::PositionUnavailable)?;
        let longitude = std::env::var("DEVICE_LON")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .ok_or(LocationError::PositionUnavailable)?;

        Ok(GeoFix {
            latitude,
            longitude,
            accuracy: None,
            timestamp: Utc::now(),
        })
    }
}

/// Provider for platforms with no geolocation capability.
pub struct UnsupportedProvider;

#[async_trait]
impl LocationProvider for UnsupportedProvider {
    async fn current_position(&self) -> Result<GeoFix, LocationError> {
        Err(LocationError::Unsupported)
    }
}
