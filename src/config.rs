use crate::error::{Result, ScanError};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Runtime platform. Injected into components instead of a module-level
/// detection flag so the pipeline is testable under both configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Platform {
    Native,
    Web,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub platform: Platform,
    pub model_path: String,
    pub data_dir: String,
    pub endpoints: EndpointConfig,
    pub sync_config: SyncConfig,
    /// Geolocation request timeout.
    pub location_timeout_secs: u64,
    /// Timeout applied to every outbound HTTP call.
    pub http_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Scan record submission (POST JSON).
    pub scan_url: String,
    /// Image upload (POST multipart, returns publicUrl).
    pub upload_url: String,
    /// Secondary object-class verifier (POST base64 JSON).
    pub verifier_url: String,
    /// Reverse geocoding (GET with lat/lon query params), best-effort.
    pub geocode_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Retry ceiling per record before it becomes terminal.
    pub max_retries: u32,
    /// Pacing delay between records in one sync pass.
    pub pacing_ms: u64,
    /// Delay between observing a reconnect and starting the auto pass.
    pub reconnect_debounce_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            pacing_ms: 1000,
            reconnect_debounce_ms: 2000,
        }
    }
}

impl SyncConfig {
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    pub fn reconnect_debounce(&self) -> Duration {
        Duration::from_millis(self.reconnect_debounce_ms)
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let platform = match env::var("SCAN_PLATFORM")
            .unwrap_or_else(|_| "native".to_string())
            .to_lowercase()
            .as_str()
        {
            "web" => Platform::Web,
            _ => Platform::Native,
        };

        let model_path =
            env::var("MODEL_PATH").unwrap_or_else(|_| "models/banana_disease.onnx".to_string());

        let data_dir = env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string());

        let api_base =
            env::var("API_BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());

        let scan_url =
            env::var("SCAN_URL").unwrap_or_else(|_| format!("{}/api/scan", api_base));
        let upload_url =
            env::var("UPLOAD_URL").unwrap_or_else(|_| format!("{}/api/upload", api_base));
        let verifier_url =
            env::var("VERIFIER_URL").unwrap_or_else(|_| format!("{}/api/verify", api_base));
        let geocode_url = env::var("GEOCODE_URL")
            .unwrap_or_else(|_| "https://nominatim.openstreetmap.org/reverse".to_string());

        let max_retries = env_parse("MAX_SYNC_RETRIES", 3)?;
        let pacing_ms = env_parse("SYNC_PACING_MS", 1000)?;
        let reconnect_debounce_ms = env_parse("RECONNECT_DEBOUNCE_MS", 2000)?;
        let location_timeout_secs = env_parse("LOCATION_TIMEOUT_SECS", 15)?;
        let http_timeout_secs = env_parse("HTTP_TIMEOUT_SECS", 30)?;

        Ok(Self {
            platform,
            model_path,
            data_dir,
            endpoints: EndpointConfig {
                scan_url,
                upload_url,
                verifier_url,
                geocode_url,
            },
            sync_config: SyncConfig {
                max_retries,
                pacing_ms,
                reconnect_debounce_ms,
            },
            location_timeout_secs,
            http_timeout_secs,
        })
    }
}

/// Read a numeric env var with a default for absence. A present but
/// malformed value is a configuration error, not a silent fallback.
fn env_parse<T: FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ScanError::Config(format!("invalid value for {}: {}", key, raw))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env-var tests mutate process-wide state, so they are serialized.
    #[test]
    #[serial_test::serial]
    fn test_load_uses_defaults_when_unset() {
        env::remove_var("MAX_SYNC_RETRIES");
        env::remove_var("HTTP_TIMEOUT_SECS");

        let config = Config::load().unwrap();
        assert_eq!(config.sync_config.max_retries, 3);
        assert_eq!(config.http_timeout_secs, 30);
        assert_eq!(config.platform, Platform::Native);
    }

    #[test]
    #[serial_test::serial]
    fn test_malformed_numeric_value_is_rejected() {
        env::set_var("MAX_SYNC_RETRIES", "many");

        let err = Config::load().unwrap_err();
        assert!(matches!(err, ScanError::Config(_)));

        env::remove_var("MAX_SYNC_RETRIES");
    }
}
