//! Backend delivery: the three-step remote submission chain.
//!
//! Upload the image to object storage, resolve a human-readable address
//! from the coordinates (best-effort), then submit the composed record.
//! The caller treats any chain failure as "fall back to the offline queue";
//! nothing here writes a partial record remotely. Retries always re-upload
//! from the locally cached bytes, so a blob orphaned by a failed submit is
//! simply superseded on the next attempt.

use crate::error::{Result, ScanError};
use crate::record::ScanRecord;
use crate::retry::retry_with_linear_backoff;
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Composed record as the backend scan endpoint expects it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSubmission {
    /// Top label confidence.
    pub percentage: f64,
    /// Full ranked label list.
    pub result_arr: Vec<crate::record::LabelScore>,
    /// Top label id.
    pub result: String,
    pub img_url: String,
    pub address: String,
}

/// Remote sink for finalized scan records.
#[async_trait]
pub trait SyncTarget: Send + Sync {
    /// Upload image bytes to object storage; returns the public URL.
    async fn upload_image(&self, bytes: &[u8]) -> Result<String>;

    /// Resolve coordinates to a display address. Callers treat failure as
    /// best-effort and fall back to raw coordinates.
    async fn resolve_address(&self, latitude: f64, longitude: f64) -> Result<String>;

    /// Submit the composed record; any 2xx is success.
    async fn submit(&self, submission: &ScanSubmission) -> Result<()>;
}

/// Run the full submission chain for one record. Uploads run with a short
/// linear retry window for transient blips; the address lookup falls back
/// to raw coordinates on any failure.
pub async fn deliver(target: &dyn SyncTarget, record: &ScanRecord) -> Result<()> {
    let image_bytes = base64::engine::general_purpose::STANDARD
        .decode(&record.image_b64)
        .map_err(|e| ScanError::Serialization(e.to_string()))?;

    let img_url =
        retry_with_linear_backoff(|| target.upload_image(&image_bytes), 2, 500).await?;
    debug!(record_id = %record.id, %img_url, "Image uploaded");

    let address = match target
        .resolve_address(record.location.latitude, record.location.longitude)
        .await
    {
        Ok(address) => address,
        Err(e) => {
            warn!(record_id = %record.id, error = %e, "Address resolution failed, using raw coordinates");
            format!("{},{}", record.location.latitude, record.location.longitude)
        }
    };

    let top = record
        .top_label()
        .ok_or_else(|| ScanError::Serialization("record has no ranked labels".into()))?;

    let submission = ScanSubmission {
        percentage: top.percentage,
        result_arr: record.ranked_labels.clone(),
        result: top.label.clone(),
        img_url,
        address,
    };

    retry_with_linear_backoff(|| target.submit(&submission), 2, 500).await
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    public_url: String,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    display_name: String,
}

/// HTTP implementation of the backend endpoints.
pub struct HttpBackend {
    client: reqwest::Client,
    scan_url: String,
    upload_url: String,
    geocode_url: String,
}

impl HttpBackend {
    pub fn new(
        scan_url: String,
        upload_url: String,
        geocode_url: String,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            scan_url,
            upload_url,
            geocode_url,
        })
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ScanError::RemoteStatus { status: status.as_u16(), body })
        }
    }
}

#[async_trait]
impl SyncTarget for HttpBackend {
    async fn upload_image(&self, bytes: &[u8]) -> Result<String> {
        let part = reqwest::multipart::Part::bytes(bytes.to_vec())
            .file_name("scan.jpg")
            .mime_str("image/jpeg")
            .map_err(|e| ScanError::Serialization(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self.client.post(&self.upload_url).multipart(form).send().await?;
        let body: UploadResponse = Self::check_status(response).await?.json().await?;
        Ok(body.public_url)
    }

    async fn resolve_address(&self, latitude: f64, longitude: f64) -> Result<String> {
        let response = self
            .client
            .get(&self.geocode_url)
            .query(&[
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
                ("format", "json".to_string()),
            ])
            .send()
            .await?;
        let body: GeocodeResponse = Self::check_status(response).await?.json().await?;
        Ok(body.display_name)
    }

    async fn submit(&self, submission: &ScanSubmission) -> Result<()> {
        let response = self.client.post(&self.scan_url).json(submission).send().await?;
        Self::check_status(response).await?;
        Ok(())
    }
}
