//! Secondary object-class verifier.
//!
//! An independent, network-dependent classification service consulted only
//! for a boolean "is the subject actually a banana plant" check before the
//! local verdict is accepted. The verdict taxonomy it returns is its own;
//! this module reduces it to that single boolean.

use crate::error::Result;
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Labels the verifier may return that count as confirmation.
const CONFIRMING_KEYWORDS: [&str; 3] = ["banana", "musa", "plantain"];

/// Minimum verifier confidence for a confirmation to count.
const MIN_CONFIRM_SCORE: f32 = 0.5;

#[async_trait]
pub trait RemoteVerifier: Send + Sync {
    /// Returns true if the service independently confirms the subject class.
    async fn confirms_subject(&self, image_bytes: &[u8]) -> Result<bool>;
}

#[derive(Debug, Serialize)]
struct VerifyRequest {
    image: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifierPrediction {
    pub label: String,
    pub score: f32,
}

/// HTTP implementation posting a base64 image payload.
pub struct HttpVerifier {
    client: reqwest::Client,
    url: String,
}

impl HttpVerifier {
    pub fn new(url: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }

    fn is_confirming(predictions: &[VerifierPrediction]) -> bool {
        predictions
            .iter()
            .max_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal))
            .map(|top| {
                let label = top.label.to_lowercase();
                top.score >= MIN_CONFIRM_SCORE
                    && CONFIRMING_KEYWORDS.iter().any(|kw| label.contains(kw))
            })
            .unwrap_or(false)
    }
}

#[async_trait]
impl RemoteVerifier for HttpVerifier {
    async fn confirms_subject(&self, image_bytes: &[u8]) -> Result<bool> {
        let body = VerifyRequest {
            image: base64::engine::general_purpose::STANDARD.encode(image_bytes),
        };

        let response = self.client.post(&self.url).json(&body).send().await?;
        let predictions: Vec<VerifierPrediction> = response.error_for_status()?.json().await?;

        let confirmed = Self::is_confirming(&predictions);
        debug!(confirmed, count = predictions.len(), "Verifier response evaluated");
        Ok(confirmed)
    }
}
