// src/services/tryon.rs
//
// Virtual try-on orchestrator against the Vertex AI predict endpoint.
// Credentials are optional at startup and checked per call: the token comes
// from `gcloud auth print-access-token` and expires hourly, so a missing or
// stale value must not prevent the rest of the service from running.
use std::sync::Arc;
use std::time::Instant;

use base64::{Engine as _, engine::general_purpose};
use reqwest::Client;
use serde_json::{Value, json};

use crate::errors::GarimpoError;
use crate::services::ImageProcessor;
use crate::services::gemini::USD_TO_BRL;

const MODEL_ID: &str = "virtual-try-on-preview-08-04";

/// Flat fee per generated image (USD); the try-on API is not token-billed.
const TRYON_COST_PER_IMAGE_USD: f64 = 0.05;

pub struct TryOnOutcome {
    /// Decoded PNG bytes of the generated composite.
    pub image_png: Vec<u8>,
    pub estimated_cost_usd: f64,
    pub estimated_cost_brl: f64,
    pub elapsed_ms: u64,
}

pub struct TryOnService {
    project_id: Option<String>,
    location: Option<String>,
    access_token: Option<String>,
    image_processor: Arc<ImageProcessor>,
    client: Client,
}

impl TryOnService {
    pub fn new(
        project_id: Option<String>,
        location: Option<String>,
        access_token: Option<String>,
        image_processor: Arc<ImageProcessor>,
    ) -> Self {
        Self {
            project_id,
            location,
            access_token,
            image_processor,
            client: Client::new(),
        }
    }

    pub fn from_env(image_processor: Arc<ImageProcessor>) -> Self {
        Self::new(
            std::env::var("GCP_PROJECT_ID").ok(),
            std::env::var("GCP_LOCATION").ok(),
            std::env::var("GCP_ACCESS_TOKEN").ok(),
            image_processor,
        )
    }

    fn credentials(&self) -> Result<(&str, &str, &str), GarimpoError> {
        match (&self.project_id, &self.location, &self.access_token) {
            (Some(p), Some(l), Some(t)) => Ok((p, l, t)),
            _ => Err(GarimpoError::ConfigurationError(
                "GCP_PROJECT_ID, GCP_LOCATION and GCP_ACCESS_TOKEN must be set for try-on"
                    .to_string(),
            )),
        }
    }

    /// Normalizes both images to the canonical bounded encoding, issues one
    /// prediction request and measures wall-clock latency.
    pub async fn generate(
        &self,
        product_image: &[u8],
        person_image: &[u8],
    ) -> Result<TryOnOutcome, GarimpoError> {
        let (project_id, location, access_token) = self.credentials()?;

        let product_png = self.image_processor.canonical_png(product_image)?;
        let person_png = self.image_processor.canonical_png(person_image)?;

        let endpoint = format!(
            "https://{loc}-aiplatform.googleapis.com/v1/projects/{proj}/locations/{loc}/publishers/google/models/{model}:predict",
            loc = location,
            proj = project_id,
            model = MODEL_ID,
        );

        let body = json!({
            "instances": [{
                "personImage": {
                    "image": { "bytesBase64Encoded": general_purpose::STANDARD.encode(&person_png) }
                },
                "productImages": [{
                    "image": { "bytesBase64Encoded": general_purpose::STANDARD.encode(&product_png) }
                }]
            }],
            "parameters": { "sampleCount": 1 }
        });

        let start = Instant::now();
        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| GarimpoError::Upstream(format!("Vertex AI request failed: {}", e)))?;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(GarimpoError::Upstream(format!(
                "Vertex AI error ({}): {}",
                status, error_text
            )));
        }

        let data: Value = response.json().await.map_err(|e| {
            GarimpoError::Upstream(format!("Failed to parse Vertex AI response: {}", e))
        })?;

        let image_png = parse_prediction(&data)?;
        Ok(TryOnOutcome {
            image_png,
            estimated_cost_usd: TRYON_COST_PER_IMAGE_USD,
            estimated_cost_brl: TRYON_COST_PER_IMAGE_USD * USD_TO_BRL,
            elapsed_ms,
        })
    }
}

/// Extracts the single generated image from `predictions[0]`.
pub fn parse_prediction(data: &Value) -> Result<Vec<u8>, GarimpoError> {
    let predictions = data["predictions"]
        .as_array()
        .filter(|p| !p.is_empty())
        .ok_or(GarimpoError::NoPrediction)?;

    let encoded = predictions[0]["bytesBase64Encoded"]
        .as_str()
        .ok_or_else(|| {
            GarimpoError::InvalidImageData("prediction has no image bytes".to_string())
        })?;

    general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| GarimpoError::InvalidImageData(format!("undecodable image bytes: {}", e)))
}
