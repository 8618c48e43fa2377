// src/services/gemini.rs
//
// Shared client for the Gemini generateContent REST endpoint, plus the
// token-to-cost accounting applied to every classification and pricing call.
use reqwest::Client;
use serde_json::Value;

use crate::errors::GarimpoError;
use crate::models::AnalysisUsage;

pub const GEMINI_MODEL: &str = "gemini-2.5-flash";

// Gemini 2.5 Flash list prices per 1M tokens (USD).
const PRICE_INPUT_PER_MILLION: f64 = 0.15;
const PRICE_OUTPUT_PER_MILLION: f64 = 0.60;
const PRICE_THINKING_PER_MILLION: f64 = 3.5;
pub const USD_TO_BRL: f64 = 5.8;

pub struct GeminiClient {
    api_key: String,
    client: Client,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: Client::new(),
        }
    }

    pub async fn generate_content(&self, body: Value) -> Result<Value, GarimpoError> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            GEMINI_MODEL
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GarimpoError::Upstream(format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(GarimpoError::Upstream(format!(
                "Gemini error ({}): {}",
                status, error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| GarimpoError::Upstream(format!("Failed to parse Gemini response: {}", e)))
    }
}

/// Concatenated text of the first candidate, or None when the model
/// returned no usable content.
pub fn response_text(response: &Value) -> Option<String> {
    let parts = response["candidates"][0]["content"]["parts"].as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|p| p["text"].as_str())
        .collect::<Vec<_>>()
        .join("");
    if text.is_empty() { None } else { Some(text) }
}

/// Derives the usage snapshot from `usageMetadata`. Every missing field
/// defaults to 0. Candidate tokens include thinking tokens, so the billable
/// output count is candidates minus thoughts; the raw subtraction is kept
/// even if a misreporting host makes it negative, since the cost formula is
/// defined on exactly that difference.
pub fn build_usage(meta: Option<&Value>) -> AnalysisUsage {
    let count = |field: &str| -> u64 {
        meta.and_then(|m| m[field].as_u64()).unwrap_or(0)
    };

    let prompt_tokens = count("promptTokenCount");
    let candidates_tokens = count("candidatesTokenCount");
    let thoughts_tokens = count("thoughtsTokenCount");
    let total_tokens = count("totalTokenCount");

    let output_tokens = candidates_tokens as f64 - thoughts_tokens as f64;

    let cost_usd = (prompt_tokens as f64 / 1_000_000.0) * PRICE_INPUT_PER_MILLION
        + (output_tokens / 1_000_000.0) * PRICE_OUTPUT_PER_MILLION
        + (thoughts_tokens as f64 / 1_000_000.0) * PRICE_THINKING_PER_MILLION;

    AnalysisUsage {
        prompt_token_count: prompt_tokens,
        candidates_token_count: candidates_tokens,
        total_token_count: total_tokens,
        thoughts_token_count: thoughts_tokens,
        estimated_cost_usd: cost_usd,
        estimated_cost_brl: cost_usd * USD_TO_BRL,
    }
}
