// src/services/pricing.rs
//
// Builds the market-research pricing prompt from a persisted analysis and
// parses the free-text reply. The Google Search tool cannot be combined
// with a response schema on this host, so the reply is unstructured text
// and the price object is recovered by balanced-brace extraction.
use std::sync::Arc;

use serde_json::{Value, json};

use crate::errors::GarimpoError;
use crate::models::{AnalysisEntry, AnalysisUsage, PriceEstimate};
use crate::services::gemini::{GeminiClient, build_usage, response_text};

/// Capability flag for the model host: the Gemini API rejects requests
/// that combine the Google Search tool with a constrained responseSchema.
/// If the host ever lifts that restriction, flipping this constrains the
/// reply and the balanced-brace fallback becomes dead weight.
const HOST_COMBINES_SCHEMA_WITH_SEARCH: bool = false;

pub struct PricingService {
    gemini: Arc<GeminiClient>,
}

impl PricingService {
    pub fn new(gemini: Arc<GeminiClient>) -> Self {
        Self { gemini }
    }

    pub async fn estimate(
        &self,
        entry: &AnalysisEntry,
    ) -> Result<(PriceEstimate, AnalysisUsage), GarimpoError> {
        let request = build_request(entry);
        let response = self.gemini.generate_content(request).await?;
        parse_response(&response)
    }
}

pub fn build_request(entry: &AnalysisEntry) -> Value {
    let mut request = json!({
        "contents": [{ "role": "user", "parts": [{ "text": build_prompt(entry) }] }],
        "tools": [{ "google_search": {} }],
        "generationConfig": { "temperature": 0.3 }
    });
    if HOST_COMBINES_SCHEMA_WITH_SEARCH {
        request["generationConfig"]["responseMimeType"] = json!("application/json");
    }
    request
}

fn build_prompt(entry: &AnalysisEntry) -> String {
    let c = &entry.classification;

    let composition = if c.composition.is_empty() {
        "not identified".to_string()
    } else {
        c.composition
            .iter()
            .map(|f| format!("{} {}%", f.fiber, f.percentage))
            .collect::<Vec<_>>()
            .join(", ")
    };

    let brand = c.brand.as_deref().unwrap_or("no brand");
    let shape = c
        .shape
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(|s| s.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", "))
        .unwrap_or_else(|| "N/A".into());
    let fit = c
        .fit
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(|s| s.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", "))
        .unwrap_or_else(|| "N/A".into());
    let patterns = c
        .color
        .pattern
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let subs = c
        .categories
        .sub
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let aesthetics = c
        .aesthetics
        .iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"You are a specialist in the Brazilian second-hand fashion market. Your goal is to provide a precise price estimation based on real-time market data.

### STEP 1: MARKET RESEARCH (MANDATORY)
Use the Google Search tool to find current prices for: "{title}" and similar items from the same brand.
Target platforms: Enjoei, Repassa, Troc, Mercado Livre, and OLX.
Identify the price range (min/max) currently being asked for this type of garment.

### STEP 2: PRODUCT CONTEXT
- **Title:** {title}
- **Brand:** {brand}
- **Condition:** {condition}
- **Category:** {main} ({subs})
- **Details:** {patterns}, {shape}, {fit}
- **Composition:** {composition}
- **Aesthetics:** {aesthetics}

### STEP 3: PRICING LOGIC
1. **Reference Base:** Start with the prices found during your Google Search.
2. **Brand Weight:** Adjust based on the brand's market position (Mass market, Premium, or Luxury).
3. **Depreciation:** Apply discounts based on the provided condition.
4. **Suggested Price:** Define a value that balances fast-selling potential with fair market value.

### STEP 4: OUTPUT RULES
- All currency values must be in BRL (numeric).
- The 'justification' must be in **Portuguese (pt-BR)**, explaining the logic and citing the price references found online.
- RETURN ONLY A RAW JSON OBJECT. NO MARKDOWN, NO PREAMBLE.

### OUTPUT SCHEMA (JSON)
{{
  "min_price": number,
  "max_price": number,
  "suggested_price": number,
  "justification": "string (in pt-BR)"
}}

### EXAMPLE OUTPUT:
{{"min_price": 80, "max_price": 150, "suggested_price": 110, "justification": "Com base em peças similares da Farm encontradas no Enjoei e Repassa, os valores variam entre R$ 90 e R$ 180. Considerando o estado 'muito bom' da peça e sua composição em viscose, sugerimos R$ 110 para uma venda competitiva."}}"#,
        title = c.suggested_title,
        brand = brand,
        condition = c.condition,
        main = c.categories.main,
        subs = subs,
        patterns = patterns,
        shape = shape,
        fit = fit,
        composition = composition,
        aesthetics = aesthetics,
    )
}

/// The reply may wrap the price object in prose or markdown fences; only
/// the first balanced JSON object substring is decoded.
pub fn parse_response(response: &Value) -> Result<(PriceEstimate, AnalysisUsage), GarimpoError> {
    let text = response_text(response).ok_or(GarimpoError::EmptyResponse)?;

    // A well-behaved reply is the bare object; scan for a balanced
    // substring only when the model wrapped it in prose or fences.
    let estimate: PriceEstimate = match serde_json::from_str(text.trim()) {
        Ok(estimate) => estimate,
        Err(_) => {
            let object = extract_json_object(&text).ok_or(GarimpoError::NoJsonFound)?;
            serde_json::from_str(object)
                .map_err(|e| GarimpoError::MalformedResult(e.to_string()))?
        }
    };

    let usage = build_usage(response.get("usageMetadata"));
    Ok((estimate, usage))
}

/// Returns the first balanced `{...}` substring, tracking string literals
/// and escapes so braces inside justification text do not break the scan.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}
