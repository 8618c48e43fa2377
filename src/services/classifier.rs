// src/services/classifier.rs
//
// Builds the schema-constrained classification request (instruction block,
// response schema, inline image parts) and validates/normalizes the model's
// structured reply into a GarmentClassification.
use std::sync::Arc;

use log::warn;
use serde_json::{Value, json};

use crate::errors::GarimpoError;
use crate::models::{AnalysisUsage, GarmentClassification};
use crate::services::gemini::{GeminiClient, build_usage, response_text};
use crate::taxonomy::*;

pub const MAX_IMAGES: usize = 3;

#[derive(Debug, Clone)]
pub struct ImagePayload {
    /// Base64-encoded image bytes.
    pub base64_data: String,
    pub mime_type: String,
}

pub struct Classifier {
    gemini: Arc<GeminiClient>,
}

impl Classifier {
    pub fn new(gemini: Arc<GeminiClient>) -> Self {
        Self { gemini }
    }

    pub async fn classify(
        &self,
        images: &[ImagePayload],
        hint: Option<&str>,
    ) -> Result<(GarmentClassification, AnalysisUsage), GarimpoError> {
        let request = build_request(images, hint)?;
        let response = self.gemini.generate_content(request).await?;
        parse_response(&response)
    }
}

/// Assembles the full generateContent body. Fails only on caller contract
/// violations (zero images, too many images, empty media type); a
/// well-formed input always builds.
pub fn build_request(images: &[ImagePayload], hint: Option<&str>) -> Result<Value, GarimpoError> {
    if images.is_empty() {
        return Err(GarimpoError::InvalidInput(
            "at least one image is required".into(),
        ));
    }
    if images.len() > MAX_IMAGES {
        return Err(GarimpoError::InvalidInput(format!(
            "at most {} images per analysis",
            MAX_IMAGES
        )));
    }
    if images.iter().any(|i| i.mime_type.trim().is_empty()) {
        return Err(GarimpoError::InvalidInput("image media type missing".into()));
    }

    let mut parts = vec![json!({ "text": build_prompt(hint) })];
    for img in images {
        parts.push(json!({
            "inline_data": {
                "mime_type": img.mime_type,
                "data": img.base64_data,
            }
        }));
    }

    Ok(json!({
        "contents": [{ "role": "user", "parts": parts }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": response_schema(),
            "temperature": 0.2,
        }
    }))
}

/// Validates the raw model reply: `EmptyResponse` when no text came back,
/// `MalformedResult` when the text is not a decodable classification.
/// Normalization applies the category-conditional omission rules and the
/// pockets invariant, then derives the usage snapshot.
pub fn parse_response(
    response: &Value,
) -> Result<(GarmentClassification, AnalysisUsage), GarimpoError> {
    let text = response_text(response).ok_or(GarimpoError::EmptyResponse)?;

    let mut classification: GarmentClassification =
        serde_json::from_str(&text).map_err(|e| GarimpoError::MalformedResult(e.to_string()))?;
    classification.normalize();

    if !classification.composition_is_consistent() {
        warn!(
            "composition percentages do not sum to 100 for '{}'",
            classification.suggested_title
        );
    }

    let usage = build_usage(response.get("usageMetadata"));
    Ok((classification, usage))
}

fn build_prompt(hint: Option<&str>) -> String {
    let mut prompt = format!(
        r#"You are a fashion cataloging specialist for a secondhand resale platform. Analyze the provided garment photos (they may show front, back and fabric close-ups of the same item) and return ONLY a JSON object following these rules:

suggestedTitle: a short, attractive listing title (maximum 80 characters) including the category, primary color and one distinguishing feature of the piece.

suggestedDescription: a commercial listing description (2 to 4 sentences) highlighting material, drape, styling details and occasions of use.

brand (OPTIONAL): only if a brand is identifiable from a visible tag, logo or print. Omit the field otherwise.

color: object with "primary" (exactly one of: [{colors}]), "secondary" (list from the same vocabulary), "pattern" (list of: [{patterns}]) and "is_multicolor" (boolean).

categories: object with "department" (list of: [{departments}]; a piece may target several audiences), "main" (exactly one of: [{mains}]) and "sub" (list of: [{subs}]).

shape (CONDITIONAL): list of: [{shapes}].
fit (CONDITIONAL): list of: [{fits}].

condition: exactly one of: [{conditions}].

sleeve (CONDITIONAL): object with "length" (one of: [{sleeve_lengths}]), "type" (list of: [{sleeve_types}]) and "construction" (one of: [{sleeve_constructions}]).

aesthetics: list of: [{aesthetics}].
occasion: list of: [{occasions}].

length: exactly one of: [{lengths}]. Use "standard" for items where a length classification does not apply.

neckline (CONDITIONAL): exactly one of: [{necklines}].
backDetails (CONDITIONAL): list of: [{back_details}].

finish: list of: [{finishes}].
closure: list of: [{closures}].

composition: list of objects {{"fiber": one of [{fibers}], "percentage": number}}. The percentages MUST sum to exactly 100. Use "unknown" at 100 when the fabric cannot be determined.

pockets: ALWAYS present, as {{"has_pockets": boolean, "quantity": integer, "types": list of [{pocket_types}]}}. When the piece has no pockets, return has_pockets=false, quantity=0 and types=["none"]; never omit this object.

analysis_reasoning: a short note on the visual evidence behind your classification.

CONDITIONAL FIELD RULES (follow strictly):
- Top-half and full-body clothing (tops, shirts, dresses, outerwear, knitwear, jumpsuits): include ALL fields.
- Bottom-half clothing (bottoms, skirts, shorts): OMIT "sleeve", "neckline" and "backDetails" entirely.
- Shoes, accessories, jewelry and bags: additionally OMIT "shape" and "fit".

IMPORTANT:
- Consider ALL provided images together for a single, complete analysis.
- Use ONLY values from the vocabularies above for enum fields. Never invent tokens.
- For list fields, include EVERY applicable value, not just one.
- suggestedTitle and suggestedDescription are free text; be commercial and specific."#,
        colors = Color::token_list(),
        patterns = Pattern::token_list(),
        departments = Department::token_list(),
        mains = MainCategory::token_list(),
        subs = SubCategory::token_list(),
        shapes = Shape::token_list(),
        fits = Fit::token_list(),
        conditions = Condition::token_list(),
        sleeve_lengths = SleeveLength::token_list(),
        sleeve_types = SleeveType::token_list(),
        sleeve_constructions = SleeveConstruction::token_list(),
        aesthetics = Aesthetic::token_list(),
        occasions = Occasion::token_list(),
        lengths = GarmentLength::token_list(),
        necklines = Neckline::token_list(),
        back_details = BackDetail::token_list(),
        finishes = Finish::token_list(),
        closures = Closure::token_list(),
        fibers = FabricFiber::token_list(),
        pocket_types = PocketType::token_list(),
    );

    if let Some(hint) = hint.map(str::trim).filter(|h| !h.is_empty()) {
        prompt.push_str(&format!(
            "\n\nADDITIONAL USER CONTEXT:\nThe user described the piece as: \"{}\"\nReconcile this description with the visual evidence when classifying; the schema and vocabularies above still apply unchanged.",
            hint
        ));
    }

    prompt
}

fn enum_string(tokens: Vec<&'static str>) -> Value {
    json!({ "type": "STRING", "enum": tokens })
}

fn enum_array(tokens: Vec<&'static str>) -> Value {
    json!({ "type": "ARRAY", "items": { "type": "STRING", "enum": tokens } })
}

/// Machine-checkable response schema mirroring GarmentClassification,
/// enforced host-side via responseSchema.
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "suggestedTitle": { "type": "STRING" },
            "suggestedDescription": { "type": "STRING" },
            "brand": { "type": "STRING" },
            "color": {
                "type": "OBJECT",
                "properties": {
                    "primary": enum_string(Color::tokens()),
                    "secondary": enum_array(Color::tokens()),
                    "pattern": enum_array(Pattern::tokens()),
                    "is_multicolor": { "type": "BOOLEAN" },
                },
                "required": ["primary", "secondary", "pattern", "is_multicolor"],
            },
            "categories": {
                "type": "OBJECT",
                "properties": {
                    "department": enum_array(Department::tokens()),
                    "main": enum_string(MainCategory::tokens()),
                    "sub": enum_array(SubCategory::tokens()),
                },
                "required": ["department", "main", "sub"],
            },
            "shape": enum_array(Shape::tokens()),
            "fit": enum_array(Fit::tokens()),
            "condition": enum_string(Condition::tokens()),
            "sleeve": {
                "type": "OBJECT",
                "properties": {
                    "length": enum_string(SleeveLength::tokens()),
                    "type": enum_array(SleeveType::tokens()),
                    "construction": enum_string(SleeveConstruction::tokens()),
                },
                "required": ["length", "type", "construction"],
            },
            "aesthetics": enum_array(Aesthetic::tokens()),
            "occasion": enum_array(Occasion::tokens()),
            "length": enum_string(GarmentLength::tokens()),
            "neckline": enum_string(Neckline::tokens()),
            "backDetails": enum_array(BackDetail::tokens()),
            "finish": enum_array(Finish::tokens()),
            "closure": enum_array(Closure::tokens()),
            "composition": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "fiber": enum_string(FabricFiber::tokens()),
                        "percentage": { "type": "NUMBER" },
                    },
                    "required": ["fiber", "percentage"],
                },
            },
            "pockets": {
                "type": "OBJECT",
                "properties": {
                    "has_pockets": { "type": "BOOLEAN" },
                    "quantity": { "type": "INTEGER" },
                    "types": enum_array(PocketType::tokens()),
                },
                "required": ["has_pockets", "quantity", "types"],
            },
            "analysis_reasoning": { "type": "STRING" },
        },
        "required": [
            "suggestedTitle",
            "suggestedDescription",
            "color",
            "categories",
            "condition",
            "aesthetics",
            "occasion",
            "length",
            "finish",
            "closure",
            "composition",
            "pockets",
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_image() -> Vec<ImagePayload> {
        vec![ImagePayload {
            base64_data: "aGVsbG8=".into(),
            mime_type: "image/jpeg".into(),
        }]
    }

    fn dress_response_text() -> String {
        serde_json::json!({
            "suggestedTitle": "Black Strapless Cocktail Dress",
            "suggestedDescription": "Sleek strapless sheath dress in black crepe.",
            "color": {
                "primary": "black",
                "secondary": [],
                "pattern": ["solid"],
                "is_multicolor": false
            },
            "categories": {
                "department": ["women"],
                "main": "clothing",
                "sub": ["dresses", "party_dresses"]
            },
            "shape": [],
            "fit": ["bodycon"],
            "condition": "very_good",
            "sleeve": {
                "length": "strapless",
                "type": [],
                "construction": "set-in"
            },
            "aesthetics": ["glam"],
            "occasion": ["party", "night_out"],
            "length": "midi",
            "neckline": "strapless",
            "backDetails": ["closed"],
            "finish": ["smooth"],
            "closure": ["hidden_zipper"],
            "composition": [
                {"fiber": "polyester", "percentage": 95},
                {"fiber": "elastane", "percentage": 5}
            ],
            "pockets": {"has_pockets": false, "quantity": 0, "types": ["none"]},
            "analysis_reasoning": "Strapless neckline and crepe texture visible."
        })
        .to_string()
    }

    fn wrap_as_response(text: &str) -> Value {
        serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": text }] } }],
            "usageMetadata": {
                "promptTokenCount": 1200,
                "candidatesTokenCount": 800,
                "thoughtsTokenCount": 300,
                "totalTokenCount": 2000
            }
        })
    }

    #[test]
    fn zero_images_is_a_contract_violation() {
        assert!(matches!(
            build_request(&[], None),
            Err(GarimpoError::InvalidInput(_))
        ));
    }

    #[test]
    fn more_than_three_images_is_rejected() {
        let images: Vec<ImagePayload> = (0..4)
            .map(|_| ImagePayload {
                base64_data: "aGVsbG8=".into(),
                mime_type: "image/png".into(),
            })
            .collect();
        assert!(matches!(
            build_request(&images, None),
            Err(GarimpoError::InvalidInput(_))
        ));
    }

    #[test]
    fn request_carries_prompt_schema_and_images_in_order() {
        let request = build_request(&one_image(), None).unwrap();
        let parts = request["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert!(parts[0]["text"].as_str().unwrap().contains("suggestedTitle"));
        assert_eq!(parts[1]["inline_data"]["mime_type"], "image/jpeg");
        assert_eq!(
            request["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert!(request["generationConfig"]["responseSchema"].is_object());
    }

    #[test]
    fn prompt_spells_out_conditional_rules_and_vocabularies() {
        let request = build_request(&one_image(), None).unwrap();
        let prompt = request["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(prompt.contains("OMIT \"sleeve\", \"neckline\" and \"backDetails\""));
        assert!(prompt.contains("OMIT \"shape\" and \"fit\""));
        assert!(prompt.contains("never omit this object"));
        assert!(prompt.contains("women, men, unisex, kids"));
        assert!(prompt.contains("3/4"));
    }

    #[test]
    fn blank_hint_is_ignored_and_real_hint_is_appended() {
        let without = build_request(&one_image(), Some("   ")).unwrap();
        let prompt = without["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(!prompt.contains("ADDITIONAL USER CONTEXT"));

        let with = build_request(&one_image(), Some(" vestido de festa ")).unwrap();
        let prompt = with["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(prompt.contains("ADDITIONAL USER CONTEXT"));
        assert!(prompt.contains("\"vestido de festa\""));
        assert!(prompt.contains("Reconcile"));
    }

    #[test]
    fn schema_keeps_conditional_fields_out_of_required() {
        let schema = response_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        for always in ["suggestedTitle", "condition", "length", "pockets", "composition"] {
            assert!(required.contains(&always), "{} must be required", always);
        }
        for conditional in ["brand", "shape", "fit", "sleeve", "neckline", "backDetails"] {
            assert!(
                !required.contains(&conditional),
                "{} must stay optional",
                conditional
            );
        }
    }

    #[test]
    fn dress_response_parses_with_empty_shape_list() {
        let response = wrap_as_response(&dress_response_text());
        let (classification, usage) = parse_response(&response).unwrap();
        assert_eq!(classification.categories.main, MainCategory::Clothing);
        assert_eq!(classification.color.primary, Color::Black);
        assert!(classification.neckline.is_some());
        assert_eq!(classification.shape, Some(vec![]));
        assert_eq!(usage.prompt_token_count, 1200);
        assert_eq!(usage.thoughts_token_count, 300);
        assert!(usage.estimated_cost_usd > 0.0);
    }

    #[test]
    fn trousers_response_without_sleeve_fields_parses_as_absent() {
        let text = serde_json::json!({
            "suggestedTitle": "Straight Navy Trousers",
            "suggestedDescription": "Classic straight-leg trousers.",
            "color": {"primary": "navy_blue", "secondary": [], "pattern": ["solid"], "is_multicolor": false},
            "categories": {"department": ["men"], "main": "clothing", "sub": ["bottoms"]},
            "shape": ["straight"],
            "fit": ["regular"],
            "condition": "good",
            "aesthetics": ["classic"],
            "occasion": ["work"],
            "length": "standard",
            "finish": ["smooth"],
            "closure": ["zipper", "button"],
            "composition": [{"fiber": "wool", "percentage": 100}],
            "pockets": {"has_pockets": true, "quantity": 4, "types": ["front_pockets", "back_pockets"]}
        })
        .to_string();
        let (classification, _) = parse_response(&wrap_as_response(&text)).unwrap();
        assert!(classification.sleeve.is_none());
        assert!(classification.neckline.is_none());
        assert!(classification.back_details.is_none());
        assert!(classification.shape.is_some());
    }

    #[test]
    fn empty_response_fails_as_empty_response() {
        let response = serde_json::json!({ "candidates": [] });
        assert!(matches!(
            parse_response(&response),
            Err(GarimpoError::EmptyResponse)
        ));
    }

    #[test]
    fn non_json_text_fails_as_malformed_result() {
        let response = wrap_as_response("sorry, I cannot classify this");
        assert!(matches!(
            parse_response(&response),
            Err(GarimpoError::MalformedResult(_))
        ));
    }
}
