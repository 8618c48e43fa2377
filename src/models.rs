// src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::taxonomy::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorProfile {
    pub primary: Color,
    #[serde(default)]
    pub secondary: Vec<Color>,
    #[serde(default)]
    pub pattern: Vec<Pattern>,
    #[serde(default)]
    pub is_multicolor: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySet {
    /// Multi-valued: a garment may target several audiences at once.
    pub department: Vec<Department>,
    pub main: MainCategory,
    #[serde(default)]
    pub sub: Vec<SubCategory>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SleeveInfo {
    pub length: SleeveLength,
    #[serde(rename = "type", default)]
    pub kind: Vec<SleeveType>,
    pub construction: SleeveConstruction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FabricComposition {
    pub fiber: FabricFiber,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pockets {
    #[serde(default)]
    pub has_pockets: bool,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub types: Vec<PocketType>,
}

impl Pockets {
    pub fn none() -> Self {
        Self {
            has_pockets: false,
            quantity: 0,
            types: vec![PocketType::None],
        }
    }
}

/// Canonical structured description of one garment, produced by a single
/// classification call. Field names are the wire contract with the model
/// host and the persisted shape under the analysis history key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GarmentClassification {
    #[serde(rename = "suggestedTitle")]
    pub suggested_title: String,
    #[serde(rename = "suggestedDescription")]
    pub suggested_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,

    pub color: ColorProfile,
    pub categories: CategorySet,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<Vec<Shape>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fit: Option<Vec<Fit>>,
    pub condition: Condition,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sleeve: Option<SleeveInfo>,

    #[serde(default)]
    pub aesthetics: Vec<Aesthetic>,
    #[serde(default)]
    pub occasion: Vec<Occasion>,

    pub length: GarmentLength,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neckline: Option<Neckline>,
    #[serde(rename = "backDetails", default, skip_serializing_if = "Option::is_none")]
    pub back_details: Option<Vec<BackDetail>>,
    #[serde(default)]
    pub finish: Vec<Finish>,
    #[serde(default)]
    pub closure: Vec<Closure>,
    #[serde(default)]
    pub composition: Vec<FabricComposition>,

    pub pockets: Pockets,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_reasoning: Option<String>,
}

impl GarmentClassification {
    /// Geometry fields (shape/fit) carry no meaning outside clothing.
    pub fn is_clothing(&self) -> bool {
        self.categories.main == MainCategory::Clothing
    }

    /// Bottom-half garments have no sleeve, neckline or back construction.
    pub fn is_bottom_half(&self) -> bool {
        self.categories.sub.iter().any(|s| {
            matches!(
                s,
                SubCategory::Bottoms | SubCategory::Skirts | SubCategory::Shorts
            )
        })
    }

    /// Applies the category-conditional omission rules and the pockets
    /// invariant. Idempotent; every decoded classification passes through
    /// here before it is persisted or returned.
    pub fn normalize(&mut self) {
        if !self.is_clothing() {
            self.shape = None;
            self.fit = None;
            self.sleeve = None;
            self.neckline = None;
            self.back_details = None;
        } else if self.is_bottom_half() {
            self.sleeve = None;
            self.neckline = None;
            self.back_details = None;
        }

        if !self.pockets.has_pockets {
            self.pockets = Pockets::none();
        }
    }

    /// Fabric percentages must sum to 100 when a composition is present.
    pub fn composition_is_consistent(&self) -> bool {
        if self.composition.is_empty() {
            return true;
        }
        let sum: f64 = self.composition.iter().map(|c| c.percentage).sum();
        (sum - 100.0).abs() <= 0.01
    }
}

/// Token counts of one model call plus the derived blended cost.
/// `candidatesTokenCount` includes thinking tokens; the real output token
/// count is candidates minus thoughts (see `services::gemini::build_usage`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisUsage {
    #[serde(rename = "promptTokenCount")]
    pub prompt_token_count: u64,
    #[serde(rename = "candidatesTokenCount")]
    pub candidates_token_count: u64,
    #[serde(rename = "totalTokenCount")]
    pub total_token_count: u64,
    #[serde(rename = "thoughtsTokenCount")]
    pub thoughts_token_count: u64,
    #[serde(rename = "estimatedCostUSD")]
    pub estimated_cost_usd: f64,
    #[serde(rename = "estimatedCostBRL")]
    pub estimated_cost_brl: f64,
}

/// One persisted classification. Immutable after creation except for
/// deletion; referenced by price and try-on history through `analysisId`
/// as a soft foreign key (no cascade on delete).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisEntry {
    pub id: String,
    #[serde(flatten)]
    pub classification: GarmentClassification,
    /// Compressed thumbnail data URLs, 1-3, in upload order.
    #[serde(rename = "imagePreviews")]
    pub image_previews: Vec<String>,
    #[serde(rename = "analyzedAt")]
    pub analyzed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<AnalysisUsage>,
}

/// Price object on the pricing wire. The current generation uses the
/// English snake_case keys; the aliases accept the Portuguese-keyed shape
/// written by earlier store generations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceEstimate {
    #[serde(alias = "precoMinimo")]
    pub min_price: f64,
    #[serde(alias = "precoMaximo")]
    pub max_price: f64,
    #[serde(alias = "precoSugerido")]
    pub suggested_price: f64,
    #[serde(alias = "justificativa")]
    pub justification: String,
}

/// One pricing inference result. The descriptive fields are denormalized
/// echoes of the source analysis so the record stays displayable after its
/// parent is deleted. Earlier generations stored caller-supplied
/// `marca`/`qualidade` strings instead of fields derived from the analysis;
/// the aliases keep those records readable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceEstimateEntry {
    pub id: String,
    #[serde(rename = "analysisId")]
    pub analysis_id: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, alias = "marca", skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, alias = "qualidade", skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(rename = "suggestedTitle", default)]
    pub suggested_title: String,
    #[serde(rename = "minPrice", alias = "precoMinimo")]
    pub min_price: f64,
    #[serde(rename = "maxPrice", alias = "precoMaximo")]
    pub max_price: f64,
    #[serde(rename = "suggestedPrice", alias = "precoSugerido")]
    pub suggested_price: f64,
    #[serde(alias = "justificativa", default)]
    pub justification: String,
    #[serde(rename = "estimatedAt")]
    pub estimated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<AnalysisUsage>,
}

/// One virtual try-on generation. Images are stored in the compressed
/// data-URL form to keep the history blob small.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TryOnHistoryItem {
    pub id: String,
    #[serde(rename = "analysisId")]
    pub analysis_id: String,
    #[serde(rename = "productImage")]
    pub product_image: String,
    #[serde(rename = "personImage")]
    pub person_image: String,
    #[serde(rename = "resultImage")]
    pub result_image: String,
    #[serde(rename = "estimatedCostUSD")]
    pub estimated_cost_usd: f64,
    #[serde(rename = "estimatedCostBRL")]
    pub estimated_cost_brl: f64,
    #[serde(rename = "elapsedMs")]
    pub elapsed_ms: u64,
    #[serde(rename = "generatedAt")]
    pub generated_at: DateTime<Utc>,
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    use super::*;

    pub fn black_dress() -> GarmentClassification {
        GarmentClassification {
            suggested_title: "Black Sheath Cocktail Dress".into(),
            suggested_description: "Strapless black sheath dress in smooth crepe.".into(),
            brand: Some("Farm".into()),
            color: ColorProfile {
                primary: Color::Black,
                secondary: vec![],
                pattern: vec![Pattern::Solid],
                is_multicolor: false,
            },
            categories: CategorySet {
                department: vec![Department::Women],
                main: MainCategory::Clothing,
                sub: vec![SubCategory::Dresses, SubCategory::PartyDresses],
            },
            shape: Some(vec![Shape::Sheath]),
            fit: Some(vec![Fit::Bodycon]),
            condition: Condition::VeryGood,
            sleeve: Some(SleeveInfo {
                length: SleeveLength::Strapless,
                kind: vec![],
                construction: SleeveConstruction::SetIn,
            }),
            aesthetics: vec![Aesthetic::Glam],
            occasion: vec![Occasion::Party],
            length: GarmentLength::Midi,
            neckline: Some(Neckline::Strapless),
            back_details: Some(vec![BackDetail::Closed]),
            finish: vec![Finish::Smooth],
            closure: vec![Closure::HiddenZipper],
            composition: vec![
                FabricComposition {
                    fiber: FabricFiber::Polyester,
                    percentage: 95.0,
                },
                FabricComposition {
                    fiber: FabricFiber::Elastane,
                    percentage: 5.0,
                },
            ],
            pockets: Pockets::none(),
            analysis_reasoning: Some("Visible zipper and crepe texture.".into()),
        }
    }

    pub fn trousers() -> GarmentClassification {
        let mut c = black_dress();
        c.suggested_title = "Straight-Leg Navy Trousers".into();
        c.categories.sub = vec![SubCategory::Bottoms];
        c.color.primary = Color::NavyBlue;
        c.length = GarmentLength::Standard;
        c.pockets = Pockets {
            has_pockets: true,
            quantity: 4,
            types: vec![PocketType::Front, PocketType::Back],
        };
        c
    }
}

#[cfg(test)]
mod tests {
    use super::test_fixtures::*;
    use super::*;

    #[test]
    fn pockets_invariant_enforced_on_normalize() {
        let mut c = black_dress();
        c.pockets = Pockets {
            has_pockets: false,
            quantity: 2,
            types: vec![PocketType::Side],
        };
        c.normalize();
        assert_eq!(c.pockets.quantity, 0);
        assert_eq!(c.pockets.types, vec![PocketType::None]);
    }

    #[test]
    fn composition_must_sum_to_one_hundred() {
        let mut c = black_dress();
        assert!(c.composition_is_consistent());
        c.composition[0].percentage = 90.0;
        assert!(!c.composition_is_consistent());
        c.composition.clear();
        assert!(c.composition_is_consistent());
    }

    #[test]
    fn bottom_half_normalization_drops_upper_body_fields() {
        let mut c = trousers();
        c.normalize();
        assert!(c.sleeve.is_none());
        assert!(c.neckline.is_none());
        assert!(c.back_details.is_none());
        // Geometry still applies to trousers.
        assert!(c.shape.is_some());
        assert!(c.fit.is_some());
    }

    #[test]
    fn accessories_normalization_also_drops_geometry() {
        let mut c = black_dress();
        c.categories.main = MainCategory::Bags;
        c.categories.sub = vec![];
        c.normalize();
        assert!(c.shape.is_none());
        assert!(c.fit.is_none());
        assert!(c.sleeve.is_none());
        assert!(c.neckline.is_none());
    }

    #[test]
    fn top_half_garment_keeps_all_fields() {
        let mut c = black_dress();
        c.normalize();
        assert!(c.sleeve.is_some());
        assert!(c.neckline.is_some());
        assert!(c.back_details.is_some());
    }

    #[test]
    fn analysis_entry_round_trips() {
        let entry = AnalysisEntry {
            id: "a1".into(),
            classification: black_dress(),
            image_previews: vec!["data:image/jpeg;base64,xxx".into()],
            analyzed_at: Utc::now(),
            usage: None,
        };
        let json = serde_json::to_string(&entry).unwrap();
        let back: AnalysisEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, entry.id);
        assert_eq!(back.image_previews, entry.image_previews);
        assert_eq!(
            back.classification.suggested_title,
            entry.classification.suggested_title
        );
        assert_eq!(back.classification.categories.main, MainCategory::Clothing);
        // Classification fields are flattened onto the record, not nested.
        let raw: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(raw.get("suggestedTitle").is_some());
        assert!(raw.get("classification").is_none());
    }

    #[test]
    fn price_entry_reads_portuguese_generation() {
        let legacy = serde_json::json!({
            "id": "p1",
            "analysisId": "a1",
            "category": "vestido",
            "marca": "Farm",
            "qualidade": "tão boa quanto nova",
            "suggestedTitle": "Vestido Midi Preto",
            "precoMinimo": 80.0,
            "precoMaximo": 150.0,
            "precoSugerido": 110.0,
            "justificativa": "Baseado em peças similares no Enjoei.",
            "estimatedAt": "2024-05-01T12:00:00Z"
        });
        let entry: PriceEstimateEntry = serde_json::from_value(legacy).unwrap();
        assert_eq!(entry.min_price, 80.0);
        assert_eq!(entry.suggested_price, 110.0);
        assert_eq!(entry.brand.as_deref(), Some("Farm"));
        assert_eq!(entry.justification, "Baseado em peças similares no Enjoei.");
    }

    #[test]
    fn price_wire_object_accepts_both_generations() {
        let english: PriceEstimate = serde_json::from_str(
            r#"{"min_price": 50, "max_price": 90, "suggested_price": 70, "justification": "ok"}"#,
        )
        .unwrap();
        assert_eq!(english.suggested_price, 70.0);

        let portuguese: PriceEstimate = serde_json::from_str(
            r#"{"precoMinimo": 50, "precoMaximo": 90, "precoSugerido": 70, "justificativa": "ok"}"#,
        )
        .unwrap();
        assert_eq!(portuguese.max_price, 90.0);
    }
}
