// src/legacy.rs
//
// First-generation persisted analysis records used a flat, Portuguese-keyed
// schema with free-text strings instead of the current enum/list model.
// They are still readable: the store upcasts them to the canonical
// AnalysisEntry at load time and never writes this shape again.
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::models::*;
use crate::taxonomy::*;

#[derive(Debug, Clone, Deserialize)]
pub struct LegacyAnalysisRecord {
    pub id: String,
    #[serde(rename = "imagePreview", default)]
    pub image_preview: Option<String>,
    #[serde(rename = "imagePreviews", default)]
    pub image_previews: Option<Vec<String>>,
    #[serde(rename = "analyzedAt", default)]
    pub analyzed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub usage: Option<AnalysisUsage>,

    pub titulo_sugerido: String,
    #[serde(default)]
    pub descricao_sugerida: String,
    pub categoria: String,
    #[serde(default)]
    pub cor: String,
    #[serde(default)]
    pub corte_silhueta: Option<String>,
    #[serde(default)]
    pub detalhes_estilo: Vec<String>,
    #[serde(default)]
    pub estampa: Option<String>,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub ocasiao: Option<String>,
    #[serde(default)]
    pub comprimento: Option<String>,
    #[serde(default)]
    pub genero: Option<String>,
    #[serde(default)]
    pub condicao: Option<String>,
    #[serde(default)]
    pub marca: Option<String>,
}

impl LegacyAnalysisRecord {
    pub fn upcast(self) -> AnalysisEntry {
        let (main, sub) = map_categoria(&self.categoria);
        let (primary, secondary, is_multicolor) = map_cores(&self.cor);
        let (shape, fit) = map_corte(self.corte_silhueta.as_deref());
        let details = DetailHints::from_tokens(&self.detalhes_estilo);

        let mut classification = GarmentClassification {
            suggested_title: self.titulo_sugerido,
            suggested_description: self.descricao_sugerida,
            brand: self.marca,
            color: ColorProfile {
                primary,
                secondary,
                pattern: map_estampa(self.estampa.as_deref())
                    .map(|p| vec![p])
                    .unwrap_or_default(),
                is_multicolor,
            },
            categories: CategorySet {
                department: vec![map_genero(self.genero.as_deref())],
                main,
                sub,
            },
            shape,
            fit,
            condition: map_condicao(self.condicao.as_deref()),
            sleeve: details.sleeve,
            aesthetics: vec![],
            occasion: map_ocasiao(self.ocasiao.as_deref())
                .map(|o| vec![o])
                .unwrap_or_default(),
            length: map_comprimento(self.comprimento.as_deref()),
            neckline: details.neckline,
            back_details: None,
            finish: vec![],
            closure: details.closure,
            composition: map_material(self.material.as_deref())
                .map(|fiber| {
                    vec![FabricComposition {
                        fiber,
                        percentage: 100.0,
                    }]
                })
                .unwrap_or_default(),
            pockets: if details.has_pockets {
                Pockets {
                    has_pockets: true,
                    quantity: 0,
                    types: vec![],
                }
            } else {
                Pockets::none()
            },
            analysis_reasoning: None,
        };
        classification.normalize();

        let image_previews = match (self.image_previews, self.image_preview) {
            (Some(list), _) => list,
            (None, Some(single)) => vec![single],
            (None, None) => vec![],
        };

        AnalysisEntry {
            id: self.id,
            classification,
            image_previews,
            analyzed_at: self.analyzed_at.unwrap_or_else(Utc::now),
            usage: self.usage,
        }
    }
}

fn map_categoria(token: &str) -> (MainCategory, Vec<SubCategory>) {
    let sub = |s: SubCategory| (MainCategory::Clothing, vec![s]);
    match token {
        "vestido" => sub(SubCategory::Dresses),
        "camiseta" | "blusa" | "body" | "top/cropped" | "regata" | "moletom" => {
            sub(SubCategory::Tops)
        }
        "camisa" => sub(SubCategory::Shirts),
        "saia" => sub(SubCategory::Skirts),
        "calça" => sub(SubCategory::Bottoms),
        "shorts" | "bermuda" => sub(SubCategory::Shorts),
        "macacão" | "jardineira" => sub(SubCategory::Jumpsuits),
        "blazer" => sub(SubCategory::Tailoring),
        "jaqueta" | "casaco" => sub(SubCategory::Outerwear),
        "cardigan" | "suéter" => sub(SubCategory::Knitwear),
        "colete" => sub(SubCategory::Vests),
        "lingerie" | "pijama" => sub(SubCategory::Lingerie),
        "biquíni" => sub(SubCategory::Beachwear),
        "acessório" => (MainCategory::Accessories, vec![]),
        _ => (MainCategory::Clothing, vec![]),
    }
}

/// Legacy `cor` was free text, possibly multiple colors joined by " e ".
fn map_cores(raw: &str) -> (Color, Vec<Color>, bool) {
    let mut colors: Vec<Color> = raw
        .split(" e ")
        .filter_map(|t| map_cor(t.trim()))
        .collect();
    let is_multicolor = raw.contains("estampado/multicolorido") || colors.len() > 1;
    if colors.is_empty() {
        return (Color::Multi, vec![], true);
    }
    let primary = colors.remove(0);
    (primary, colors, is_multicolor)
}

fn map_cor(token: &str) -> Option<Color> {
    let color = match token {
        "preto" => Color::Black,
        "branco" | "off-white" | "creme" => Color::White,
        "bege" => Color::Beige,
        "marrom" | "caramelo" => Color::Brown,
        "cinza" => Color::Grey,
        "azul-claro" => Color::LightBlue,
        "azul-escuro" | "azul-marinho" => Color::NavyBlue,
        "azul-royal" => Color::Blue,
        "verde" | "verde-claro" => Color::Green,
        "verde-militar" => Color::Olive,
        "vermelho" => Color::Red,
        "bordô" => Color::Burgundy,
        "rosa" | "rosa-claro" => Color::Pink,
        "lilás" | "roxo" => Color::Purple,
        "amarelo" => Color::Yellow,
        "laranja" | "coral" => Color::Orange,
        "dourado" => Color::Gold,
        "prateado" => Color::Silver,
        "estampado/multicolorido" => Color::Multi,
        _ => return None,
    };
    Some(color)
}

fn map_genero(token: Option<&str>) -> Department {
    match token {
        Some("feminino") => Department::Women,
        Some("masculino") => Department::Men,
        Some("infantil") => Department::Kids,
        _ => Department::Unisex,
    }
}

fn map_condicao(token: Option<&str>) -> Condition {
    match token {
        Some("nova com etiqueta") => Condition::NewWithTags,
        Some("tão boa quanto nova") => Condition::Excellent,
        _ => Condition::Good,
    }
}

fn map_comprimento(token: Option<&str>) -> GarmentLength {
    match token {
        Some("mini") => GarmentLength::Mini,
        Some("curto") => GarmentLength::Short,
        Some("médio") => GarmentLength::KneeLength,
        Some("midi") => GarmentLength::Midi,
        Some("longo") | Some("maxi") => GarmentLength::Maxi,
        _ => GarmentLength::Standard,
    }
}

fn map_estampa(token: Option<&str>) -> Option<Pattern> {
    let pattern = match token? {
        "liso" => Pattern::Solid,
        "floral" | "tropical" => Pattern::Floral,
        "listrado" => Pattern::Striped,
        "xadrez" => Pattern::Checkered,
        "poá/bolinhas" => Pattern::PolkaDot,
        "animal print" => Pattern::AnimalPrint,
        "geométrico" => Pattern::Geometric,
        "abstrato" | "degradê" => Pattern::Abstract,
        "tie-dye" => Pattern::TieDye,
        "paisley" | "étnico" => Pattern::Paisley,
        _ => return None,
    };
    Some(pattern)
}

fn map_material(token: Option<&str>) -> Option<FabricFiber> {
    let fiber = match token? {
        "algodão" | "moletom" | "malha" => FabricFiber::Cotton,
        "poliéster" | "cetim" | "chiffon" | "crepe" | "organza" | "tule" => {
            FabricFiber::Polyester
        }
        "viscose" => FabricFiber::Viscose,
        "linho" => FabricFiber::Linen,
        "seda" => FabricFiber::Silk,
        "renda" | "tricô/crochê" => FabricFiber::Cotton,
        "jeans/denim" => FabricFiber::Denim,
        "couro" => FabricFiber::Leather,
        "couro sintético" => FabricFiber::FauxLeather,
        "camurça" => FabricFiber::Suede,
        "lã" | "tweed" => FabricFiber::Wool,
        "náilon" => FabricFiber::Polyamide,
        "elastano/lycra" => FabricFiber::Elastane,
        _ => FabricFiber::Unknown,
    };
    Some(fiber)
}

fn map_ocasiao(token: Option<&str>) -> Option<Occasion> {
    let occasion = match token? {
        "casual" | "dia a dia" => Occasion::Casual,
        "trabalho/escritório" => Occasion::Work,
        "festa/evento" => Occasion::Party,
        "esportivo" => Occasion::Activewear,
        "praia/piscina" => Occasion::Beachwear,
        "noite/balada" => Occasion::NightOut,
        "formal/cerimônia" => Occasion::Formal,
        "loungewear/casa" => Occasion::Lounge,
        _ => return None,
    };
    Some(occasion)
}

/// `corte_silhueta` mixed silhouette and fit tokens in one vocabulary.
fn map_corte(token: Option<&str>) -> (Option<Vec<Shape>>, Option<Vec<Fit>>) {
    let Some(token) = token else {
        return (None, None);
    };
    let shape = match token {
        "tubinho" => Some(Shape::Sheath),
        "evasê" => Some(Shape::ALine),
        "sereia" => Some(Shape::Mermaid),
        "envelope" => Some(Shape::Wrap),
        "império" => Some(Shape::Empire),
        "chemise" => Some(Shape::ShirtDress),
        "reto" => Some(Shape::Straight),
        "trapézio" => Some(Shape::Trapeze),
        "godê" => Some(Shape::Circle),
        _ => None,
    };
    let fit = match token {
        "oversized" => Some(Fit::Oversized),
        "slim/ajustado" => Some(Fit::Slim),
        "regular" => Some(Fit::Regular),
        "cropped" => Some(Fit::Cropped),
        "alongado" => Some(Fit::Elongated),
        _ => None,
    };
    (shape.map(|s| vec![s]), fit.map(|f| vec![f]))
}

/// Sleeve, neckline, closure and pocket hints recoverable from the legacy
/// free-form `detalhes_estilo` list.
struct DetailHints {
    sleeve: Option<SleeveInfo>,
    neckline: Option<Neckline>,
    closure: Vec<Closure>,
    has_pockets: bool,
}

impl DetailHints {
    fn from_tokens(tokens: &[String]) -> Self {
        let mut sleeve_length = None;
        let mut neckline = None;
        let mut closure = Vec::new();
        let mut has_pockets = false;

        for token in tokens {
            match token.as_str() {
                "manga curta" => sleeve_length = Some(SleeveLength::Short),
                "manga longa" => sleeve_length = Some(SleeveLength::Long),
                "manga 3/4" => sleeve_length = Some(SleeveLength::ThreeQuarter),
                "sem manga" => sleeve_length = Some(SleeveLength::Sleeveless),
                "tomara que caia" => {
                    sleeve_length = Some(SleeveLength::Strapless);
                    neckline = Some(Neckline::Strapless);
                }
                "frente única" => neckline = Some(Neckline::Halter),
                "um ombro só" => neckline = Some(Neckline::OneShoulder),
                "decote V" => neckline = Some(Neckline::VNeck),
                "decote redondo" => neckline = Some(Neckline::RoundNeck),
                "gola alta" => neckline = Some(Neckline::HighNeck),
                "botões" => closure.push(Closure::Button),
                "zíper aparente" => closure.push(Closure::Zipper),
                "bolsos" => has_pockets = true,
                _ => {}
            }
        }

        Self {
            sleeve: sleeve_length.map(|length| SleeveInfo {
                length,
                kind: vec![],
                construction: SleeveConstruction::SetIn,
            }),
            neckline,
            closure,
            has_pockets,
        }
    }
}
