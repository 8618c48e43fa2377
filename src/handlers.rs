// src/handlers.rs
use crate::{AppState, errors::GarimpoError, models::*};
use actix_multipart::Multipart;
use actix_web::{Error, HttpResponse, web};
use base64::{Engine as _, engine::general_purpose};
use chrono::Utc;
use futures_util::TryStreamExt;
use uuid::Uuid;

use crate::aggregate::{compute_item_averages, compute_tryon_totals};
use crate::services::classifier::ImagePayload;

struct UploadedFile {
    name: String,
    content_type: String,
    data: Vec<u8>,
}

/// Collects file fields and text fields from a multipart payload.
async fn read_multipart(
    payload: &mut Multipart,
) -> Result<(Vec<UploadedFile>, std::collections::HashMap<String, String>), Error> {
    let mut files = Vec::new();
    let mut texts = std::collections::HashMap::new();

    while let Some(mut field) = payload.try_next().await? {
        let content_disposition = field.content_disposition();
        let name = content_disposition
            .get_name()
            .unwrap_or_default()
            .to_string();
        let is_file = content_disposition.get_filename().is_some();
        let content_type = field
            .content_type()
            .map(|ct| ct.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let mut data = Vec::new();
        while let Some(chunk) = field.try_next().await? {
            data.extend_from_slice(&chunk);
        }

        if is_file {
            files.push(UploadedFile {
                name,
                content_type,
                data,
            });
        } else {
            texts.insert(name, String::from_utf8_lossy(&data).into_owned());
        }
    }

    Ok((files, texts))
}

fn decode_data_url(data_url: &str) -> Result<Vec<u8>, GarimpoError> {
    let payload = data_url
        .split_once(',')
        .map(|(_, p)| p)
        .ok_or_else(|| GarimpoError::InvalidImageData("not a data URL".to_string()))?;
    general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| GarimpoError::InvalidImageData(format!("undecodable data URL: {}", e)))
}

/// POST /api/v1/analyze: multipart with 1-3 image files and an optional
/// `hint` text field. Classifies, persists the entry and returns it.
pub async fn analyze_garment(
    mut payload: Multipart,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let _permit = data.analyze_guard.acquire()?;

    let (files, texts) = read_multipart(&mut payload).await?;
    let hint = texts.get("hint").map(String::as_str);

    let mut payloads = Vec::with_capacity(files.len());
    for file in &files {
        data.image_processor.validate_image(&file.data)?;
        payloads.push(ImagePayload {
            base64_data: general_purpose::STANDARD.encode(&file.data),
            mime_type: file.content_type.clone(),
        });
    }

    let (classification, usage) = data.classifier.classify(&payloads, hint).await?;

    let mut previews = Vec::with_capacity(files.len());
    for file in &files {
        previews.push(data.image_processor.thumbnail_data_url(&file.data)?);
    }

    let entry = AnalysisEntry {
        id: Uuid::new_v4().to_string(),
        classification,
        image_previews: previews,
        analyzed_at: Utc::now(),
        usage: Some(usage),
    };
    data.history.save_analysis(&entry).await?;

    Ok(HttpResponse::Ok().json(&entry))
}

/// GET /api/v1/history
pub async fn list_history(data: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let entries = data.history.load_analyses().await;
    Ok(HttpResponse::Ok().json(&entries))
}

/// DELETE /api/v1/history/{id}. Price and try-on rows referencing this
/// analysis survive as orphans.
pub async fn delete_analysis(
    path: web::Path<String>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    data.history.delete_analysis(&path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// DELETE /api/v1/history
pub async fn clear_history(data: web::Data<AppState>) -> Result<HttpResponse, Error> {
    data.history.clear_analyses().await?;
    Ok(HttpResponse::NoContent().finish())
}

/// POST /api/v1/price/{analysis_id}: runs a market-research estimation for
/// a stored analysis and appends the result to the price history.
pub async fn estimate_price(
    path: web::Path<String>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let _permit = data.price_guard.acquire()?;
    let analysis_id = path.into_inner();

    let entry = data
        .history
        .find_analysis(&analysis_id)
        .await
        .ok_or_else(|| actix_web::error::ErrorNotFound("analysis not found"))?;

    let (estimate, usage) = data.pricing.estimate(&entry).await?;

    let record = PriceEstimateEntry {
        id: Uuid::new_v4().to_string(),
        analysis_id: analysis_id.clone(),
        category: entry.classification.categories.main.to_string(),
        brand: entry.classification.brand.clone(),
        condition: Some(entry.classification.condition.to_string()),
        suggested_title: entry.classification.suggested_title.clone(),
        min_price: estimate.min_price,
        max_price: estimate.max_price,
        suggested_price: estimate.suggested_price,
        justification: estimate.justification,
        estimated_at: Utc::now(),
        usage: Some(usage),
    };
    data.history.save_price_estimate(&record).await?;

    let history = data.history.price_history_for_item(&analysis_id).await;
    let averages = compute_item_averages(&history);

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "entry": record,
        "averages": averages
    })))
}

/// GET /api/v1/price/{analysis_id}
pub async fn get_price_history(
    path: web::Path<String>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let entries = data.history.price_history_for_item(&path.into_inner()).await;
    let averages = compute_item_averages(&entries);
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "entries": entries,
        "averages": averages
    })))
}

/// DELETE /api/v1/price/{id}
pub async fn delete_price_estimate(
    path: web::Path<String>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    data.history.delete_price_estimate(&path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// POST /api/v1/tryon/{analysis_id}: multipart with a `person` image and
/// an optional `product` image; the product defaults to the first stored
/// preview of the analysis.
pub async fn generate_tryon(
    path: web::Path<String>,
    mut payload: Multipart,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let _permit = data.tryon_guard.acquire()?;
    let analysis_id = path.into_inner();

    let entry = data
        .history
        .find_analysis(&analysis_id)
        .await
        .ok_or_else(|| actix_web::error::ErrorNotFound("analysis not found"))?;

    let (files, _) = read_multipart(&mut payload).await?;
    let person = files
        .iter()
        .find(|f| f.name == "person")
        .ok_or_else(|| GarimpoError::InvalidInput("a 'person' image is required".to_string()))?;
    data.image_processor.validate_image(&person.data)?;

    let product_data = match files.iter().find(|f| f.name == "product") {
        Some(product) => {
            data.image_processor.validate_image(&product.data)?;
            product.data.clone()
        }
        None => {
            let preview = entry.image_previews.first().ok_or_else(|| {
                GarimpoError::InvalidInput("analysis has no stored product image".to_string())
            })?;
            decode_data_url(preview)?
        }
    };

    let outcome = data.tryon.generate(&product_data, &person.data).await?;

    let item = TryOnHistoryItem {
        id: Uuid::new_v4().to_string(),
        analysis_id: analysis_id.clone(),
        product_image: data.image_processor.thumbnail_data_url(&product_data)?,
        person_image: data.image_processor.thumbnail_data_url(&person.data)?,
        result_image: data.image_processor.thumbnail_data_url(&outcome.image_png)?,
        estimated_cost_usd: outcome.estimated_cost_usd,
        estimated_cost_brl: outcome.estimated_cost_brl,
        elapsed_ms: outcome.elapsed_ms,
        generated_at: Utc::now(),
    };
    data.history.save_tryon_item(&item).await?;

    let history = data.history.tryon_history_for_item(&analysis_id).await;
    let totals = compute_tryon_totals(&history);

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "item": item,
        "totals": totals
    })))
}

/// GET /api/v1/tryon/{analysis_id}
pub async fn get_tryon_history(
    path: web::Path<String>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let entries = data.history.tryon_history_for_item(&path.into_inner()).await;
    let totals = compute_tryon_totals(&entries);
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "entries": entries,
        "totals": totals
    })))
}

/// DELETE /api/v1/tryon/{id}
pub async fn delete_tryon_item(
    path: web::Path<String>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    data.history.delete_tryon_item(&path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_payload_is_decoded_after_the_comma() {
        let url = format!(
            "data:image/jpeg;base64,{}",
            general_purpose::STANDARD.encode(b"bytes")
        );
        assert_eq!(decode_data_url(&url).unwrap(), b"bytes");
    }

    #[test]
    fn plain_strings_are_not_data_urls() {
        assert!(matches!(
            decode_data_url("no comma here"),
            Err(GarimpoError::InvalidImageData(_))
        ));
    }
}
