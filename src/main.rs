// src/main.rs
use actix_web::{App, HttpResponse, HttpServer, middleware, web};
use log::info;
use std::sync::Arc;

mod aggregate;
mod errors;
mod guard;
mod handlers;
mod legacy;
mod models;
mod services;
mod taxonomy;

use crate::guard::ActionGuard;
use crate::handlers::{
    analyze_garment, clear_history, delete_analysis, delete_price_estimate, delete_tryon_item,
    estimate_price, generate_tryon, get_price_history, get_tryon_history, list_history,
};
use crate::services::classifier::Classifier;
use crate::services::gemini::GeminiClient;
use crate::services::pricing::PricingService;
use crate::services::tryon::TryOnService;
use crate::services::{HistoryService, ImageProcessor, RedisStore};

#[derive(Clone)]
pub struct AppState {
    history: Arc<HistoryService>,
    classifier: Arc<Classifier>,
    pricing: Arc<PricingService>,
    tryon: Arc<TryOnService>,
    image_processor: Arc<ImageProcessor>,
    analyze_guard: ActionGuard,
    price_guard: ActionGuard,
    tryon_guard: ActionGuard,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting Garimpo cataloging service...");

    let redis_url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    let store = Arc::new(RedisStore::new(&redis_url).await.unwrap());
    let history = Arc::new(HistoryService::new(store));

    let gemini = Arc::new(GeminiClient::new(
        std::env::var("GEMINI_API_KEY").expect("GEMINI_API_KEY must be set"),
    ));
    let image_processor = Arc::new(ImageProcessor::new());

    let app_state = AppState {
        history,
        classifier: Arc::new(Classifier::new(gemini.clone())),
        pricing: Arc::new(PricingService::new(gemini)),
        tryon: Arc::new(TryOnService::from_env(image_processor.clone())),
        image_processor,
        analyze_guard: ActionGuard::new("analyze"),
        price_guard: ActionGuard::new("price"),
        tryon_guard: ActionGuard::new("try-on"),
    };

    info!("Starting HTTP server on 0.0.0.0:8080");

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(middleware::Logger::default())
            .service(
                web::scope("/api/v1")
                    .route("/analyze", web::post().to(analyze_garment))
                    .route("/history", web::get().to(list_history))
                    .route("/history", web::delete().to(clear_history))
                    .route("/history/{id}", web::delete().to(delete_analysis))
                    .route("/price/{analysis_id}", web::post().to(estimate_price))
                    .route("/price/{analysis_id}", web::get().to(get_price_history))
                    .route("/price/{id}", web::delete().to(delete_price_estimate))
                    .route("/tryon/{analysis_id}", web::post().to(generate_tryon))
                    .route("/tryon/{analysis_id}", web::get().to(get_tryon_history))
                    .route("/tryon/{id}", web::delete().to(delete_tryon_item)),
            )
            .route("/health", web::get().to(health_check))
    })
    .bind("0.0.0.0:8080")?
    .run()
    .await
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "garimpo",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
