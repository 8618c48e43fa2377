// src/errors.rs
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GarimpoError {
    #[error("The model returned no usable content")]
    EmptyResponse,

    #[error("Could not decode model output: {0}")]
    MalformedResult(String),

    #[error("No JSON object found in the pricing response")]
    NoJsonFound,

    #[error("The try-on API returned no predictions")]
    NoPrediction,

    #[error("Invalid image data: {0}")]
    InvalidImageData(String),

    #[error("Missing configuration: {0}")]
    ConfigurationError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Another {0} request is already in progress")]
    Busy(&'static str),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Upstream model call failed: {0}")]
    Upstream(String),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),
}

impl GarimpoError {
    fn kind(&self) -> &'static str {
        match self {
            GarimpoError::EmptyResponse => "empty_response",
            GarimpoError::MalformedResult(_) => "malformed_result",
            GarimpoError::NoJsonFound => "no_json_found",
            GarimpoError::NoPrediction => "no_prediction",
            GarimpoError::InvalidImageData(_) => "invalid_image_data",
            GarimpoError::ConfigurationError(_) => "configuration_error",
            GarimpoError::InvalidInput(_) => "invalid_input",
            GarimpoError::Busy(_) => "busy",
            GarimpoError::Storage(_) => "storage_error",
            GarimpoError::Serialization(_) => "serialization_error",
            GarimpoError::Upstream(_) => "upstream_error",
            GarimpoError::ImageProcessing(_) => "image_processing_error",
        }
    }
}

impl ResponseError for GarimpoError {
    fn error_response(&self) -> HttpResponse {
        let body = serde_json::json!({
            "error": self.kind(),
            "message": self.to_string()
        });

        match self {
            GarimpoError::EmptyResponse
            | GarimpoError::MalformedResult(_)
            | GarimpoError::NoJsonFound
            | GarimpoError::NoPrediction
            | GarimpoError::Upstream(_) => HttpResponse::BadGateway().json(body),
            GarimpoError::InvalidImageData(_)
            | GarimpoError::InvalidInput(_)
            | GarimpoError::ImageProcessing(_) => HttpResponse::BadRequest().json(body),
            GarimpoError::Busy(_) => HttpResponse::Conflict().json(body),
            GarimpoError::ConfigurationError(_)
            | GarimpoError::Storage(_)
            | GarimpoError::Serialization(_) => HttpResponse::InternalServerError().json(body),
        }
    }
}
