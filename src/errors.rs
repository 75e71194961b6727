// src/errors.rs
use actix_multipart::MultipartError;
use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Background removal provider error: {0}")]
    Provider(String),

    #[error("Background removal provider returned no image payload")]
    EmptyPayload,

    #[error("Image not found: {0}")]
    NotFound(String),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),
}

impl IntakeError {
    /// Short message shown to the client. Internal detail stays in the logs.
    pub fn client_message(&self) -> String {
        match self {
            IntakeError::InvalidInput(msg) => msg.clone(),
            IntakeError::Storage(_) | IntakeError::Provider(_) => {
                "Error processing image".to_string()
            }
            IntakeError::EmptyPayload => "Background removal failed".to_string(),
            IntakeError::NotFound(_) => "Image not found".to_string(),
            IntakeError::ImageProcessing(_) => "Error fetching results".to_string(),
        }
    }
}

impl From<MultipartError> for IntakeError {
    fn from(e: MultipartError) -> Self {
        IntakeError::InvalidInput(format!("Invalid multipart payload: {}", e))
    }
}

impl ResponseError for IntakeError {
    fn status_code(&self) -> StatusCode {
        match self {
            IntakeError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            IntakeError::NotFound(_) => StatusCode::NOT_FOUND,
            IntakeError::Storage(_)
            | IntakeError::Provider(_)
            | IntakeError::EmptyPayload
            | IntakeError::ImageProcessing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("Request failed ({}): {}", status, self);
        } else {
            log::warn!("Request rejected ({}): {}", status, self);
        }

        HttpResponse::build(status).json(serde_json::json!({
            "error": self.client_message()
        }))
    }
}
