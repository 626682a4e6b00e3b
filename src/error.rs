use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::llm::GenerationError;
use crate::models::{ApiResponse, ValidationError};
use crate::planner::SuggestionError;
use crate::store::StoreError;

/// Errors surfaced to HTTP callers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Trip plan not found")]
    NotFound,
    #[error("Model request failed: {0}")]
    Generation(#[from] GenerationError),
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl From<SuggestionError> for AppError {
    fn from(e: SuggestionError) -> Self {
        match e {
            SuggestionError::Validation(e) => AppError::Validation(e),
            SuggestionError::Generation(e) => AppError::Generation(e),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Generation(_) => StatusCode::BAD_GATEWAY,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("❌ {}", self);
        } else {
            tracing::warn!("⚠️ {}", self);
        }
        (status, Json(ApiResponse::<()>::failure(self.to_string()))).into_response()
    }
}
