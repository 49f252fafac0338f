use axum::http::StatusCode;
use axum::response::IntoResponse;
use thiserror::Error;

use crate::external::additive_model::ModelError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Insufficient data: need at least {required} records, got {actual}")]
    InsufficientData { required: usize, actual: usize },
    #[error("Model fit error: {0}")]
    ModelFit(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Import error: {0}")]
    Import(String),
    #[error("Not found")]
    NotFound,
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not found").into_response(),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            AppError::Import(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            err @ AppError::InsufficientData { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()).into_response()
            }
            AppError::ModelFit(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg).into_response(),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}

impl From<ModelError> for AppError {
    fn from(value: ModelError) -> Self {
        AppError::ModelFit(value.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        // {:#} keeps the context chain on one line
        AppError::Import(format!("{:#}", value))
    }
}
