use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::delivery::DeliveryError;
use crate::llm_client::LlmError;
use crate::storage::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Llm(LlmError::InvalidKey(msg)) => (
                StatusCode::BAD_REQUEST,
                "INVALID_API_KEY",
                format!("OpenRouter API key is invalid: {msg}. Check the API key in Settings"),
            ),
            AppError::Llm(e) if e.is_auth() => {
                tracing::error!("LLM auth error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "LLM_AUTH_ERROR",
                    format!("OpenRouter rejected the credentials: {e}. Check the API key in Settings"),
                )
            }
            AppError::Llm(e) => {
                tracing::error!("LLM error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "LLM_ERROR",
                    format!("OpenRouter API error: {e}"),
                )
            }
            AppError::Delivery(e) => {
                tracing::error!("Delivery error: {e}");
                (StatusCode::BAD_GATEWAY, "DELIVERY_ERROR", e.to_string())
            }
            AppError::Store(e) => {
                tracing::error!("Storage error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "A local storage error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
