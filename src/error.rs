use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Failures surfaced by the credential and session core and the request layer.
#[derive(Error, Debug)]
pub enum AppError {
    /// The password hashing primitive could not complete.
    #[error("hashing failed: {0}")]
    Hashing(String),

    /// Unknown email and wrong password both land here, with the same message.
    #[error("invalid email or password")]
    Authentication,

    /// The secure random source is unavailable.
    #[error("secure random source unavailable: {0}")]
    Randomness(String),

    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    #[error("conflict: {0}")]
    Conflict(String),

    /// Missing or unknown session id on an authenticated route.
    #[error("authentication required")]
    Unauthenticated,

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Hashing(ref msg) => {
                tracing::error!(error = %msg, "hashing error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            AppError::Authentication => {
                tracing::warn!("authentication failed");
                (StatusCode::UNAUTHORIZED, self.to_string())
            }
            AppError::Randomness(ref msg) => {
                tracing::error!(error = %msg, "randomness error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            AppError::InvalidInput(msg) => {
                tracing::debug!(reason = msg, "invalid input");
                (StatusCode::BAD_REQUEST, msg.to_string())
            }
            AppError::Conflict(ref msg) => {
                tracing::warn!(reason = %msg, "conflict");
                (StatusCode::CONFLICT, msg.clone())
            }
            AppError::Unauthenticated => {
                tracing::debug!("missing or unknown session");
                (StatusCode::UNAUTHORIZED, self.to_string())
            }
            AppError::Storage(ref e) => {
                tracing::error!(error = %e, "storage error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Storage error".to_string())
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
