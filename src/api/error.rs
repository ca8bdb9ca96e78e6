use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::error::ExchangeError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Exchange(#[from] ExchangeError),
    #[error("authentication required")]
    Unauthorized,
    #[error("{0}")]
    NotFound(String),
    #[error("internal error")]
    Internal(String),
}

/// Converts engine errors into HTTP responses. Business-rule rejections keep
/// their message so the caller can correct input; internal kinds are logged
/// and surfaced opaquely.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "invalid or missing token".to_string(),
            ),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Internal(detail) => {
                error!(detail, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
            ApiError::Exchange(err) if err.is_rejection() => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            ApiError::Exchange(err) => match err {
                ExchangeError::OracleUnavailable(_) => {
                    warn!(error = %err, "price oracle unavailable");
                    (StatusCode::SERVICE_UNAVAILABLE, err.to_string())
                }
                ExchangeError::PersistenceConflict => (
                    StatusCode::CONFLICT,
                    "conflicting concurrent update, please retry".to_string(),
                ),
                err => {
                    error!(error = %err, "trade engine failure");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "internal server error".to_string(),
                    )
                }
            },
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}
