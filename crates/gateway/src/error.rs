//! Error types for the gateway layer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use murmur_database::ChatError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;

/// Gateway error types
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("access denied: {0}")]
    Forbidden(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("internal server error")]
    InternalError,
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::AuthenticationFailed(_) => StatusCode::UNAUTHORIZED,
            GatewayError::Forbidden(_) => StatusCode::FORBIDDEN,
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::AuthenticationFailed(_) => "authentication",
            GatewayError::Forbidden(_) => "forbidden",
            GatewayError::InvalidRequest(_) => "validation",
            GatewayError::NotFound(_) => "not_found",
            GatewayError::StorageUnavailable(_) => "storage",
            GatewayError::InternalError => "internal",
        }
    }
}

/// JSON error body returned by every failing endpoint
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.code().to_string(),
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

impl From<ChatError> for GatewayError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::Validation(message) => GatewayError::InvalidRequest(message),
            ChatError::RoomNotFound { .. } | ChatError::MessageNotFound { .. } => {
                GatewayError::NotFound(err.to_string())
            }
            ChatError::Forbidden { reason } => GatewayError::Forbidden(reason),
            ChatError::Storage(message) => GatewayError::StorageUnavailable(message),
            ChatError::Internal(detail) => {
                // Log the detail here; the response stays generic.
                error!(detail = %detail, "internal error reached the gateway");
                GatewayError::InternalError
            }
        }
    }
}
