//! Common error types for the gateway

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::api::envelope::ApiResponse;
use crate::store::StoreError;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// A store fault with the caller-facing message it should surface as
    #[error("{context}")]
    Store {
        context: String,
        #[source]
        source: StoreError,
    },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    /// Wrap a store fault, replacing its details with `context` for the caller
    pub fn store(context: impl Into<String>, source: StoreError) -> Self {
        AppError::Store {
            context: context.into(),
            source,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Store { source, .. } => match source {
                StoreError::Conflict(_) => StatusCode::CONFLICT,
                StoreError::NotFound(_) => StatusCode::NOT_FOUND,
                StoreError::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(source: StoreError) -> Self {
        AppError::store("Storage operation failed", source)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Configuration details stay in the logs
        let message = match &self {
            AppError::Config(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        (status, Json(ApiResponse::<()>::failure(message))).into_response()
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
