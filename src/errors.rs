use aws_smithy_types::error::operation::BuildError as SmithyBuildError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use uuid::Uuid;

// --- Store / Upstream Errors ---

#[derive(Error, Debug)]
pub enum RepoError {
    #[error("Caption not found with ID: {0}")]
    NotFound(Uuid),

    #[error("Stored item could not be parsed: {0}")]
    DataCorruption(String),

    #[error("Database backend error: {0}")]
    BackendError(#[from] anyhow::Error), // Wrap Anyhow errors from the store layer
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Could not presign upload for key '{key}': {reason}")]
    PresignFailed { key: String, reason: String },

    #[error("Storage backend error: {0}")]
    BackendError(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("{service} returned status {status}")]
    Status { service: &'static str, status: u16 },

    #[error("{service} returned an unusable response: {detail}")]
    MalformedResponse {
        service: &'static str,
        detail: String,
    },

    #[error("transport failure calling {service}: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

// --- Web Layer Error ---

#[derive(Error, Debug)]
pub enum AppError {
    // Request credential / validation errors
    #[error("Authentication required: {0}")]
    Unauthenticated(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid ID format: {0}")]
    InvalidUuid(#[from] uuid::Error),

    // Unknown referenced entities
    #[error("Caption not found with ID: {0}")]
    CaptionNotFound(Uuid),
    #[error("Image not found with ID: {0}")]
    ImageNotFound(Uuid),

    // Mapped layer failures; each request fails independently, nothing retries
    #[error("Could not complete store operation")]
    Persistence(#[source] RepoError),
    #[error("Could not complete object storage operation")]
    Storage(#[source] StorageError),
    #[error("Could not complete upstream service call")]
    Upstream(#[source] UpstreamError),

    // Configuration / startup errors
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Initialization error: {0}")]
    InitError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// --- Conversions from layer errors to AppError ---

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(id) => AppError::CaptionNotFound(id),
            e => AppError::Persistence(e),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::Storage(err)
    }
}

impl From<UpstreamError> for AppError {
    fn from(err: UpstreamError) -> Self {
        AppError::Upstream(err)
    }
}

impl From<crate::config::ConfigError> for AppError {
    fn from(err: crate::config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<SmithyBuildError> for AppError {
    fn from(err: SmithyBuildError) -> Self {
        AppError::InitError(format!("Failed to build AWS request: {}", err))
    }
}

// --- Axum Response Implementation ---

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            // 4xx Client Errors
            AppError::Unauthenticated(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::InvalidUuid(e) => {
                (StatusCode::BAD_REQUEST, format!("Invalid ID format: {}", e))
            }
            AppError::CaptionNotFound(id) => (
                StatusCode::NOT_FOUND,
                format!("Caption not found with ID: {}", id),
            ),
            AppError::ImageNotFound(id) => (
                StatusCode::NOT_FOUND,
                format!("Image not found with ID: {}", id),
            ),

            // 5xx Server Errors
            AppError::Persistence(e) => {
                tracing::error!(error.source = ?e, "Store operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database operation failed".to_string(),
                )
            }
            AppError::Storage(e) => {
                tracing::error!(error.source = ?e, "Object storage operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Object storage operation failed".to_string(),
                )
            }
            AppError::Upstream(e) => {
                tracing::error!(error.source = ?e, "Upstream service call failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Upstream service call failed".to_string(),
                )
            }
            AppError::ConfigError(msg) => {
                tracing::error!("Configuration error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Server configuration error".to_string(),
                )
            }
            AppError::InitError(msg) => {
                tracing::error!("Initialization error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Server initialization error".to_string(),
                )
            }
            AppError::Io(e) => {
                tracing::error!(error.source = ?e, "IO error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred".to_string(),
                )
            }
        };

        // Log the specific error variant and message
        tracing::error!(error.message = %error_message, error.detail = %self, "Responding with error");

        // Uniform failure envelope
        let body = Json(serde_json::json!({ "success": false, "error": error_message }));
        (status, body).into_response()
    }
}
