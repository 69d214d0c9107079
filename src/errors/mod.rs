//! Error handling module for the portal admin backend.
//!
//! Provides centralized error types with mapping to HTTP status codes and response envelopes.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::publish::FailedRecord;
use crate::store::StoreError;

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const CONFIGURATION_ERROR: &str = "CONFIGURATION_ERROR";
    pub const PAYLOAD_TOO_LARGE: &str = "PAYLOAD_TOO_LARGE";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const BAD_REQUEST: &str = "BAD_REQUEST";
    pub const CONFLICT: &str = "CONFLICT";
    pub const REMOTE_STORE_ERROR: &str = "REMOTE_STORE_ERROR";
    pub const NETWORK_ERROR: &str = "NETWORK_ERROR";
    pub const PUBLISH_ABORTED: &str = "PUBLISH_ABORTED";
    pub const METHOD_NOT_ALLOWED: &str = "METHOD_NOT_ALLOWED";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    /// Missing or malformed configuration, raised before any network call
    Configuration(String),
    /// Upload payload exceeds the configured limit
    PayloadTooLarge { size: usize, limit: usize },
    /// Request body refused before it was read in full
    BodyTooLarge(String),
    /// Record not found in the draft collection
    NotFound(String),
    /// Input failed a domain rule
    Validation(String),
    /// Malformed request
    BadRequest(String),
    /// Stale revision token after the retry budget was spent
    Conflict(String),
    /// Remote store answered with an unexpected status
    RemoteStore { status: u16, body: String },
    /// Transport failure talking to the remote store
    Network(String),
    /// Auxiliary writes failed, the aggregate document was not written
    PublishAborted { failed: Vec<FailedRecord> },
    /// Route exists but not for this method
    MethodNotAllowed(String),
    /// Internal server error
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::BodyTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::RemoteStore { .. } => StatusCode::BAD_GATEWAY,
            AppError::Network(_) => StatusCode::BAD_GATEWAY,
            AppError::PublishAborted { .. } => StatusCode::BAD_GATEWAY,
            AppError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Configuration(_) => codes::CONFIGURATION_ERROR,
            AppError::PayloadTooLarge { .. } => codes::PAYLOAD_TOO_LARGE,
            AppError::BodyTooLarge(_) => codes::PAYLOAD_TOO_LARGE,
            AppError::NotFound(_) => codes::NOT_FOUND,
            AppError::Validation(_) => codes::VALIDATION_ERROR,
            AppError::BadRequest(_) => codes::BAD_REQUEST,
            AppError::Conflict(_) => codes::CONFLICT,
            AppError::RemoteStore { .. } => codes::REMOTE_STORE_ERROR,
            AppError::Network(_) => codes::NETWORK_ERROR,
            AppError::PublishAborted { .. } => codes::PUBLISH_ABORTED,
            AppError::MethodNotAllowed(_) => codes::METHOD_NOT_ALLOWED,
            AppError::Internal(_) => codes::INTERNAL_ERROR,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        match self {
            AppError::Configuration(msg) => msg.clone(),
            AppError::PayloadTooLarge { size, limit } => format!(
                "Image too large ({} bytes). Maximum size is {} MB.",
                size,
                limit / (1024 * 1024)
            ),
            AppError::BodyTooLarge(msg) => msg.clone(),
            AppError::NotFound(msg) => msg.clone(),
            AppError::Validation(msg) => msg.clone(),
            AppError::BadRequest(msg) => msg.clone(),
            AppError::Conflict(msg) => msg.clone(),
            AppError::RemoteStore { status, .. } => format!("Remote store error: {}", status),
            AppError::Network(msg) => msg.clone(),
            AppError::PublishAborted { failed } => {
                let ids: Vec<String> = failed.iter().map(|f| f.id.to_string()).collect();
                format!(
                    "Publish aborted: {} record(s) failed ({})",
                    failed.len(),
                    ids.join(", ")
                )
            }
            AppError::MethodNotAllowed(msg) => msg.clone(),
            AppError::Internal(msg) => msg.clone(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::RemoteStore { status, body } => {
                Some(serde_json::json!({ "status": status, "body": body }))
            }
            AppError::PayloadTooLarge { size, limit } => {
                Some(serde_json::json!({ "size": size, "limit": limit }))
            }
            AppError::PublishAborted { failed } => Some(serde_json::json!({ "failed": failed })),
            _ => None,
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for AppError {}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { path } => {
                AppError::Conflict(format!("Revision conflict on {}", path))
            }
            StoreError::Remote { status, body } => {
                tracing::error!("Remote store error {}: {}", status, body);
                AppError::RemoteStore { status, body }
            }
            StoreError::Network(e) => {
                tracing::error!("Network error: {:?}", e);
                AppError::Network(format!("Network error: {}", e))
            }
            StoreError::InvalidPath(path) => {
                AppError::BadRequest(format!("Invalid storage path: {}", path))
            }
            err @ (StoreError::Io(_) | StoreError::Decode(_)) => {
                tracing::error!("Store error: {:?}", err);
                AppError::Internal(err.to_string())
            }
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        tracing::warn!("JSON error: {:?}", err);
        AppError::BadRequest(format!("JSON error: {}", err))
    }
}

/// Extractor rejections become envelopes too; only an over-long body keeps its 413.
fn rejected(status: StatusCode, text: String) -> AppError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::BodyTooLarge(text)
    } else {
        AppError::BadRequest(text)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        rejected(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        rejected(rejection.status(), rejection.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        rejected(rejection.status(), rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        rejected(err.status(), err.body_text())
    }
}

/// Error response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error: &AppError) -> Self {
        Self {
            success: false,
            error: error.message(),
            code: error.error_code().to_string(),
            details: error.details(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!("Request failed: {}", self);
        }
        (status, Json(ErrorResponse::new(&self))).into_response()
    }
}
