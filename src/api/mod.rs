//! REST API module.
//!
//! Raw store endpoints used by the admin dashboard, plus the draft workflow.

mod documents;
mod drafts;
mod extract;
mod images;

pub use documents::*;
pub use drafts::*;
pub use extract::*;
pub use images::*;

use axum::{
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;

use crate::errors::AppError;

/// Success response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl ApiResponse<()> {
    pub fn message_only(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, AppError>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T, message: impl Into<String>) -> ApiResult<T> {
    Ok(ApiResponse::new(data).with_message(message))
}

/// GET /api/test - Liveness endpoint kept for the dashboard's connectivity check.
pub async fn test_endpoint() -> impl IntoResponse {
    Json(serde_json::json!({
        "success": true,
        "message": "Test API is working!",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Fallback for known paths hit with the wrong method.
pub async fn method_not_allowed(method: Method, uri: Uri) -> AppError {
    AppError::MethodNotAllowed(format!("Method {} Not Allowed on {}", method, uri.path()))
}

/// Fallback for unknown paths.
pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}
