//! Collection document and description file endpoints.

use axum::extract::State;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{success, ApiJson, ApiResult};
use crate::errors::AppError;
use crate::models::Record;
use crate::store::{write_with_retry, WriteOutcome};
use crate::{AppState, SharedEditor};

/// Body of the document replace endpoints.
#[derive(Debug, Deserialize)]
pub struct SaveDocumentRequest {
    #[serde(default)]
    pub data: Option<Value>,
}

/// Body of the description file endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveDescriptionRequest {
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// Actions accepted by `POST /api/github/save-career`.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum SaveCareerAction {
    SaveCareerJson {
        data: Value,
    },
    #[serde(rename_all = "camelCase")]
    SaveDescription {
        file_name: String,
        content: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedDocument {
    pub path: String,
    pub revision: String,
    pub written: bool,
}

impl SavedDocument {
    fn new(path: String, outcome: &WriteOutcome) -> Self {
        Self {
            path,
            revision: outcome.revision().to_string(),
            written: outcome.was_written(),
        }
    }
}

/// POST /api/careers/save - Replace the careers document.
pub async fn save_careers(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SaveDocumentRequest>,
) -> ApiResult<SavedDocument> {
    let saved = replace_collection(&state, &state.careers, request.data).await?;
    success(saved, "Careers saved successfully")
}

/// POST /api/activities/save - Replace the activities document.
pub async fn save_activities(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SaveDocumentRequest>,
) -> ApiResult<SavedDocument> {
    let saved = replace_collection(&state, &state.activities, request.data).await?;
    success(saved, "Activities saved successfully")
}

/// POST /api/github/save-description - Write one description text file.
pub async fn save_description(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SaveDescriptionRequest>,
) -> ApiResult<SavedDocument> {
    let (Some(file_name), Some(content)) = (request.file_name, request.content) else {
        return Err(AppError::BadRequest(
            "FileName and content are required".to_string(),
        ));
    };
    let saved = write_description(&state, &file_name, &content).await?;
    success(saved, "Description file saved successfully")
}

/// POST /api/github/save-career - Dispatch on `action`.
pub async fn save_career(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<SavedDocument> {
    let action: SaveCareerAction = serde_json::from_value(body)
        .map_err(|e| AppError::BadRequest(format!("Invalid save-career request: {}", e)))?;

    match action {
        SaveCareerAction::SaveCareerJson { data } => {
            let saved = replace_collection(&state, &state.careers, Some(data)).await?;
            success(saved, "Career data saved successfully")
        }
        SaveCareerAction::SaveDescription { file_name, content } => {
            let saved = write_description(&state, &file_name, &content).await?;
            success(saved, "Description file saved successfully")
        }
    }
}

async fn replace_collection<R: Record>(
    state: &AppState,
    editor: &SharedEditor<R>,
    data: Option<Value>,
) -> Result<SavedDocument, AppError> {
    let data = match data {
        Some(Value::Null) | None => {
            return Err(AppError::BadRequest("No data provided".to_string()))
        }
        Some(data) => data,
    };
    if let Value::Array(items) = &data {
        tracing::info!("Saving {} {} items", items.len(), R::COLLECTION);
    }

    let path = {
        let editor = editor.lock().await;
        editor.draft().document_path().to_string()
    };
    let content = serde_json::to_vec_pretty(&data)?;
    let message = format!("Update {} - {}", R::COLLECTION, Utc::now().to_rfc3339());
    let outcome = write_with_retry(
        state.store.as_ref(),
        &path,
        &content,
        &message,
        &state.config.retry,
    )
    .await?;

    // A clean draft follows the document; a dirty one keeps its unpublished edits
    let mut editor = editor.lock().await;
    if !editor.draft().is_dirty() {
        editor.draft_mut().load().await;
    }

    Ok(SavedDocument::new(path, &outcome))
}

async fn write_description(
    state: &AppState,
    file_name: &str,
    content: &str,
) -> Result<SavedDocument, AppError> {
    let file_name = file_name.trim();
    if file_name.is_empty() || file_name.contains('/') {
        return Err(AppError::Validation(
            "fileName must be a plain file name".to_string(),
        ));
    }

    let path = format!(
        "{}/{}",
        state.config.descriptions_dir.trim_end_matches('/'),
        file_name
    );
    let message = format!("Update description file: {}", file_name);
    let outcome = write_with_retry(
        state.store.as_ref(),
        &path,
        content.as_bytes(),
        &message,
        &state.config.retry,
    )
    .await?;

    tracing::info!("Description file saved: {}", path);
    Ok(SavedDocument::new(path, &outcome))
}
