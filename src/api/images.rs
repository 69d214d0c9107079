//! Image upload endpoints.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ApiJson;
use crate::assets::{decode_image_payload, AssetDestination};
use crate::errors::AppError;
use crate::AppState;

/// Folder used by form uploads that name none.
pub const DEFAULT_FORM_FOLDER: &str = "activity_images";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadImageRequest {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub folder_name: Option<String>,
    /// Accepted as a number or a string
    #[serde(default)]
    pub image_number: Option<Value>,
    #[serde(default)]
    pub base_folder: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub path: String,
}

impl UploadResponse {
    fn uploaded(path: String) -> Json<Self> {
        Json(Self {
            success: true,
            message: "Image uploaded successfully".to_string(),
            path,
        })
    }
}

/// POST /api/github/upload-image - Store one base64 image and return its public path.
pub async fn upload_image(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<UploadImageRequest>,
) -> Result<Json<UploadResponse>, AppError> {
    let image = request
        .image
        .filter(|image| !image.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("No image data provided".to_string()))?;

    let bytes = decode_image_payload(&image, state.uploader.max_bytes())?;

    let folder_name = request
        .folder_name
        .ok_or_else(|| AppError::BadRequest("folderName is required".to_string()))?;
    let image_number = match request.image_number {
        Some(Value::String(number)) => number,
        Some(Value::Number(number)) => number.to_string(),
        _ => return Err(AppError::BadRequest("imageNumber is required".to_string())),
    };

    let destination =
        AssetDestination::new(request.base_folder.as_deref(), &folder_name, &image_number)?;
    let path = state.uploader.upload_image(&bytes, &destination).await?;

    Ok(UploadResponse::uploaded(path))
}

/// POST /api/images/upload - Multipart form upload with `image`, `folderName` and
/// `imageNumber` fields.
pub async fn upload_image_form(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let mut multipart = multipart?;

    let mut image = None;
    let mut folder_name = None;
    let mut image_number = None;
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => image = Some(field.bytes().await?),
            "folderName" => folder_name = Some(field.text().await?),
            "imageNumber" => image_number = Some(field.text().await?),
            other => tracing::debug!("Ignoring form field {:?}", other),
        }
    }

    let image = image
        .filter(|bytes| !bytes.is_empty())
        .ok_or_else(|| AppError::BadRequest("No file uploaded".to_string()))?;
    let folder_name = folder_name
        .filter(|f| !f.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_FORM_FOLDER.to_string());
    let image_number = image_number
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| "0".to_string());

    let destination = AssetDestination::new(None, &folder_name, &image_number)?;
    let path = state.uploader.upload_image(&image, &destination).await?;

    Ok(UploadResponse::uploaded(path))
}
