//! Image upload module.
//!
//! Images arrive as base64 (optionally a `data:` URL) and are stored under
//! `{storage_root}/{base_folder}/{folder}/{number}.jpg`. Callers get back the public
//! path without the storage root.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::Utc;

use crate::errors::AppError;
use crate::store::{write_with_retry, DocumentStore, RetryPolicy};

/// Limit when images are uploaded as-is.
pub const RAW_IMAGE_LIMIT: usize = 4 * 1024 * 1024;
/// Limit when the client compresses images before upload.
pub const COMPRESSED_IMAGE_LIMIT: usize = 2 * 1024 * 1024;

pub const DEFAULT_BASE_FOLDER: &str = "image/social";

/// Where an uploaded image goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDestination {
    base_folder: String,
    folder_name: String,
    image_number: String,
}

impl AssetDestination {
    pub fn new(
        base_folder: Option<&str>,
        folder_name: &str,
        image_number: &str,
    ) -> Result<Self, AppError> {
        let base_folder = base_folder
            .map(|b| b.trim().trim_matches('/'))
            .filter(|b| !b.is_empty())
            .unwrap_or(DEFAULT_BASE_FOLDER);

        let folder_name = folder_name.trim();
        let image_number = image_number.trim();

        if folder_name.is_empty() || folder_name.contains('/') {
            return Err(AppError::Validation(
                "folderName must be a single non-empty path segment".to_string(),
            ));
        }
        if image_number.is_empty() || image_number.contains('/') {
            return Err(AppError::Validation(
                "imageNumber must be a single non-empty path segment".to_string(),
            ));
        }
        if [base_folder, folder_name, image_number]
            .iter()
            .any(|part| part.split('/').any(|s| s == ".." || s == "."))
        {
            return Err(AppError::Validation(
                "Image destination may not contain relative segments".to_string(),
            ));
        }

        Ok(Self {
            base_folder: base_folder.to_string(),
            folder_name: folder_name.to_string(),
            image_number: image_number.to_string(),
        })
    }

    pub fn file_name(&self) -> String {
        format!("{}.jpg", self.image_number)
    }

    /// Path the website uses to reference the image.
    pub fn relative_path(&self) -> String {
        format!(
            "/{}/{}/{}",
            self.base_folder,
            self.folder_name,
            self.file_name()
        )
    }

    /// Path inside the store.
    pub fn store_path(&self, storage_root: &str) -> String {
        let root = storage_root.trim_matches('/');
        if root.is_empty() {
            self.relative_path().trim_start_matches('/').to_string()
        } else {
            format!("{}{}", root, self.relative_path())
        }
    }
}

/// Decode a base64 image, rejecting anything larger than `limit` bytes.
///
/// The size is estimated from the encoded length first so that huge payloads are not
/// decoded at all.
pub fn decode_image_payload(payload: &str, limit: usize) -> Result<Vec<u8>, AppError> {
    let encoded = match payload.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => payload,
    };
    let encoded: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();

    let padding = encoded.chars().rev().take_while(|c| *c == '=').count();
    let estimated = (encoded.len() / 4 * 3).saturating_sub(padding);
    if estimated > limit {
        return Err(AppError::PayloadTooLarge {
            size: estimated,
            limit,
        });
    }

    let bytes = STANDARD
        .decode(encoded.as_bytes())
        .map_err(|e| AppError::BadRequest(format!("Invalid base64 image data: {}", e)))?;

    if bytes.len() > limit {
        return Err(AppError::PayloadTooLarge {
            size: bytes.len(),
            limit,
        });
    }
    Ok(bytes)
}

/// Uploads images into the document store.
pub struct ImageUploader {
    store: Arc<dyn DocumentStore>,
    storage_root: String,
    max_bytes: usize,
    retry: RetryPolicy,
}

impl ImageUploader {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        storage_root: impl Into<String>,
        max_bytes: usize,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            storage_root: storage_root.into(),
            max_bytes,
            retry,
        }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Store `bytes` at `destination`, replacing any existing image.
    pub async fn upload_image(
        &self,
        bytes: &[u8],
        destination: &AssetDestination,
    ) -> Result<String, AppError> {
        if bytes.len() > self.max_bytes {
            tracing::warn!(
                "Rejected {} byte image for {} (limit {})",
                bytes.len(),
                destination.relative_path(),
                self.max_bytes
            );
            return Err(AppError::PayloadTooLarge {
                size: bytes.len(),
                limit: self.max_bytes,
            });
        }

        let path = destination.store_path(&self.storage_root);
        let message = format!(
            "Upload image {} - {}",
            destination.file_name(),
            Utc::now().to_rfc3339()
        );

        let outcome =
            write_with_retry(self.store.as_ref(), &path, bytes, &message, &self.retry).await?;
        tracing::info!(
            "Image stored at {} (revision {}, written: {})",
            path,
            outcome.revision(),
            outcome.was_written()
        );

        Ok(destination.relative_path())
    }
}
