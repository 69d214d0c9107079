//! Draft workflow endpoints.
//!
//! The same handlers serve every collection; [`DraftCollection`] picks the editor out of
//! the application state.

use axum::{
    extract::State,
    routing::{get, post, put},
    Router,
};
use serde::Serialize;
use serde_json::Value;

use super::{success, ApiJson, ApiPath, ApiResponse, ApiResult};
use crate::draft::LoadSource;
use crate::editor::EditorStatus;
use crate::models::{Activity, Career, Record};
use crate::publish::PublishReport;
use crate::{AppState, SharedEditor};

/// A record type with an editor in [`AppState`].
pub trait DraftCollection: Record {
    fn editor(state: &AppState) -> &SharedEditor<Self>;
}

impl DraftCollection for Career {
    fn editor(state: &AppState) -> &SharedEditor<Self> {
        &state.careers
    }
}

impl DraftCollection for Activity {
    fn editor(state: &AppState) -> &SharedEditor<Self> {
        &state.activities
    }
}

/// Routes for one collection mounted under `prefix`.
pub fn draft_routes<R: DraftCollection>(prefix: &str) -> Router<AppState> {
    Router::new()
        .route(prefix, get(list_drafts::<R>).post(add_draft::<R>))
        .route(&format!("{prefix}/publish"), post(publish_drafts::<R>))
        .route(&format!("{prefix}/reload"), post(reload_drafts::<R>))
        .route(
            &format!("{prefix}/{{id}}"),
            put(edit_draft::<R>).delete(delete_draft::<R>),
        )
        .route(
            &format!("{prefix}/{{id}}/visibility"),
            post(toggle_draft_visibility::<R>),
        )
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftListing<R> {
    pub records: Vec<R>,
    pub dirty: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    pub editor: EditorStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loaded_from: Option<LoadSource>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityChange {
    pub id: u64,
    pub is_visible: bool,
}

/// GET /api/drafts/{collection}
pub async fn list_drafts<R: DraftCollection>(
    State(state): State<AppState>,
) -> ApiResult<DraftListing<R>> {
    let editor = R::editor(&state).lock().await;
    let draft = editor.draft();
    Ok(ApiResponse::new(DraftListing {
        records: draft.records().to_vec(),
        dirty: draft.is_dirty(),
        revision: draft.revision().map(ToString::to_string),
        editor: editor.status(),
        loaded_from: None,
    }))
}

/// POST /api/drafts/{collection} - Append a record built from a form.
pub async fn add_draft<R: DraftCollection>(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<R> {
    let form: R::Form = serde_json::from_value(body)?;
    let mut editor = R::editor(&state).lock().await;
    let record = editor.add(form).await?;
    success(record, format!("{} record added", R::COLLECTION))
}

/// PUT /api/drafts/{collection}/{id} - Edit a record in one step.
pub async fn edit_draft<R: DraftCollection>(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
    ApiJson(patch): ApiJson<Value>,
) -> ApiResult<R> {
    let mut editor = R::editor(&state).lock().await;
    editor.begin_edit(id)?;
    if let Err(e) = editor.update_form(patch) {
        editor.cancel();
        return Err(e);
    }
    let record = editor.save().await?;
    success(record, format!("{} record {} updated", R::COLLECTION, id))
}

/// DELETE /api/drafts/{collection}/{id}
pub async fn delete_draft<R: DraftCollection>(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<()> {
    let mut editor = R::editor(&state).lock().await;
    editor.delete(id).await?;
    Ok(ApiResponse::message_only(format!(
        "{} record {} deleted",
        R::COLLECTION,
        id
    )))
}

/// POST /api/drafts/{collection}/{id}/visibility
pub async fn toggle_draft_visibility<R: DraftCollection>(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<VisibilityChange> {
    let mut editor = R::editor(&state).lock().await;
    let is_visible = editor.toggle_visibility(id).await?;
    Ok(ApiResponse::new(VisibilityChange { id, is_visible }))
}

/// POST /api/drafts/{collection}/publish
pub async fn publish_drafts<R: DraftCollection>(
    State(state): State<AppState>,
) -> ApiResult<PublishReport> {
    let mut editor = R::editor(&state).lock().await;
    let report = state.publisher.publish(editor.draft_mut()).await?;
    success(report, format!("{} published", R::COLLECTION))
}

/// POST /api/drafts/{collection}/reload - Drop local edits and reload from the store.
pub async fn reload_drafts<R: DraftCollection>(
    State(state): State<AppState>,
) -> ApiResult<DraftListing<R>> {
    let mut editor = R::editor(&state).lock().await;
    editor.cancel();
    let loaded_from = editor.draft_mut().discard().await;
    let draft = editor.draft();
    Ok(ApiResponse::new(DraftListing {
        records: draft.records().to_vec(),
        dirty: draft.is_dirty(),
        revision: draft.revision().map(ToString::to_string),
        editor: editor.status(),
        loaded_from: Some(loaded_from),
    }))
}
