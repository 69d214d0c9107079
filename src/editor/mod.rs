//! Collection editor.
//!
//! A two-state machine over a draft: `Browsing`, or `Editing` one record through a
//! scratch form. Add, delete and visibility toggles go straight to the draft.

use std::sync::Arc;

use chrono::Local;
use serde::Serialize;
use serde_json::Value;

use crate::draft::DraftCache;
use crate::errors::AppError;
use crate::models::{display_date, Record, RecordDefaults};

#[derive(Debug, Clone, PartialEq)]
pub enum EditorState<F> {
    Browsing,
    Editing { id: u64, form: F },
}

/// Serializable view of the editor state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorStatus {
    pub mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editing_id: Option<u64>,
}

pub struct CollectionEditor<R: Record> {
    draft: DraftCache<R>,
    state: EditorState<R::Form>,
    defaults: Arc<RecordDefaults>,
    first_id: u64,
}

impl<R: Record> CollectionEditor<R> {
    pub fn new(draft: DraftCache<R>, defaults: Arc<RecordDefaults>, first_id: u64) -> Self {
        Self {
            draft,
            state: EditorState::Browsing,
            defaults,
            first_id,
        }
    }

    pub fn draft(&self) -> &DraftCache<R> {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut DraftCache<R> {
        &mut self.draft
    }

    pub fn state(&self) -> &EditorState<R::Form> {
        &self.state
    }

    pub fn status(&self) -> EditorStatus {
        match &self.state {
            EditorState::Browsing => EditorStatus {
                mode: "browsing",
                editing_id: None,
            },
            EditorState::Editing { id, .. } => EditorStatus {
                mode: "editing",
                editing_id: Some(*id),
            },
        }
    }

    /// `max(id) + 1`, or the configured first id for an empty collection.
    pub fn next_id(&self) -> Result<u64, AppError> {
        match self.draft.records().iter().map(Record::id).max() {
            None => Ok(self.first_id),
            Some(max) => max.checked_add(1).ok_or_else(|| {
                AppError::Validation(format!(
                    "No id left after {} in {}",
                    max,
                    R::COLLECTION
                ))
            }),
        }
    }

    pub async fn add(&mut self, form: R::Form) -> Result<R, AppError> {
        if R::form_title(&form).trim().is_empty() {
            return Err(AppError::Validation("Please enter a title".to_string()));
        }

        let id = self.next_id()?;
        let today = display_date(Local::now().date_naive());
        let record = R::from_form(id, &form, &self.defaults, &today);

        let added = record.clone();
        self.draft
            .mutate(move |records| {
                records.push(record);
                Ok(())
            })
            .await?;

        tracing::info!("Added {} record {}", R::COLLECTION, id);
        Ok(added)
    }

    /// Enter `Editing(id)`; any unsaved scratch form is discarded.
    pub fn begin_edit(&mut self, id: u64) -> Result<R::Form, AppError> {
        let form = self
            .draft
            .find(id)
            .map(Record::to_form)
            .ok_or_else(|| not_found::<R>(id))?;
        self.state = EditorState::Editing {
            id,
            form: form.clone(),
        };
        Ok(form)
    }

    /// Merge a JSON object into the scratch form.
    pub fn update_form(&mut self, patch: Value) -> Result<&R::Form, AppError> {
        let EditorState::Editing { form, .. } = &mut self.state else {
            return Err(AppError::Validation("No record is being edited".to_string()));
        };
        let Value::Object(changes) = patch else {
            return Err(AppError::BadRequest("Form changes must be a JSON object".to_string()));
        };

        let mut merged = serde_json::to_value(&*form)?;
        if let Value::Object(fields) = &mut merged {
            fields.extend(changes);
        }
        *form = serde_json::from_value(merged)?;
        Ok(form)
    }

    /// Commit the scratch form and return to `Browsing`.
    pub async fn save(&mut self) -> Result<R, AppError> {
        let (id, form) = match std::mem::replace(&mut self.state, EditorState::Browsing) {
            EditorState::Editing { id, form } => (id, form),
            EditorState::Browsing => {
                return Err(AppError::Validation("No record is being edited".to_string()))
            }
        };

        let saved = self
            .draft
            .mutate(|records| {
                let record = records
                    .iter_mut()
                    .find(|r| r.id() == id)
                    .ok_or_else(|| not_found::<R>(id))?;
                record.apply_form(&form);
                Ok(record.clone())
            })
            .await?;

        tracing::info!("Saved {} record {}", R::COLLECTION, id);
        Ok(saved)
    }

    /// Drop the scratch form and return to `Browsing`.
    pub fn cancel(&mut self) {
        self.state = EditorState::Browsing;
    }

    pub async fn delete(&mut self, id: u64) -> Result<(), AppError> {
        self.draft
            .mutate(|records| {
                let before = records.len();
                records.retain(|r| r.id() != id);
                if records.len() == before {
                    return Err(not_found::<R>(id));
                }
                Ok(())
            })
            .await?;

        if matches!(self.state, EditorState::Editing { id: editing, .. } if editing == id) {
            self.cancel();
        }
        tracing::info!("Deleted {} record {}", R::COLLECTION, id);
        Ok(())
    }

    /// Flip visibility; returns the new value.
    pub async fn toggle_visibility(&mut self, id: u64) -> Result<bool, AppError> {
        let visible = self
            .draft
            .mutate(|records| {
                let record = records
                    .iter_mut()
                    .find(|r| r.id() == id)
                    .ok_or_else(|| not_found::<R>(id))?;
                let visible = !record.is_visible();
                record.set_visible(visible);
                Ok(visible)
            })
            .await?;

        tracing::info!("{} record {} visible: {}", R::COLLECTION, id, visible);
        Ok(visible)
    }
}

fn not_found<R: Record>(id: u64) -> AppError {
    AppError::NotFound(format!("{} record {} not found", R::COLLECTION, id))
}
