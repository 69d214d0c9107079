//! Local draft cache.
//!
//! Holds the working copy of one collection. Every mutation is snapshotted to a
//! [`KeyValueStore`] so unpublished edits survive a restart; only a successful publish
//! clears the dirty flag.

mod kv;

pub use kv::*;

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::Record;
use crate::store::{DocumentStore, Revision};

/// Durable snapshot of a draft.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot<T> {
    records: T,
    dirty: bool,
    saved_at: String,
}

/// Where [`DraftCache::load`] got its records from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LoadSource {
    Remote,
    Snapshot,
    Empty,
}

pub struct DraftCache<R: Record> {
    document_path: String,
    store: Arc<dyn DocumentStore>,
    snapshots: Arc<dyn KeyValueStore>,
    records: Vec<R>,
    revision: Option<Revision>,
    dirty: bool,
}

impl<R: Record> DraftCache<R> {
    pub fn new(
        document_path: impl Into<String>,
        store: Arc<dyn DocumentStore>,
        snapshots: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            document_path: document_path.into(),
            store,
            snapshots,
            records: Vec::new(),
            revision: None,
            dirty: false,
        }
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn document_path(&self) -> &str {
        &self.document_path
    }

    /// Revision of the document as last loaded from the store.
    pub fn revision(&self) -> Option<&Revision> {
        self.revision.as_ref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn find(&self, id: u64) -> Option<&R> {
        self.records.iter().find(|r| r.id() == id)
    }

    /// Load from the store, falling back to the snapshot, then to an empty collection.
    pub async fn load(&mut self) -> LoadSource {
        match self.fetch_remote().await {
            Ok((records, revision)) => {
                tracing::info!(
                    "Loaded {} {} from {}",
                    records.len(),
                    R::COLLECTION,
                    self.document_path
                );
                self.records = records;
                self.revision = revision;
                self.dirty = false;
                self.persist_snapshot().await;
                LoadSource::Remote
            }
            Err(e) => {
                tracing::warn!("Failed to load {} from store: {}", R::COLLECTION, e);
                self.restore_snapshot_or_empty().await
            }
        }
    }

    /// Startup path: keep unpublished edits from a dirty snapshot, otherwise [`load`].
    ///
    /// [`load`]: DraftCache::load
    pub async fn recover(&mut self) -> LoadSource {
        match self.read_snapshot().await {
            Some(snapshot) if snapshot.dirty => {
                tracing::warn!(
                    "Restoring {} unpublished {} from snapshot saved at {}",
                    snapshot.records.len(),
                    R::COLLECTION,
                    snapshot.saved_at
                );
                self.records = snapshot.records;
                self.dirty = true;
                LoadSource::Snapshot
            }
            _ => self.load().await,
        }
    }

    /// Drop the local snapshot and reload from the store.
    pub async fn discard(&mut self) -> LoadSource {
        if let Err(e) = self.snapshots.remove(R::COLLECTION).await {
            tracing::warn!("Failed to remove {} snapshot: {}", R::COLLECTION, e);
        }
        self.dirty = false;
        self.load().await
    }

    /// Apply `change` to a copy of the records; commit it and snapshot on success.
    pub async fn mutate<T, F>(&mut self, change: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut Vec<R>) -> Result<T, AppError>,
    {
        let mut next = self.records.clone();
        let result = change(&mut next)?;
        self.records = next;
        self.dirty = true;
        self.persist_snapshot().await;
        Ok(result)
    }

    /// Called by the publisher once the aggregate document is written. The snapshot is
    /// rewritten as clean so a failed reload cannot resurrect the pre-publish state.
    pub async fn mark_published(&mut self, revision: Revision) {
        self.revision = Some(revision);
        self.dirty = false;
        self.persist_snapshot().await;
    }

    async fn fetch_remote(&self) -> Result<(Vec<R>, Option<Revision>), AppError> {
        match self.store.fetch_document(&self.document_path).await? {
            Some(doc) => {
                let records: Vec<R> = serde_json::from_slice(&doc.content).map_err(|e| {
                    AppError::Internal(format!(
                        "Malformed {} document: {}",
                        self.document_path, e
                    ))
                })?;
                Ok((records, Some(doc.revision)))
            }
            None => Ok((Vec::new(), None)),
        }
    }

    async fn restore_snapshot_or_empty(&mut self) -> LoadSource {
        match self.read_snapshot().await {
            Some(snapshot) => {
                tracing::info!(
                    "Using {} snapshot with {} records",
                    R::COLLECTION,
                    snapshot.records.len()
                );
                self.records = snapshot.records;
                self.dirty = snapshot.dirty;
                LoadSource::Snapshot
            }
            None => {
                self.records = Vec::new();
                self.dirty = false;
                LoadSource::Empty
            }
        }
    }

    async fn read_snapshot(&self) -> Option<Snapshot<Vec<R>>> {
        let raw = match self.snapshots.get(R::COLLECTION).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!("Failed to read {} snapshot: {}", R::COLLECTION, e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!("Ignoring unreadable {} snapshot: {}", R::COLLECTION, e);
                None
            }
        }
    }

    /// Snapshot failures are logged, never fatal: the snapshot is only a safety net.
    async fn persist_snapshot(&self) {
        let snapshot = Snapshot {
            records: self.records.as_slice(),
            dirty: self.dirty,
            saved_at: Utc::now().to_rfc3339(),
        };
        let result = match serde_json::to_string(&snapshot) {
            Ok(raw) => self.snapshots.set(R::COLLECTION, &raw).await,
            Err(e) => {
                tracing::warn!("Failed to serialize {} snapshot: {}", R::COLLECTION, e);
                return;
            }
        };
        if let Err(e) = result {
            tracing::warn!("Failed to persist {} snapshot: {}", R::COLLECTION, e);
        }
    }
}
