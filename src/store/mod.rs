//! Document store module.
//!
//! A store holds path-addressed documents, each tagged with a content-hash revision
//! token. Writes must present the latest revision (or none, to create) and are rejected
//! with [`StoreError::Conflict`] otherwise. The GitHub backend is the canonical one; the
//! local backend mirrors its semantics on disk.

mod github;
mod local;
mod sync;

pub use github::*;
pub use local::*;
pub use sync::*;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::config::StoreBackend;

/// Errors raised by a document store. No retries happen at this layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("revision conflict on {path}")]
    Conflict { path: String },
    #[error("remote store returned {status}: {body}")]
    Remote { status: u16, body: String },
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("invalid storage path: {0}")]
    InvalidPath(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("undecodable content: {0}")]
    Decode(String),
}

/// Opaque content-hash revision token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(String);

impl Revision {
    pub fn new(sha: impl Into<String>) -> Self {
        Self(sha.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A document as last observed in the store.
#[derive(Debug, Clone)]
pub struct Document {
    pub content: Vec<u8>,
    pub revision: Revision,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read a document. `Ok(None)` means the path does not exist.
    async fn fetch_document(&self, path: &str) -> Result<Option<Document>, StoreError>;

    /// Write a document, creating a new revision.
    ///
    /// With `Some(revision)` the write replaces that exact revision; with `None` it creates
    /// the document and fails if the path already exists.
    async fn put_document(
        &self,
        path: &str,
        content: &[u8],
        revision: Option<&Revision>,
        message: &str,
    ) -> Result<Revision, StoreError>;

    fn backend_name(&self) -> &'static str;
}

/// Open the store selected by configuration.
pub fn open_store(backend: &StoreBackend) -> Result<Arc<dyn DocumentStore>, StoreError> {
    match backend {
        StoreBackend::GitHub(settings) => Ok(Arc::new(GitHubStore::new(settings)?)),
        StoreBackend::Local { root } => Ok(Arc::new(LocalStore::new(root))),
    }
}

/// Reject empty, absolute or parent-relative storage paths.
pub fn validate_path(path: &str) -> Result<(), StoreError> {
    let invalid = path.is_empty()
        || path.starts_with('/')
        || path.contains('\\')
        || path
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..");

    if invalid {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    Ok(())
}

/// Git blob SHA-1 of `content`, the same token GitHub reports for a file.
pub fn git_blob_sha(content: &[u8]) -> Revision {
    let mut hasher = Sha1::new();
    hasher.update(format!("blob {}\0", content.len()).as_bytes());
    hasher.update(content);
    Revision(format!("{:x}", hasher.finalize()))
}
