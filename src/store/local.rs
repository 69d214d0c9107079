//! Local disk backend.
//!
//! Revisions are git blob SHA-1s of the file content, so a stale token is detected the
//! same way GitHub detects it. Writes are serialized in-process to make the
//! compare-and-swap atomic for this process.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{git_blob_sha, validate_path, Document, DocumentStore, Revision, StoreError};

/// Document store rooted at a local directory.
pub struct LocalStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl LocalStore {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StoreError> {
        validate_path(path)?;
        Ok(self.root.join(path))
    }

    async fn read(file: &Path) -> Result<Option<Vec<u8>>, StoreError> {
        match tokio::fs::read(file).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl DocumentStore for LocalStore {
    async fn fetch_document(&self, path: &str) -> Result<Option<Document>, StoreError> {
        let file = self.resolve(path)?;
        Ok(Self::read(&file).await?.map(|content| {
            let revision = git_blob_sha(&content);
            Document { content, revision }
        }))
    }

    async fn put_document(
        &self,
        path: &str,
        content: &[u8],
        revision: Option<&Revision>,
        message: &str,
    ) -> Result<Revision, StoreError> {
        let file = self.resolve(path)?;
        let _guard = self.write_lock.lock().await;

        let current = Self::read(&file).await?.map(|bytes| git_blob_sha(&bytes));
        if current.as_ref() != revision {
            tracing::warn!(
                "Rejected write to {}: expected {:?}, found {:?}",
                path,
                revision,
                current
            );
            return Err(StoreError::Conflict {
                path: path.to_string(),
            });
        }

        if let Some(parent) = file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write beside the target and rename so readers never see a torn file
        let staging = file.with_extension("tmp-write");
        tokio::fs::write(&staging, content).await?;
        tokio::fs::rename(&staging, &file).await?;

        let written = git_blob_sha(content);
        tracing::info!("{} ({} at revision {})", message, path, written);
        Ok(written)
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}
