//! Check-then-write with bounded retry on revision conflicts.
//!
//! The store offers no true compare-and-swap across clients: between reading the current
//! revision and writing, another writer can slip in. A rejected write re-reads the revision
//! and tries again, a bounded number of times, then fails closed.

use std::time::Duration;

use super::{DocumentStore, Revision, StoreError};

/// Retry and pacing parameters for remote writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total write attempts per document, first try included
    pub attempts: u32,
    /// Backoff unit; the wait before retry `n` is `backoff * n`
    pub backoff: Duration,
    /// Pause between consecutive auxiliary writes of one publish run
    pub pacing: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_secs(2),
            pacing: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff * attempt
    }
}

/// Result of a successful [`write_with_retry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// A new revision was committed.
    Written(Revision),
    /// The stored content already matched; nothing was written.
    Unchanged(Revision),
}

impl WriteOutcome {
    pub fn revision(&self) -> &Revision {
        match self {
            WriteOutcome::Written(rev) | WriteOutcome::Unchanged(rev) => rev,
        }
    }

    pub fn was_written(&self) -> bool {
        matches!(self, WriteOutcome::Written(_))
    }
}

/// Write `content` to `path`, fetching the current revision first.
///
/// Only [`StoreError::Conflict`] is retried. Identical content is left alone.
pub async fn write_with_retry(
    store: &dyn DocumentStore,
    path: &str,
    content: &[u8],
    message: &str,
    policy: &RetryPolicy,
) -> Result<WriteOutcome, StoreError> {
    let mut attempt = 1;
    loop {
        let current = store.fetch_document(path).await?;
        if let Some(doc) = &current {
            if doc.content == content {
                tracing::debug!("{} unchanged at revision {}", path, doc.revision);
                return Ok(WriteOutcome::Unchanged(doc.revision.clone()));
            }
        }

        let revision = current.as_ref().map(|doc| &doc.revision);
        match store.put_document(path, content, revision, message).await {
            Ok(written) => return Ok(WriteOutcome::Written(written)),
            Err(StoreError::Conflict { .. }) if attempt < policy.attempts => {
                let delay = policy.backoff_for(attempt);
                tracing::warn!(
                    "Conflict writing {} (attempt {}/{}), retrying in {:?}",
                    path,
                    attempt,
                    policy.attempts,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                if matches!(e, StoreError::Conflict { .. }) {
                    tracing::error!(
                        "Giving up on {} after {} conflicting attempts",
                        path,
                        attempt
                    );
                }
                return Err(e);
            }
        }
    }
}
