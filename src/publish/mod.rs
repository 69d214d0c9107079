//! Publish orchestrator.
//!
//! Brings the store in line with a draft: auxiliary text files first, one at a time, then
//! the collection document. The document is written only if every auxiliary file made it.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::draft::{DraftCache, LoadSource};
use crate::errors::AppError;
use crate::models::Record;
use crate::store::{write_with_retry, DocumentStore, RetryPolicy, WriteOutcome};

/// A record whose auxiliary file could not be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedRecord {
    pub id: u64,
    pub path: String,
    pub reason: String,
}

/// Summary of a successful publish.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishReport {
    pub collection: &'static str,
    pub records: usize,
    pub revision: String,
    pub document_written: bool,
    pub auxiliary_written: usize,
    pub auxiliary_unchanged: usize,
    pub reloaded_from: LoadSource,
}

pub struct Publisher {
    store: Arc<dyn DocumentStore>,
    policy: RetryPolicy,
    descriptions_dir: String,
    cycle: Mutex<()>,
}

impl Publisher {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        policy: RetryPolicy,
        descriptions_dir: impl Into<String>,
    ) -> Self {
        Self {
            store,
            policy,
            descriptions_dir: descriptions_dir.into(),
            cycle: Mutex::new(()),
        }
    }

    /// Publish `draft`. Only one publish runs at a time.
    pub async fn publish<R: Record>(
        &self,
        draft: &mut DraftCache<R>,
    ) -> Result<PublishReport, AppError> {
        let _cycle = self.cycle.lock().await;
        tracing::info!(
            "Publishing {} {} to {} store",
            draft.records().len(),
            R::COLLECTION,
            self.store.backend_name()
        );

        let auxiliary: Vec<_> = draft
            .records()
            .iter()
            .flat_map(|record| {
                let id = record.id();
                record
                    .auxiliary_files(&self.descriptions_dir)
                    .into_iter()
                    .map(move |file| (id, file))
            })
            .collect();

        let mut failed = Vec::new();
        let mut auxiliary_written = 0;
        let mut auxiliary_unchanged = 0;

        for (index, (id, file)) in auxiliary.iter().enumerate() {
            if index > 0 && !self.policy.pacing.is_zero() {
                tokio::time::sleep(self.policy.pacing).await;
            }

            let message = format!("Update description file: {}", file.name);
            match write_with_retry(
                self.store.as_ref(),
                &file.path,
                file.content.as_bytes(),
                &message,
                &self.policy,
            )
            .await
            {
                Ok(WriteOutcome::Written(_)) => auxiliary_written += 1,
                Ok(WriteOutcome::Unchanged(_)) => auxiliary_unchanged += 1,
                Err(e) => {
                    tracing::warn!("Auxiliary file {} for record {} failed: {}", file.path, id, e);
                    failed.push(FailedRecord {
                        id: *id,
                        path: file.path.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if !failed.is_empty() {
            tracing::error!(
                "Aborting {} publish: {} auxiliary write(s) failed",
                R::COLLECTION,
                failed.len()
            );
            return Err(AppError::PublishAborted { failed });
        }

        let content = serde_json::to_vec_pretty(draft.records())
            .map_err(|e| AppError::Internal(format!("Failed to serialize {}: {}", R::COLLECTION, e)))?;
        let message = format!("Update {} - {}", R::COLLECTION, Utc::now().to_rfc3339());

        let outcome = write_with_retry(
            self.store.as_ref(),
            draft.document_path(),
            &content,
            &message,
            &self.policy,
        )
        .await?;

        let document_written = outcome.was_written();
        let revision = outcome.revision().clone();
        draft.mark_published(revision.clone()).await;
        let reloaded_from = draft.load().await;

        tracing::info!(
            "Published {} at revision {} (document written: {}, files written: {})",
            R::COLLECTION,
            revision,
            document_written,
            auxiliary_written
        );

        Ok(PublishReport {
            collection: R::COLLECTION,
            records: draft.records().len(),
            revision: revision.to_string(),
            document_written,
            auxiliary_written,
            auxiliary_unchanged,
            reloaded_from,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GitHubSettings;
    use crate::draft::{KeyValueStore, MemoryKeyValueStore};
    use crate::models::Career;
    use crate::store::{Document, GitHubStore, LocalStore, Revision, StoreError};
    use async_trait::async_trait;
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CAREERS: &str = "public/data/career.json";

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            attempts: 3,
            backoff: Duration::from_millis(5),
            pacing: Duration::from_millis(1),
        }
    }

    async fn local_draft(
        dir: &TempDir,
        seed: Value,
    ) -> (Arc<dyn DocumentStore>, DraftCache<Career>) {
        let store: Arc<dyn DocumentStore> = Arc::new(LocalStore::new(dir.path()));
        store
            .put_document(CAREERS, seed.to_string().as_bytes(), None, "seed")
            .await
            .unwrap();
        let mut draft = DraftCache::new(CAREERS, store.clone(), Arc::new(MemoryKeyValueStore::new()));
        draft.load().await;
        (store, draft)
    }

    /// Answers 502 to every read once a write has gone through.
    struct FlakyAfterWrite {
        inner: LocalStore,
        written: AtomicBool,
    }

    #[async_trait]
    impl DocumentStore for FlakyAfterWrite {
        async fn fetch_document(&self, path: &str) -> Result<Option<Document>, StoreError> {
            if self.written.load(Ordering::SeqCst) {
                return Err(StoreError::Remote {
                    status: 502,
                    body: "bad gateway".to_string(),
                });
            }
            self.inner.fetch_document(path).await
        }

        async fn put_document(
            &self,
            path: &str,
            content: &[u8],
            revision: Option<&Revision>,
            message: &str,
        ) -> Result<Revision, StoreError> {
            let written = self.inner.put_document(path, content, revision, message).await?;
            self.written.store(true, Ordering::SeqCst);
            Ok(written)
        }

        fn backend_name(&self) -> &'static str {
            "flaky"
        }
    }

    #[tokio::test]
    async fn test_failed_reload_after_publish_keeps_draft_clean() {
        let dir = TempDir::new().unwrap();
        let seed = LocalStore::new(dir.path());
        seed.put_document(CAREERS, br#"[{"id": 1, "title": "A"}]"#, None, "seed")
            .await
            .unwrap();

        let store: Arc<dyn DocumentStore> = Arc::new(FlakyAfterWrite {
            inner: LocalStore::new(dir.path()),
            written: AtomicBool::new(false),
        });
        let snapshots: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new());
        let mut draft: DraftCache<Career> =
            DraftCache::new(CAREERS, store.clone(), snapshots.clone());
        draft.load().await;
        draft
            .mutate(|records| {
                records[0].title = "B".to_string();
                Ok(())
            })
            .await
            .unwrap();

        let publisher = Publisher::new(store.clone(), fast_policy(), "public/docs");
        let report = publisher.publish(&mut draft).await.unwrap();

        assert!(report.document_written);
        assert_eq!(report.reloaded_from, LoadSource::Snapshot);
        assert!(!draft.is_dirty());
        assert_eq!(draft.records()[0].title, "B");

        // A restart with the store still failing does not resurrect pending edits
        let mut restarted: DraftCache<Career> = DraftCache::new(CAREERS, store, snapshots);
        assert_eq!(restarted.recover().await, LoadSource::Snapshot);
        assert!(!restarted.is_dirty());
        assert_eq!(restarted.records()[0].title, "B");
    }

    #[tokio::test]
    async fn test_delete_then_publish_empties_document() {
        let dir = TempDir::new().unwrap();
        let (store, mut draft) =
            local_draft(&dir, json!([{"id": 1, "title": "A", "isVisible": true}])).await;
        let publisher = Publisher::new(store.clone(), fast_policy(), "public/docs");

        draft
            .mutate(|records| {
                records.retain(|r| r.id != 1);
                Ok(())
            })
            .await
            .unwrap();
        let report = publisher.publish(&mut draft).await.unwrap();

        assert!(report.document_written);
        assert_eq!(report.reloaded_from, LoadSource::Remote);
        assert!(!draft.is_dirty());

        let doc = store.fetch_document(CAREERS).await.unwrap().unwrap();
        let remote: Value = serde_json::from_slice(&doc.content).unwrap();
        assert_eq!(remote, json!([]));
    }

    #[tokio::test]
    async fn test_second_publish_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let (store, mut draft) = local_draft(
            &dir,
            json!([{"id": 1, "title": "A", "description": "Long", "descriptionFile": "a.txt"}]),
        )
        .await;
        let publisher = Publisher::new(store.clone(), fast_policy(), "public/docs");

        let first = publisher.publish(&mut draft).await.unwrap();
        assert!(first.document_written);
        assert_eq!(first.auxiliary_written, 1);

        let second = publisher.publish(&mut draft).await.unwrap();
        assert!(!second.document_written);
        assert_eq!(second.auxiliary_written, 0);
        assert_eq!(second.auxiliary_unchanged, 1);
        assert_eq!(second.revision, first.revision);

        let description = store
            .fetch_document("public/docs/a.txt")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(description.content, b"Long");
    }

    #[tokio::test]
    async fn test_document_is_pretty_printed() {
        let dir = TempDir::new().unwrap();
        let (store, mut draft) = local_draft(&dir, json!([{"id": 1, "title": "A"}])).await;
        let publisher = Publisher::new(store.clone(), fast_policy(), "public/docs");

        draft
            .mutate(|records| {
                records[0].title = "B".to_string();
                Ok(())
            })
            .await
            .unwrap();
        publisher.publish(&mut draft).await.unwrap();

        let doc = store.fetch_document(CAREERS).await.unwrap().unwrap();
        let text = String::from_utf8(doc.content).unwrap();
        assert!(text.starts_with("[\n  {\n    \"id\": 1,"));
        assert!(text.contains("\"isVisible\": true"));
    }

    #[tokio::test]
    async fn test_auxiliary_conflicts_abort_before_document_write() {
        let server = MockServer::start().await;
        let aux_path = "/repos/acme/storage/contents/public/docs/x.txt";
        let doc_path = "/repos/acme/storage/contents/public/data/career.json";

        Mock::given(method("GET"))
            .and(path(aux_path))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sha": "aux-sha",
                "encoding": "base64",
                "content": STANDARD.encode("old text"),
                "size": 8
            })))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(aux_path))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({"message": "conflict"})))
            .expect(3)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(doc_path))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"content": {"sha": "x"}})))
            .expect(0)
            .mount(&server)
            .await;

        let store: Arc<dyn DocumentStore> = Arc::new(
            GitHubStore::new(&GitHubSettings {
                token: "t".to_string(),
                repo: "acme/storage".to_string(),
                branch: "main".to_string(),
                api_url: server.uri(),
            })
            .unwrap(),
        );
        let mut draft: DraftCache<Career> =
            DraftCache::new(CAREERS, store.clone(), Arc::new(MemoryKeyValueStore::new()));
        draft
            .mutate(|records| {
                records.push(
                    serde_json::from_value(json!({
                        "id": 7,
                        "title": "X",
                        "description": "new text",
                        "descriptionFile": "x.txt"
                    }))
                    .unwrap(),
                );
                Ok(())
            })
            .await
            .unwrap();

        let publisher = Publisher::new(store, fast_policy(), "public/docs");
        let err = publisher.publish(&mut draft).await.unwrap_err();

        match err {
            AppError::PublishAborted { failed } => {
                assert_eq!(failed.len(), 1);
                assert_eq!(failed[0].id, 7);
                assert_eq!(failed[0].path, "public/docs/x.txt");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(draft.is_dirty());
    }
}
