//! GitHub Contents API backend.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::{validate_path, Document, DocumentStore, Revision, StoreError};
use crate::config::GitHubSettings;

const USER_AGENT: &str = "portal-admin-backend";
const ACCEPT_JSON: &str = "application/vnd.github.v3+json";
const ACCEPT_RAW: &str = "application/vnd.github.raw";

/// Response body of `GET /repos/{owner}/{repo}/contents/{path}` for a file.
#[derive(Debug, Deserialize)]
struct ContentsResponse {
    sha: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    size: u64,
}

/// Request body of `PUT /repos/{owner}/{repo}/contents/{path}`.
#[derive(Debug, Serialize)]
struct PutRequest<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
    branch: &'a str,
}

#[derive(Debug, Deserialize)]
struct PutResponse {
    content: PutContent,
}

#[derive(Debug, Deserialize)]
struct PutContent {
    sha: String,
}

/// Document store backed by a GitHub repository branch.
pub struct GitHubStore {
    client: Client,
    api_url: String,
    repo: String,
    branch: String,
    token: String,
}

impl GitHubStore {
    pub fn new(settings: &GitHubSettings) -> Result<Self, StoreError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static(ACCEPT_JSON));

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            repo: settings.repo.clone(),
            branch: settings.branch.clone(),
            token: settings.token.clone(),
        })
    }

    fn contents_url(&self, path: &str) -> String {
        format!("{}/repos/{}/contents/{}", self.api_url, self.repo, path)
    }

    /// Files above 1 MB come back without inline content; fetch them raw.
    async fn fetch_raw(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        let response = self
            .client
            .get(self.contents_url(path))
            .query(&[("ref", self.branch.as_str())])
            .bearer_auth(&self.token)
            .header(header::ACCEPT, ACCEPT_RAW)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Remote {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

/// Decode the base64 content GitHub returns, which is wrapped at 60 columns.
fn decode_content(encoded: &str) -> Result<Vec<u8>, StoreError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(compact)
        .map_err(|e| StoreError::Decode(e.to_string()))
}

#[async_trait]
impl DocumentStore for GitHubStore {
    async fn fetch_document(&self, path: &str) -> Result<Option<Document>, StoreError> {
        validate_path(path)?;

        let response = self
            .client
            .get(self.contents_url(path))
            .query(&[("ref", self.branch.as_str())])
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            tracing::debug!("GitHub document {} does not exist", path);
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("GitHub fetch of {} failed: {} {}", path, status, body);
            return Err(StoreError::Remote {
                status: status.as_u16(),
                body,
            });
        }

        let file: ContentsResponse = response.json().await?;
        let content = match (file.encoding.as_deref(), file.content.as_deref()) {
            (Some("base64"), Some(encoded)) => decode_content(encoded)?,
            _ if file.size == 0 => Vec::new(),
            _ => self.fetch_raw(path).await?,
        };

        tracing::debug!("Fetched {} at revision {}", path, file.sha);
        Ok(Some(Document {
            content,
            revision: Revision::new(file.sha),
        }))
    }

    async fn put_document(
        &self,
        path: &str,
        content: &[u8],
        revision: Option<&Revision>,
        message: &str,
    ) -> Result<Revision, StoreError> {
        validate_path(path)?;

        let body = PutRequest {
            message,
            content: STANDARD.encode(content),
            sha: revision.map(Revision::as_str),
            branch: &self.branch,
        };

        let response = self
            .client
            .put(self.contents_url(path))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::CONFLICT || status == StatusCode::UNPROCESSABLE_ENTITY {
            let detail = response.text().await.unwrap_or_default();
            tracing::warn!("GitHub rejected write to {} ({}): {}", path, status, detail);
            return Err(StoreError::Conflict {
                path: path.to_string(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("GitHub write of {} failed: {} {}", path, status, body);
            return Err(StoreError::Remote {
                status: status.as_u16(),
                body,
            });
        }

        let written: PutResponse = response.json().await?;
        tracing::info!("Committed {} at revision {}", path, written.content.sha);
        Ok(Revision::new(written.content.sha))
    }

    fn backend_name(&self) -> &'static str {
        "github"
    }
}
