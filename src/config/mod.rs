//! Configuration module for the portal admin backend.
//!
//! All configuration is loaded from environment variables with sensible defaults. The
//! GitHub backend needs a token and a repository; their absence fails fast.

use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::assets::{COMPRESSED_IMAGE_LIMIT, RAW_IMAGE_LIMIT};
use crate::errors::AppError;
use crate::models::RecordDefaults;
use crate::store::RetryPolicy;

/// Credentials and coordinates of the GitHub repository used as a datastore.
#[derive(Clone)]
pub struct GitHubSettings {
    pub token: String,
    /// `owner/repo`
    pub repo: String,
    pub branch: String,
    pub api_url: String,
}

impl fmt::Debug for GitHubSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubSettings")
            .field("token", &"<redacted>")
            .field("repo", &self.repo)
            .field("branch", &self.branch)
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// Where documents and images are persisted.
#[derive(Debug, Clone)]
pub enum StoreBackend {
    GitHub(GitHubSettings),
    Local { root: PathBuf },
}

/// Tracing output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreBackend,
    /// Leading path segment of every stored asset, stripped from public paths
    pub storage_root: String,
    pub careers_path: String,
    pub activities_path: String,
    /// Folder receiving career description text files
    pub descriptions_dir: String,
    /// Directory of the durable draft snapshots; `None` keeps them in memory
    pub snapshot_dir: Option<PathBuf>,
    pub max_image_bytes: usize,
    pub retry: RetryPolicy,
    /// Id given to the first record of an empty collection
    pub first_record_id: u64,
    pub defaults: RecordDefaults,
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_process_env()
    }

    /// Same as [`Config::from_env`] without reading a `.env` file.
    fn from_process_env() -> Result<Self, AppError> {
        let store = match var_or("PORTAL_STORE_BACKEND", "github").as_str() {
            "github" => StoreBackend::GitHub(github_from_env()?),
            "local" => StoreBackend::Local {
                root: var_or("PORTAL_LOCAL_ROOT", "./storage").into(),
            },
            other => {
                return Err(AppError::Configuration(format!(
                    "Unknown PORTAL_STORE_BACKEND '{}' (expected github or local)",
                    other
                )))
            }
        };

        let max_image_bytes = match var_or("PORTAL_IMAGE_MODE", "raw").as_str() {
            "raw" => RAW_IMAGE_LIMIT,
            "compressed" => COMPRESSED_IMAGE_LIMIT,
            other => {
                return Err(AppError::Configuration(format!(
                    "Unknown PORTAL_IMAGE_MODE '{}' (expected raw or compressed)",
                    other
                )))
            }
        };

        let retry = RetryPolicy {
            attempts: parse_var("PORTAL_RETRY_ATTEMPTS", 3)?,
            backoff: Duration::from_millis(parse_var("PORTAL_RETRY_BACKOFF_MS", 2000)?),
            pacing: Duration::from_millis(parse_var("PORTAL_PUBLISH_PACING_MS", 1000)?),
        };
        if retry.attempts == 0 {
            return Err(AppError::Configuration(
                "PORTAL_RETRY_ATTEMPTS must be at least 1".to_string(),
            ));
        }

        let mut defaults = RecordDefaults::default();
        if let Ok(location) = env::var("PORTAL_DEFAULT_LOCATION") {
            defaults.career.location = location;
        }
        if let Ok(job_type) = env::var("PORTAL_DEFAULT_JOB_TYPE") {
            defaults.career.job_type = job_type;
        }

        let log_format = match var_or("PORTAL_LOG_FORMAT", "text").as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(Self {
            store,
            storage_root: var_or("PORTAL_STORAGE_ROOT", "public"),
            careers_path: var_or("PORTAL_CAREERS_PATH", "public/data/career.json"),
            activities_path: var_or("PORTAL_ACTIVITIES_PATH", "public/data/activity.json"),
            descriptions_dir: var_or("PORTAL_DESCRIPTIONS_DIR", "public/docs"),
            snapshot_dir: Some(var_or("PORTAL_SNAPSHOT_DIR", "./data/drafts"))
                .filter(|dir| !dir.trim().is_empty())
                .map(PathBuf::from),
            max_image_bytes,
            retry,
            first_record_id: parse_var("PORTAL_FIRST_RECORD_ID", 1)?,
            defaults,
            bind_addr: parse_var("PORTAL_BIND_ADDR", SocketAddr::from(([127, 0, 0, 1], 8080)))?,
            log_level: var_or("PORTAL_LOG_LEVEL", "info"),
            log_format,
        })
    }
}

fn github_from_env() -> Result<GitHubSettings, AppError> {
    let token = env::var("GITHUB_TOKEN").ok().filter(|v| !v.trim().is_empty());
    let repo = env::var("GITHUB_REPO").ok().filter(|v| !v.trim().is_empty());

    let (Some(token), Some(repo)) = (token, repo) else {
        return Err(AppError::Configuration(
            "GitHub configuration missing: GITHUB_TOKEN and GITHUB_REPO are required".to_string(),
        ));
    };

    if repo.split('/').filter(|part| !part.is_empty()).count() != 2 {
        return Err(AppError::Configuration(format!(
            "GITHUB_REPO must look like owner/repo, got '{}'",
            repo
        )));
    }

    Ok(GitHubSettings {
        token,
        repo,
        branch: var_or("GITHUB_BRANCH", "main"),
        api_url: var_or("GITHUB_API_URL", "https://api.github.com"),
    })
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T>(name: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Configuration(format!("Invalid {} '{}': {}", name, raw, e))),
        Err(_) => Ok(default),
    }
}
