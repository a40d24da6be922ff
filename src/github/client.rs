// ABOUTME: GitHub contents API client: create-or-update uploads, listings, repo management
// An existing entry's sha is probed first and attached to the write so the
// store accepts the overwrite; batches are serialized, so the probe/write
// window is never raced.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use super::error::GitHubError;
use crate::config::BotConfig;
use crate::models::{RemoteEntry, RemoteEntryKind, UploadOutcome};

const API_ROOT: &str = "https://api.github.com";
const USER_AGENT: &str = "gitdrop";

/// Timeout for metadata calls (probe, list, repo management).
const CONTROL_TIMEOUT: Duration = Duration::from_secs(10);
/// Timeout for content transfer calls.
const TRANSFER_TIMEOUT: Duration = Duration::from_secs(30);

/// Seam between the upload pipeline and the concrete GitHub client, so the
/// orchestrator can be exercised against a mock store.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ContentStore {
    async fn upload(&self, content: &[u8], remote_path: &str)
        -> Result<UploadOutcome, GitHubError>;
}

pub struct GitHubClient {
    http: reqwest::Client,
    token: String,
    owner: String,
    repo: String,
}

#[derive(Debug, Deserialize)]
struct ContentMeta {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct EntryMeta {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

impl GitHubClient {
    /// Build a client from the live config. Fails with `NotConfigured`
    /// until token, owner, and repository name are all set.
    pub fn from_config(config: &BotConfig) -> Result<Self, GitHubError> {
        if config.github_token.is_empty()
            || config.github_user.is_empty()
            || config.repo_name.is_empty()
        {
            return Err(GitHubError::NotConfigured);
        }
        Ok(Self {
            http: reqwest::Client::new(),
            token: config.github_token.clone(),
            owner: config.github_user.clone(),
            repo: config.repo_name.clone(),
        })
    }

    fn repo_url(&self) -> String {
        format!("{API_ROOT}/repos/{}/{}", self.owner, self.repo)
    }

    fn contents_url(&self, remote_path: &str) -> String {
        format!("{}/contents/{}", self.repo_url(), remote_path)
    }

    fn with_headers(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", "application/vnd.github.v3+json")
            .header("User-Agent", USER_AGENT)
    }

    /// Ask the store for the version token of an existing entry, if any.
    async fn probe_sha(&self, url: &str) -> Result<Option<String>, GitHubError> {
        let response = self
            .with_headers(self.http.get(url))
            .timeout(CONTROL_TIMEOUT)
            .send()
            .await?;
        if response.status() == StatusCode::OK {
            let meta: ContentMeta = response.json().await?;
            Ok(Some(meta.sha))
        } else {
            Ok(None)
        }
    }

    async fn remote_error(response: reqwest::Response) -> GitHubError {
        let status = response.status().as_u16();
        let message = response
            .json::<ApiErrorBody>()
            .await
            .ok()
            .and_then(|body| body.message)
            .unwrap_or_else(|| "unknown error".to_string());
        GitHubError::Remote { status, message }
    }

    /// List entries directly under `path` in the repository. Single request,
    /// no pagination; callers truncate the display themselves.
    pub async fn list(&self, path: &str) -> Result<Vec<RemoteEntry>, GitHubError> {
        let url = self.contents_url(path);
        let response = self
            .with_headers(self.http.get(&url))
            .timeout(CONTROL_TIMEOUT)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(Self::remote_error(response).await);
        }

        let entries: Vec<EntryMeta> = response.json().await?;
        Ok(entries
            .into_iter()
            .map(|entry| RemoteEntry {
                kind: if entry.kind == "dir" {
                    RemoteEntryKind::Dir
                } else {
                    RemoteEntryKind::File
                },
                name: entry.name,
                size: entry.size,
            })
            .collect())
    }

    /// Check whether the configured repository exists at all.
    pub async fn repo_exists(&self) -> Result<bool, GitHubError> {
        let response = self
            .with_headers(self.http.get(self.repo_url()))
            .timeout(CONTROL_TIMEOUT)
            .send()
            .await?;
        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(Self::remote_error(response).await),
        }
    }

    /// Create a repository under the authenticated user, initialized with a
    /// default branch so contents writes work immediately.
    pub async fn create_repo(&self, name: &str) -> Result<(), GitHubError> {
        let url = format!("{API_ROOT}/user/repos");
        let body = json!({
            "name": name,
            "private": false,
            "auto_init": true,
        });
        let response = self
            .with_headers(self.http.post(&url))
            .json(&body)
            .timeout(CONTROL_TIMEOUT)
            .send()
            .await?;
        if response.status() == StatusCode::CREATED {
            Ok(())
        } else {
            Err(Self::remote_error(response).await)
        }
    }
}

#[async_trait]
impl ContentStore for GitHubClient {
    async fn upload(
        &self,
        content: &[u8],
        remote_path: &str,
    ) -> Result<UploadOutcome, GitHubError> {
        let url = self.contents_url(remote_path);
        let existing_sha = self.probe_sha(&url).await?;
        debug!(
            remote_path,
            exists = existing_sha.is_some(),
            "uploading to repository"
        );

        let body = upload_body(remote_path, content, existing_sha.as_deref());
        let response = self
            .with_headers(self.http.put(&url))
            .json(&body)
            .timeout(TRANSFER_TIMEOUT)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK | StatusCode::CREATED => Ok(outcome_for(existing_sha.is_some())),
            _ => Err(Self::remote_error(response).await),
        }
    }
}

/// Compose the contents API write body. The version token is attached only
/// when the probe found an existing entry, turning the write into an update.
fn upload_body(remote_path: &str, content: &[u8], existing_sha: Option<&str>) -> Value {
    let mut body = json!({
        "message": format!("Upload: {remote_path}"),
        "content": BASE64.encode(content),
        "branch": "main",
    });
    if let Some(sha) = existing_sha {
        body["sha"] = Value::String(sha.to_string());
    }
    body
}

fn outcome_for(had_existing_entry: bool) -> UploadOutcome {
    if had_existing_entry {
        UploadOutcome::Updated
    } else {
        UploadOutcome::Created
    }
}

/// Compose `dir/name` into a canonical repository path: no leading or
/// trailing separator, no doubled separators. The directory component comes
/// from a local relative path, which may be empty (root) or already
/// separator-terminated.
pub fn normalize_remote_path(dir: &str, name: &str) -> String {
    let dir = dir.trim_matches('/');
    let joined = if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    };
    let mut path = joined;
    while path.contains("//") {
        path = path.replace("//", "/");
    }
    path.trim_matches('/').to_string()
}
