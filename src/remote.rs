//! Backends holding the single diary document.
//!
//! Both backends expose the same conditional-write contract: `put` takes the
//! revision the caller read and fails with [`StoreError::StaleRevision`] when
//! the stored document no longer matches it.

use crate::config::BackendConfig;
use crate::errors::StoreError;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{fmt, path::PathBuf, time::Duration};
use tokio::{fs, sync::Mutex};
use tracing::debug;

const USER_AGENT: &str = concat!("diary-app/", env!("CARGO_PKG_VERSION"));
const ACCEPT_JSON: &str = "application/vnd.github+json";
const ACCEPT_RAW: &str = "application/vnd.github.raw";

/// Opaque version token of the stored document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Revision(pub String);

impl Revision {
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(bytes)))
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

#[derive(Debug, Clone)]
pub struct RemoteDocument {
    pub bytes: Vec<u8>,
    pub revision: Revision,
}

pub enum Remote {
    GitHub(GitHubContents),
    File(LocalFile),
}

impl Remote {
    pub fn from_config(config: &BackendConfig) -> Result<Self, StoreError> {
        match config {
            BackendConfig::GitHub {
                api_base,
                repo,
                path,
                branch,
                token,
            } => Ok(Remote::GitHub(GitHubContents::new(
                api_base.clone(),
                repo.clone(),
                path.clone(),
                branch.clone(),
                token.clone(),
            )?)),
            BackendConfig::File { path } => Ok(Remote::File(LocalFile::new(path.clone()))),
        }
    }

    pub async fn fetch(&self) -> Result<RemoteDocument, StoreError> {
        match self {
            Remote::GitHub(github) => github.fetch().await,
            Remote::File(file) => file.fetch().await,
        }
    }

    pub async fn put(
        &self,
        bytes: Vec<u8>,
        expected: Option<&Revision>,
        message: &str,
    ) -> Result<Revision, StoreError> {
        match self {
            Remote::GitHub(github) => github.put(bytes, expected, message).await,
            Remote::File(file) => file.put(bytes, expected).await,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Remote::GitHub(github) => format!(
                "github:{}/{}@{}",
                github.repo, github.path, github.branch
            ),
            Remote::File(file) => format!("file:{}", file.path.display()),
        }
    }
}

/// A file in a GitHub repository, read and written through the contents API.
pub struct GitHubContents {
    client: reqwest::Client,
    api_base: String,
    repo: String,
    path: String,
    branch: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    sha: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: String,
}

#[derive(Debug, Serialize)]
struct PutContentsRequest<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct PutContentsResponse {
    content: PutContentsFile,
}

#[derive(Debug, Deserialize)]
struct PutContentsFile {
    sha: String,
}

impl GitHubContents {
    pub fn new(
        api_base: String,
        repo: String,
        path: String,
        branch: String,
        token: Option<String>,
    ) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            api_base,
            repo,
            path,
            branch,
            token,
        })
    }

    fn contents_url(&self) -> String {
        format!("{}/repos/{}/contents/{}", self.api_base, self.repo, self.path)
    }

    fn blob_url(&self, sha: &str) -> String {
        format!("{}/repos/{}/git/blobs/{}", self.api_base, self.repo, sha)
    }

    fn request(
        &self,
        method: reqwest::Method,
        url: String,
        accept: &str,
    ) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, url).header("Accept", accept);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub async fn fetch(&self) -> Result<RemoteDocument, StoreError> {
        let response = self
            .request(reqwest::Method::GET, self.contents_url(), ACCEPT_JSON)
            .query(&[("ref", self.branch.as_str())])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(read_error(Failure::read(response).await));
        }

        let file: ContentsResponse = response.json().await?;
        let bytes = match file.encoding.as_str() {
            "base64" => {
                let packed: String = file.content.split_whitespace().collect();
                STANDARD
                    .decode(packed)
                    .map_err(|err| StoreError::Encoding(err.to_string()))?
            }
            // Files over 1 MB are listed without inline content.
            "none" => self.fetch_blob(&file.sha).await?,
            other => {
                return Err(StoreError::Encoding(format!(
                    "unsupported content encoding {other:?}"
                )));
            }
        };
        debug!(sha = %file.sha, len = bytes.len(), "fetched diary document");

        Ok(RemoteDocument {
            bytes,
            revision: Revision(file.sha),
        })
    }

    /// Raw bytes of the blob `sha`, so content and revision always agree.
    async fn fetch_blob(&self, sha: &str) -> Result<Vec<u8>, StoreError> {
        let response = self
            .request(reqwest::Method::GET, self.blob_url(sha), ACCEPT_RAW)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(read_error(Failure::read(response).await));
        }
        Ok(response.bytes().await?.to_vec())
    }

    pub async fn put(
        &self,
        bytes: Vec<u8>,
        expected: Option<&Revision>,
        message: &str,
    ) -> Result<Revision, StoreError> {
        if self.token.is_none() {
            return Err(StoreError::MissingToken);
        }

        let body = PutContentsRequest {
            message,
            content: STANDARD.encode(&bytes),
            branch: &self.branch,
            sha: expected.map(Revision::as_str),
        };
        let response = self
            .request(reqwest::Method::PUT, self.contents_url(), ACCEPT_JSON)
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(write_error(Failure::read(response).await, expected));
        }

        let written: PutContentsResponse = response.json().await?;
        Ok(Revision(written.content.sha))
    }
}

/// What a failed GitHub response carried.
struct Failure {
    status: StatusCode,
    rate_limited: bool,
    body: String,
}

impl Failure {
    async fn read(response: reqwest::Response) -> Self {
        let status = response.status();
        let rate_limited = response
            .headers()
            .get("x-ratelimit-remaining")
            .is_some_and(|remaining| remaining.as_bytes() == b"0");
        let body = response.text().await.unwrap_or_default();
        Self {
            status,
            rate_limited,
            body,
        }
    }
}

fn read_error(failure: Failure) -> StoreError {
    match failure.status {
        StatusCode::NOT_FOUND => StoreError::NotFound,
        StatusCode::FORBIDDEN if failure.rate_limited => StoreError::Remote {
            status: failure.status.as_u16(),
            body: failure.body,
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreError::Unauthorized,
        status => StoreError::Remote {
            status: status.as_u16(),
            body: failure.body,
        },
    }
}

fn write_error(failure: Failure, expected: Option<&Revision>) -> StoreError {
    match failure.status {
        // 409: sha mismatch. 422: sha missing for a file that now exists.
        StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => StoreError::StaleRevision {
            expected: expected.map(|revision| revision.0.clone()),
        },
        _ => read_error(failure),
    }
}

/// The diary document as a JSON file on local disk.
pub struct LocalFile {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl LocalFile {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    pub async fn fetch(&self) -> Result<RemoteDocument, StoreError> {
        match fs::read(&self.path).await {
            Ok(bytes) => Ok(RemoteDocument {
                revision: Revision::of_bytes(&bytes),
                bytes,
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn put(
        &self,
        bytes: Vec<u8>,
        expected: Option<&Revision>,
    ) -> Result<Revision, StoreError> {
        let _guard = self.write_lock.lock().await;

        let current = match fs::read(&self.path).await {
            Ok(existing) => Some(Revision::of_bytes(&existing)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => return Err(err.into()),
        };
        if current.as_ref() != expected {
            return Err(StoreError::StaleRevision {
                expected: expected.map(|revision| revision.0.clone()),
            });
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&self.path, &bytes).await?;
        Ok(Revision::of_bytes(&bytes))
    }
}
