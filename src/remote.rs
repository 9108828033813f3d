//! Remote file store access: list a Box folder and stream file content.
//!
//! [`RemoteStore`] is the seam the orchestrator depends on; [`BoxClient`] is
//! the reqwest implementation against the Box v2 REST API. Tests and callers
//! with another store plug their own implementation in.
//!
//! Every request is bounded by the client timeout and carries the bearer
//! token. There is no retry here; the orchestrator decides whether a failed
//! download is worth another attempt.

use crate::config::BatchConfig;
use crate::error::RemoteError;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Fields requested for each listed item. Box omits `size` and
/// `modified_at` from the default (mini) representation.
const ITEM_FIELDS: &str = "id,name,type,size,modified_at";

/// The kind of an item in a folder listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Folder,
    WebLink,
    #[serde(other)]
    Other,
}

/// Snapshot of one remote item at listing time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteEntry {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub modified_at: Option<DateTime<FixedOffset>>,
}

/// List and download operations against a remote file store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Every direct child of `folder_id`, in the order the store returns them.
    async fn list_children(&self, folder_id: &str) -> Result<Vec<RemoteEntry>, RemoteError>;

    /// Stream the content of `file_id` into `destination`, returning the
    /// number of bytes written.
    async fn download(&self, file_id: &str, destination: &Path) -> Result<u64, RemoteError>;
}

/// One page of `GET /folders/{id}/items`.
#[derive(Debug, Deserialize)]
struct ItemsPage {
    #[serde(default)]
    entries: Vec<RemoteEntry>,
    #[serde(default)]
    total_count: Option<u64>,
}

/// Box REST client.
pub struct BoxClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
    timeout_secs: u64,
    page_size: u32,
}

impl BoxClient {
    /// Create a client with a fixed per-request timeout.
    pub fn new(
        base_url: impl Into<String>,
        access_token: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, RemoteError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| RemoteError::Transport {
                url: base_url.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            http,
            base_url,
            access_token: access_token.into(),
            timeout_secs,
            page_size: 1000,
        })
    }

    /// Build a client from the run configuration.
    pub fn from_config(config: &BatchConfig) -> Result<Self, RemoteError> {
        Ok(Self::new(
            config.base_url.clone(),
            config.access_token.clone(),
            config.request_timeout_secs,
        )?
        .with_page_size(config.page_size))
    }

    /// Entries requested per listing page (1–1000).
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, 1000);
        self
    }

    fn ensure_token(&self) -> Result<(), RemoteError> {
        if self.access_token.trim().is_empty() {
            return Err(RemoteError::missing_token());
        }
        Ok(())
    }

    fn request_error(&self, url: &str, e: reqwest::Error) -> RemoteError {
        if e.is_timeout() {
            RemoteError::Timeout {
                url: url.to_string(),
                secs: self.timeout_secs,
            }
        } else {
            RemoteError::Transport {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    }

    async fn get(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<reqwest::Response, RemoteError> {
        debug!("GET {}", url);
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.access_token)
            .query(query)
            .send()
            .await
            .map_err(|e| self.request_error(url, e))?;
        check_status(url, response)
    }

    async fn stream_to_file(
        &self,
        url: &str,
        response: reqwest::Response,
        destination: &Path,
    ) -> Result<u64, RemoteError> {
        let write_err = |source| RemoteError::WriteFailed {
            path: destination.to_path_buf(),
            source,
        };

        let mut file = tokio::fs::File::create(destination)
            .await
            .map_err(write_err)?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| self.request_error(url, e))?;
            file.write_all(&chunk).await.map_err(write_err)?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(write_err)?;

        Ok(written)
    }
}

#[async_trait]
impl RemoteStore for BoxClient {
    async fn list_children(&self, folder_id: &str) -> Result<Vec<RemoteEntry>, RemoteError> {
        self.ensure_token()?;
        let url = format!("{}/folders/{}/items", self.base_url, folder_id);

        let mut entries = Vec::new();
        let mut offset: u64 = 0;
        loop {
            let query = [
                ("fields", ITEM_FIELDS.to_string()),
                ("limit", self.page_size.to_string()),
                ("offset", offset.to_string()),
            ];
            let response = self.get(&url, &query).await?;
            let body = response
                .bytes()
                .await
                .map_err(|e| self.request_error(&url, e))?;
            let page: ItemsPage =
                serde_json::from_slice(&body).map_err(|e| RemoteError::MalformedResponse {
                    url: url.clone(),
                    reason: e.to_string(),
                })?;

            let fetched = page.entries.len() as u64;
            entries.extend(page.entries);
            offset += fetched;

            match page.total_count {
                Some(total) if fetched > 0 && offset < total => {
                    debug!("Folder {}: {}/{} entries, fetching next page", folder_id, offset, total);
                }
                _ => break,
            }
        }

        info!("Listed {} entries in Box folder {}", entries.len(), folder_id);
        Ok(entries)
    }

    async fn download(&self, file_id: &str, destination: &Path) -> Result<u64, RemoteError> {
        self.ensure_token()?;
        let url = format!("{}/files/{}/content", self.base_url, file_id);

        let response = self.get(&url, &[]).await?;
        match self.stream_to_file(&url, response, destination).await {
            Ok(bytes) => {
                info!("Downloaded {} bytes to {}", bytes, destination.display());
                Ok(bytes)
            }
            Err(e) => {
                // Never leave a truncated file behind.
                if let Err(rm) = tokio::fs::remove_file(destination).await {
                    if rm.kind() != std::io::ErrorKind::NotFound {
                        warn!("Could not remove partial download {}: {}", destination.display(), rm);
                    }
                }
                Err(e)
            }
        }
    }
}

/// Map HTTP status codes onto the error taxonomy.
fn check_status(url: &str, response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(RemoteError::Unauthorized {
            detail: format!("HTTP {} from {}", status, url),
        });
    }
    Err(RemoteError::HttpStatus {
        url: url.to_string(),
        status: status.as_u16(),
    })
}
