//! Company CSV feed download
//!
//! Lists the feed folder through the GitHub contents API and saves each
//! `*.csv` entry into the local CSV folder, where [`crate::MergeEngine`]
//! picks it up. A file that fails to download is counted and skipped; only
//! a failed listing aborts the run.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use cprep_common::config::{get_user_agent, FeedConfig};
use cprep_common::{Error, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::source::{FetchError, TransportError};

/// Status and raw body of one GET
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// One-shot GET against the feed host
#[async_trait]
pub trait FeedTransport: Send + Sync {
    async fn get(
        &self,
        url: &str,
        timeout: Duration,
    ) -> std::result::Result<FeedResponse, TransportError>;
}

/// reqwest-backed transport with the GitHub REST headers
pub struct GithubTransport {
    http_client: reqwest::Client,
}

impl GithubTransport {
    pub fn new(config: &FeedConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(
            HeaderName::from_static("x-github-api-version"),
            HeaderValue::from_static("2022-11-28"),
        );
        if let Some(token) = &config.token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| Error::Config(format!("invalid GitHub token: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }

        let http_client = reqwest::Client::builder()
            .user_agent(get_user_agent())
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("HTTP client build failed: {}", e)))?;

        Ok(Self { http_client })
    }
}

#[async_trait]
impl FeedTransport for GithubTransport {
    async fn get(
        &self,
        url: &str,
        timeout: Duration,
    ) -> std::result::Result<FeedResponse, TransportError> {
        debug!(url = %url, "GET feed resource");

        let response = self.http_client.get(url).timeout(timeout).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        Ok(FeedResponse { status, body })
    }
}

/// Entry of a contents listing; other fields are ignored
#[derive(Debug, Clone, Deserialize)]
pub struct FeedEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub download_url: Option<String>,
}

impl FeedEntry {
    fn is_csv_file(&self) -> bool {
        self.kind == "file"
            && self.download_url.is_some()
            && self.name.to_ascii_lowercase().ends_with(".csv")
    }
}

/// Counters for one download run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DownloadReport {
    /// CSV entries in the listing
    pub listed: usize,
    pub saved: usize,
    /// Entries whose name cannot be used as a local file name
    pub rejected: usize,
    pub failed: usize,
    pub cancelled: bool,
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("feed listing failed: {0}")]
    Listing(#[from] FetchError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fetches the company CSV feed into a local folder
pub struct FeedDownloader<T = GithubTransport> {
    transport: T,
    contents_url: String,
    listing_timeout: Duration,
    file_timeout: Duration,
}

impl FeedDownloader<GithubTransport> {
    pub fn from_config(config: &FeedConfig) -> Result<Self> {
        Ok(Self::new(GithubTransport::new(config)?, config))
    }
}

impl<T: FeedTransport> FeedDownloader<T> {
    pub fn new(transport: T, config: &FeedConfig) -> Self {
        Self {
            transport,
            contents_url: contents_url(config),
            listing_timeout: Duration::from_secs(config.listing_timeout_secs),
            file_timeout: Duration::from_secs(config.file_timeout_secs),
        }
    }

    pub fn contents_url(&self) -> &str {
        &self.contents_url
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// CSV file entries of the feed folder
    pub async fn list_csv_entries(&self) -> std::result::Result<Vec<FeedEntry>, FetchError> {
        let body = self.fetch(&self.contents_url, self.listing_timeout).await?;
        let entries: Vec<FeedEntry> =
            serde_json::from_slice(&body).map_err(|e| FetchError::Malformed(e.to_string()))?;

        Ok(entries.into_iter().filter(FeedEntry::is_csv_file).collect())
    }

    /// Save every listed CSV into `out_dir`, overwriting earlier copies
    pub async fn download_all(
        &self,
        out_dir: &Path,
        cancel: &CancellationToken,
    ) -> std::result::Result<DownloadReport, DownloadError> {
        let entries = self.list_csv_entries().await?;
        tokio::fs::create_dir_all(out_dir).await?;

        let mut report = DownloadReport {
            listed: entries.len(),
            ..Default::default()
        };
        info!(url = %self.contents_url, listed = report.listed, "Feed listing fetched");

        for entry in &entries {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            if !is_safe_file_name(&entry.name) {
                warn!(name = %entry.name, "Skipping feed entry with unusable file name");
                report.rejected += 1;
                continue;
            }
            let Some(url) = entry.download_url.as_deref() else {
                continue;
            };

            let body = match self.fetch(url, self.file_timeout).await {
                Ok(body) => body,
                Err(e) => {
                    warn!(name = %entry.name, error = %e, "Feed file download failed");
                    report.failed += 1;
                    continue;
                }
            };

            let target = out_dir.join(&entry.name);
            match tokio::fs::write(&target, &body).await {
                Ok(()) => {
                    debug!(path = %target.display(), bytes = body.len(), "Saved feed file");
                    report.saved += 1;
                }
                Err(e) => {
                    warn!(path = %target.display(), error = %e, "Writing feed file failed");
                    report.failed += 1;
                }
            }
        }

        info!(
            saved = report.saved,
            rejected = report.rejected,
            failed = report.failed,
            cancelled = report.cancelled,
            "Feed download finished"
        );
        Ok(report)
    }

    async fn fetch(&self, url: &str, timeout: Duration) -> std::result::Result<Vec<u8>, FetchError> {
        let response = self.transport.get(url, timeout).await?;
        if !(200..300).contains(&response.status) {
            return Err(FetchError::Status {
                status: response.status,
                body: String::from_utf8_lossy(&response.body).into_owned(),
            });
        }
        Ok(response.body)
    }
}

fn contents_url(config: &FeedConfig) -> String {
    format!(
        "{}/repos/{}/{}/contents/{}",
        config.api_base.trim_end_matches('/'),
        config.owner,
        config.repo,
        config.path.trim_matches('/')
    )
}

/// A bare name that stays inside the output folder
fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('.') && !name.contains(['/', '\\'])
}
