//! Payload fetching for source adapters.
//!
//! A source location is either an `http(s)://` URL, fetched with `reqwest`,
//! or anything else, read as a local file. Every failure here is fatal for
//! the run.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info, instrument};
use url::Url;

use tagtree_shared::{Result, TagtreeError};

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 5;

/// Default timeout in seconds for a source request.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum payload size we accept (50 MB).
const MAX_RESPONSE_SIZE: u64 = 50 * 1024 * 1024;

/// User-Agent string for source requests.
const USER_AGENT: &str = concat!("tagtree/", env!("CARGO_PKG_VERSION"));

/// Configuration for the fetcher.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Timeout for HTTP requests in seconds.
    pub timeout_secs: u64,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Where a payload comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Location {
    Remote(Url),
    Local(PathBuf),
}

impl Location {
    pub(crate) fn parse(location: &str) -> Result<Self> {
        if location.starts_with("http://") || location.starts_with("https://") {
            let url = Url::parse(location)
                .map_err(|e| TagtreeError::config(format!("invalid source URL '{location}': {e}")))?;
            return Ok(Self::Remote(url));
        }
        if location.starts_with("file://") {
            let path = Url::parse(location)
                .ok()
                .and_then(|u| u.to_file_path().ok())
                .ok_or_else(|| TagtreeError::config(format!("invalid file URL '{location}'")))?;
            return Ok(Self::Local(path));
        }
        Ok(Self::Local(PathBuf::from(location)))
    }
}

/// Fetches raw source payloads.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(opts: &FetchOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(Duration::from_secs(opts.timeout_secs))
            .build()
            .map_err(|e| TagtreeError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Fetch the full payload at `location` as bytes.
    #[instrument(skip(self))]
    pub async fn fetch_bytes(&self, location: &str) -> Result<Vec<u8>> {
        let bytes = match Location::parse(location)? {
            Location::Remote(url) => self.fetch_remote(&url).await?,
            Location::Local(path) => tokio::fs::read(&path)
                .await
                .map_err(|e| TagtreeError::io(&path, e))?,
        };
        info!(size = bytes.len(), "source payload fetched");
        Ok(bytes)
    }

    /// Fetch and decode a JSON payload.
    pub async fn fetch_json(&self, location: &str) -> Result<serde_json::Value> {
        let bytes = self.fetch_bytes(location).await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| TagtreeError::decode(format!("{location}: invalid JSON: {e}")))
    }

    async fn fetch_remote(&self, url: &Url) -> Result<Vec<u8>> {
        let mut response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| TagtreeError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TagtreeError::Network(format!("{url}: HTTP {status}")));
        }

        if let Some(len) = response.content_length() {
            if len > MAX_RESPONSE_SIZE {
                return Err(TagtreeError::Network(format!(
                    "{url}: response too large ({len} bytes, max {MAX_RESPONSE_SIZE})"
                )));
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| TagtreeError::Network(format!("{url}: failed to read body: {e}")))?
        {
            body.extend_from_slice(&chunk);
            if body.len() as u64 > MAX_RESPONSE_SIZE {
                return Err(TagtreeError::Network(format!(
                    "{url}: response exceeded {MAX_RESPONSE_SIZE} bytes"
                )));
            }
        }

        debug!(%url, %status, size = body.len(), "fetched");
        Ok(body)
    }
}
