//! Source fetcher: one timed HTTP GET per document, written into a cache slot.
//!
//! Failures never escape as errors. Every call yields a [`FetchOutcome`]
//! that records either the written slot or one of the three
//! [`FetchError`] kinds.

use std::error::Error as _;
use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use reqwest::header::USER_AGENT;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use rfdocs_shared::{FetchError, IndexerConfig, Result, RfDocsError};

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 5;

// ---------------------------------------------------------------------------
// FetchOutcome
// ---------------------------------------------------------------------------

/// Result record of a single fetch.
#[derive(Debug, Clone, Serialize)]
pub struct FetchOutcome {
    /// Whether the slot now holds the fetched document.
    pub success: bool,
    /// The URL that was requested.
    pub url: String,
    /// Slot path written on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Body size in bytes on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    /// SHA-256 of the body on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    /// Human-readable failure message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Typed failure, for callers that branch on the kind.
    #[serde(skip)]
    pub failure: Option<FetchError>,
}

impl FetchOutcome {
    fn fetched(url: &str, path: &Path, size_bytes: u64, sha256: String) -> Self {
        Self {
            success: true,
            url: url.to_string(),
            path: Some(path.display().to_string()),
            size_bytes: Some(size_bytes),
            sha256: Some(sha256),
            error: None,
            failure: None,
        }
    }

    fn failed(url: &str, failure: FetchError) -> Self {
        Self {
            success: false,
            url: url.to_string(),
            path: None,
            size_bytes: None,
            sha256: None,
            error: Some(failure.to_string()),
            failure: Some(failure),
        }
    }
}

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

/// Sequential document fetcher backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    user_agent: String,
}

impl Fetcher {
    /// Create a fetcher with a default `User-Agent` and per-request timeout.
    pub fn new(user_agent: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(timeout)
            .build()
            .map_err(|e| RfDocsError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            user_agent: user_agent.into(),
        })
    }

    /// Create a fetcher from the resolved indexer configuration.
    pub fn from_config(config: &IndexerConfig) -> Result<Self> {
        Self::new(
            config.user_agent.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Fetch `url` into `slot` with the default `User-Agent`.
    pub async fn fetch_to_slot(&self, url: &str, slot: &Path) -> FetchOutcome {
        self.fetch_to_slot_as(url, slot, None).await
    }

    /// Fetch `url` into `slot`, optionally overriding the `User-Agent`.
    ///
    /// The slot's parent directory is created if absent. A previous slot
    /// is replaced only once the whole body has been received.
    #[instrument(skip_all, fields(url = %url, slot = %slot.display()))]
    pub async fn fetch_to_slot_as(
        &self,
        url: &str,
        slot: &Path,
        user_agent: Option<&str>,
    ) -> FetchOutcome {
        let agent = user_agent.unwrap_or(&self.user_agent);

        match self.download(url, slot, agent).await {
            Ok((size_bytes, sha256)) => {
                info!(size_bytes, "document fetched");
                FetchOutcome::fetched(url, slot, size_bytes, sha256)
            }
            Err(failure) => {
                warn!(error = %failure, "fetch failed");
                FetchOutcome::failed(url, failure)
            }
        }
    }

    async fn download(
        &self,
        url: &str,
        slot: &Path,
        agent: &str,
    ) -> std::result::Result<(u64, String), FetchError> {
        if let Some(parent) = slot.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FetchError::Other(format!("{}: {e}", parent.display())))?;
        }

        debug!(user_agent = agent, "sending request");

        let response = self
            .client
            .get(url)
            .header(USER_AGENT, agent)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let body = response.bytes().await.map_err(classify)?;
        write_slot(slot, &body).await?;

        Ok((body.len() as u64, compute_hash(&body)))
    }
}

/// Sort a `reqwest` failure into transport-level or other.
fn classify(err: reqwest::Error) -> FetchError {
    let message = error_chain(&err);
    if err.is_timeout() || err.is_connect() || err.is_request() || err.is_redirect() {
        FetchError::Transport(message)
    } else {
        FetchError::Other(message)
    }
}

/// Render an error together with its sources (`outer: inner: root`).
fn error_chain(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}

/// Write the slot via a sibling temp file and rename.
async fn write_slot(slot: &Path, body: &[u8]) -> std::result::Result<(), FetchError> {
    let file_name = slot
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "slot".to_string());
    let temp = slot.with_file_name(format!(".{file_name}.tmp"));

    tokio::fs::write(&temp, body)
        .await
        .map_err(|e| FetchError::Other(format!("{}: {e}", temp.display())))?;
    tokio::fs::rename(&temp, slot)
        .await
        .map_err(|e| FetchError::Other(format!("{}: {e}", slot.display())))?;

    Ok(())
}

/// Compute SHA-256 hash of content.
fn compute_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}
