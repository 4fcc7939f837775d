//! Image fetchers: the network seam of the fetch pool.
//!
//! [`ImageFetcher`] performs exactly one network attempt per call; retrying,
//! file writes and bookkeeping belong to the pool. [`HttpFetcher`] is the
//! production implementation over a shared `reqwest` client.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::error::FetchError;
use super::progress::FetchProgress;
use crate::user_agent;

/// One network attempt at retrieving the bytes behind an image URL.
///
/// Implementations must issue a fresh request on every call; the pool relies
/// on this when retrying transient failures.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Fetches the full body of `url`, reporting received bytes to `progress`.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] describing why this attempt failed.
    async fn fetch(&self, url: &str, progress: &FetchProgress) -> Result<Vec<u8>, FetchError>;
}

/// HTTP fetcher with connection pooling and fixed timeouts.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates a fetcher with default timeouts (30s connect, 40s per request).
    ///
    /// # Errors
    ///
    /// Returns the underlying builder error if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a fetcher with explicit timeout values in seconds.
    ///
    /// # Errors
    ///
    /// Returns the underlying builder error if the TLS backend cannot be initialized.
    #[instrument(level = "debug")]
    pub fn with_timeouts(
        connect_timeout_secs: u64,
        read_timeout_secs: u64,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .timeout(Duration::from_secs(read_timeout_secs))
            .gzip(true)
            .user_agent(user_agent::default_user_agent())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ImageFetcher for HttpFetcher {
    #[instrument(level = "debug", skip(self, progress), fields(url = %url))]
    async fn fetch(&self, url: &str, progress: &FetchProgress) -> Result<Vec<u8>, FetchError> {
        let parsed = Url::parse(url).map_err(|_| FetchError::invalid_url(url))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::invalid_url(url));
        }

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| map_reqwest_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::http_status(url, status.as_u16()));
        }

        let capacity = response
            .content_length()
            .and_then(|len| usize::try_from(len).ok())
            .unwrap_or(0);
        let mut body = Vec::with_capacity(capacity);
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| map_reqwest_error(url, e))?;
            progress.add_bytes(chunk.len() as u64);
            body.extend_from_slice(&chunk);
        }

        debug!(bytes = body.len(), "fetched image");
        Ok(body)
    }
}

fn map_reqwest_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::timeout(url)
    } else {
        FetchError::network(url, error)
    }
}
