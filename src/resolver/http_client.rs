//! Shared HTTP client construction and page fetching for resolvers.
//!
//! Resolver page requests use the same User-Agent as image fetches so the
//! reader site sees one consistent client.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::ACCEPT;
use tracing::{debug, warn};

use crate::fetch::{RetryDecision, RetryPolicy};
use crate::user_agent;

use super::ResolveError;

const HTML_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Builds a resolver HTTP client with the given timeouts in seconds.
///
/// `resolver_name` is used only for error messages.
///
/// # Errors
///
/// Returns [`ResolveError::ClientBuild`] when client construction fails.
pub fn build_resolver_http_client(
    resolver_name: &str,
    connect_timeout_secs: u64,
    read_timeout_secs: u64,
) -> Result<Client, ResolveError> {
    Client::builder()
        .connect_timeout(Duration::from_secs(connect_timeout_secs))
        .timeout(Duration::from_secs(read_timeout_secs))
        .gzip(true)
        .user_agent(user_agent::default_user_agent())
        .build()
        .map_err(|e| ResolveError::client_build(resolver_name, e.to_string()))
}

/// GETs `url` and returns the body as text, retrying transient failures
/// (network errors, 408, 429 and 5xx) under `retry`.
///
/// # Errors
///
/// Returns the last [`ResolveError::Network`] or [`ResolveError::Http`]
/// once the failure is permanent or attempts are exhausted.
pub async fn fetch_page_text(
    client: &Client,
    url: &str,
    retry: &RetryPolicy,
) -> Result<String, ResolveError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        let error = match fetch_page_once(client, url).await {
            Ok(body) => return Ok(body),
            Err(e) => e,
        };

        match retry.should_retry(error.failure_type(), attempt) {
            RetryDecision::Retry { delay, attempt: next } => {
                warn!(
                    url,
                    attempt,
                    next_attempt = next,
                    delay_ms = delay.as_millis(),
                    error = %error,
                    "page fetch failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            RetryDecision::DoNotRetry { .. } => return Err(error),
        }
    }
}

async fn fetch_page_once(client: &Client, url: &str) -> Result<String, ResolveError> {
    let response = client
        .get(url)
        .header(ACCEPT, HTML_ACCEPT)
        .send()
        .await
        .map_err(|e| ResolveError::network(url, e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ResolveError::http(url, status.as_u16()));
    }

    let body = response
        .text()
        .await
        .map_err(|e| ResolveError::network(url, e.to_string()))?;
    debug!(url, bytes = body.len(), "fetched page");
    Ok(body)
}
