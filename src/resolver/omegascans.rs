//! Resolver for `omegascans.org` series and chapter pages.
//!
//! - Series pages carry a `<span>Total chapters</span><span>N</span>` pair;
//!   chapters are then addressed as `<series>/chapter-1 ... chapter-N`.
//! - Chapter pages hold their page images inside `<div id="content">`,
//!   lazily loaded through `data-src` with `src` as a fallback.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use tracing::{debug, info};
use url::Url;

use crate::fetch::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS, RetryPolicy};
use crate::layout::is_valid_image_url;
use crate::model::ChapterRef;

use super::http_client::{build_resolver_http_client, fetch_page_text};
use super::utils::{
    compile_static_regex, element_inner_by_id, hosts_match, img_tags, parse_host_or_fallback,
    tag_attribute,
};
use super::{ResolveError, Resolver};

const RESOLVER_NAME: &str = "omegascans";
const DEFAULT_HOST: &str = "omegascans.org";
const CONTENT_ELEMENT_ID: &str = "content";
/// Retries after the first page request (three attempts in total).
const PAGE_FETCH_RETRIES: u32 = 2;

static TOTAL_CHAPTERS_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(
        r"(?is)<span[^>]*>\s*Total\s+chapters\s*</span>\s*<span[^>]*>\s*(\d+)\s*</span>",
    )
});

/// Site resolver for Omega Scans.
pub struct OmegaScansResolver {
    client: Client,
    host: String,
    retry: RetryPolicy,
}

impl OmegaScansResolver {
    /// Creates a resolver for `omegascans.org` with default timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when HTTP client construction fails.
    pub fn new() -> Result<Self, ResolveError> {
        Self::with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a resolver for `omegascans.org` with explicit timeouts in seconds.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when HTTP client construction fails.
    pub fn with_timeouts(
        connect_timeout_secs: u64,
        read_timeout_secs: u64,
    ) -> Result<Self, ResolveError> {
        Ok(Self {
            client: build_resolver_http_client(
                RESOLVER_NAME,
                connect_timeout_secs,
                read_timeout_secs,
            )?,
            host: DEFAULT_HOST.to_string(),
            retry: RetryPolicy::from_max_retries(PAGE_FETCH_RETRIES),
        })
    }

    /// Creates a resolver answering for a custom host (mock servers in tests).
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when HTTP client construction fails.
    pub fn with_host(host_or_base_url: &str) -> Result<Self, ResolveError> {
        let mut resolver = Self::new()?;
        resolver.host = parse_host_or_fallback(host_or_base_url);
        Ok(resolver)
    }

    /// Overrides how series and chapter page requests are retried.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl std::fmt::Debug for OmegaScansResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OmegaScansResolver")
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Resolver for OmegaScansResolver {
    fn name(&self) -> &'static str {
        RESOLVER_NAME
    }

    fn can_handle(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        if !matches!(parsed.scheme(), "http" | "https") {
            return false;
        }
        parsed
            .host_str()
            .is_some_and(|host| hosts_match(host, &self.host))
    }

    #[tracing::instrument(skip(self), fields(resolver = RESOLVER_NAME))]
    async fn list_chapters(&self, series_url: &str) -> Result<Vec<ChapterRef>, ResolveError> {
        let html = fetch_page_text(&self.client, series_url, &self.retry).await?;
        let total = parse_total_chapters(&html).ok_or_else(|| {
            ResolveError::unparsable(series_url, "series page has no 'Total chapters' count")
        })?;
        info!(total, "series chapter count found");
        Ok(chapter_refs(series_url, total))
    }

    #[tracing::instrument(skip(self), fields(resolver = RESOLVER_NAME, chapter = %chapter.number))]
    async fn resolve(&self, chapter: &ChapterRef) -> Result<Vec<String>, ResolveError> {
        let html = fetch_page_text(&self.client, &chapter.source_url, &self.retry).await?;
        let urls = parse_chapter_images(&html).ok_or_else(|| {
            ResolveError::unparsable(&chapter.source_url, "chapter page has no content element")
        })?;
        debug!(images = urls.len(), "chapter images found");
        Ok(urls)
    }
}

fn chapter_refs(series_url: &str, total: usize) -> Vec<ChapterRef> {
    let base = series_url.trim_end_matches('/');
    (1..=total)
        .map(|i| ChapterRef::new(i.to_string(), format!("{base}/chapter-{i}")))
        .collect()
}

fn parse_total_chapters(html: &str) -> Option<usize> {
    TOTAL_CHAPTERS_RE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Image URLs of the content element in document order, or `None` when the
/// element is missing.
fn parse_chapter_images(html: &str) -> Option<Vec<String>> {
    let content = element_inner_by_id(html, "div", CONTENT_ELEMENT_ID)?;
    let urls = img_tags(content)
        .filter_map(|tag| {
            tag_attribute(tag, "data-src")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .or_else(|| tag_attribute(tag, "src").map(|v| v.trim().to_string()))
        })
        .filter(|url| is_valid_image_url(url))
        .collect();
    Some(urls)
}
