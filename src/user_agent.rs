//! Shared User-Agent string for fetch and resolver HTTP clients.
//!
//! Reader sites commonly reject non-browser agents on both the HTML pages and
//! the image CDN, so every request carries the same browser-like header.

/// Browser User-Agent sent with every request.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Default User-Agent for image fetches and resolver page requests.
#[must_use]
pub(crate) fn default_user_agent() -> &'static str {
    BROWSER_USER_AGENT
}
