//! Site resolvers: turning series and chapter URLs into chapter lists and
//! ordered page image URLs.
//!
//! # Architecture
//!
//! - [`Resolver`] - Async trait that individual site resolvers implement
//! - [`ResolverRegistry`] - Ordered collection selecting a resolver by URL
//! - [`OmegaScansResolver`] - Site-specific resolver for `omegascans.org`
//!
//! # Example
//!
//! ```no_run
//! use omegadl_core::resolver::build_default_resolver_registry;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = build_default_resolver_registry(30, 40)?;
//! let resolver = registry.find("https://omegascans.org/series/solo")?;
//! let chapters = resolver.list_chapters("https://omegascans.org/series/solo").await?;
//! println!("{} chapters", chapters.len());
//! # Ok(())
//! # }
//! ```

mod error;
mod http_client;
mod omegascans;
mod registry;
pub(crate) mod utils;

pub use error::ResolveError;
pub use omegascans::OmegaScansResolver;
pub use registry::ResolverRegistry;

use async_trait::async_trait;

use crate::model::ChapterRef;

/// Builds the registry used by the CLI with every bundled resolver.
///
/// # Errors
///
/// Returns [`ResolveError`] if a resolver's HTTP client cannot be built.
pub fn build_default_resolver_registry(
    connect_timeout_secs: u64,
    read_timeout_secs: u64,
) -> Result<ResolverRegistry, ResolveError> {
    let mut registry = ResolverRegistry::new();
    registry.register(std::sync::Arc::new(OmegaScansResolver::with_timeouts(
        connect_timeout_secs,
        read_timeout_secs,
    )?));
    Ok(registry)
}

/// A site-specific source of chapter lists and page image URLs.
///
/// Implementations scrape one site. They are shared across chapters and
/// must be thread-safe.
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use omegadl_core::{ChapterRef, ResolveError, Resolver};
///
/// struct StaticResolver;
///
/// #[async_trait]
/// impl Resolver for StaticResolver {
///     fn name(&self) -> &'static str {
///         "static"
///     }
///
///     fn can_handle(&self, url: &str) -> bool {
///         url.starts_with("https://static.example.com/")
///     }
///
///     async fn list_chapters(&self, series_url: &str) -> Result<Vec<ChapterRef>, ResolveError> {
///         Ok(vec![ChapterRef::new("1", format!("{series_url}/chapter-1"))])
///     }
///
///     async fn resolve(&self, _chapter: &ChapterRef) -> Result<Vec<String>, ResolveError> {
///         Ok(vec!["https://static.example.com/001.jpg".to_string()])
///     }
/// }
/// ```
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Returns true if this resolver understands `url`.
    fn can_handle(&self, url: &str) -> bool;

    /// Lists a series' chapters in reading order.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] if the series page is unreachable or unparsable.
    async fn list_chapters(&self, series_url: &str) -> Result<Vec<ChapterRef>, ResolveError>;

    /// Returns the chapter's page image URLs in page order.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] if the chapter page is unreachable or unparsable.
    async fn resolve(&self, chapter: &ChapterRef) -> Result<Vec<String>, ResolveError>;
}
