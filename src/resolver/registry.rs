//! Resolver registry: first-match selection by URL.

use std::sync::Arc;

use tracing::debug;

use super::{ResolveError, Resolver};

/// An ordered collection of resolvers.
///
/// Resolvers are tried in registration order; the first whose
/// [`Resolver::can_handle`] accepts a URL is selected.
#[derive(Default)]
pub struct ResolverRegistry {
    resolvers: Vec<Arc<dyn Resolver>>,
}

impl ResolverRegistry {
    /// Creates an empty resolver registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            resolvers: Vec::new(),
        }
    }

    /// Registers a resolver with the registry.
    #[tracing::instrument(skip(self, resolver), fields(resolver_name))]
    pub fn register(&mut self, resolver: Arc<dyn Resolver>) {
        tracing::Span::current().record("resolver_name", resolver.name());
        debug!(name = resolver.name(), "Registering resolver");
        self.resolvers.push(resolver);
    }

    /// Returns the number of registered resolvers.
    #[must_use]
    pub fn resolver_count(&self) -> usize {
        self.resolvers.len()
    }

    /// Returns true if no resolvers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    /// Selects the resolver for `url`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::NoResolver`] when no registered resolver accepts the URL.
    pub fn find(&self, url: &str) -> Result<Arc<dyn Resolver>, ResolveError> {
        self.resolvers
            .iter()
            .find(|r| r.can_handle(url))
            .map(Arc::clone)
            .ok_or_else(|| ResolveError::no_resolver(url))
    }
}

impl std::fmt::Debug for ResolverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverRegistry")
            .field(
                "resolvers",
                &self.resolvers.iter().map(|r| r.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
