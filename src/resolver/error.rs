//! Error types for resolver operations.
//!
//! Messages follow a What/Why/Fix shape so they can be shown to users as-is.

use thiserror::Error;

use crate::fetch::{FailureType, classify_http_status};

/// Errors that can occur while listing chapters or resolving a chapter's images.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    /// No registered resolver can handle the URL
    #[error("no resolver found for '{url}'\n  Suggestion: {suggestion}")]
    NoResolver {
        /// The URL no resolver claimed
        url: String,
        /// How to fix the issue
        suggestion: String,
    },

    /// The source page answered with a non-success status
    #[error("'{url}' returned HTTP {status}\n  Suggestion: Check that the page exists and is publicly readable")]
    Http {
        /// The page URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// The source page could not be fetched at all
    #[error("could not fetch '{url}': {message}\n  Suggestion: Check your network connection and retry")]
    Network {
        /// The page URL
        url: String,
        /// Underlying transport error, rendered
        message: String,
    },

    /// The page was fetched but did not contain the expected markup
    #[error("could not parse '{url}': {reason}\n  Suggestion: The site layout may have changed")]
    Unparsable {
        /// The page URL
        url: String,
        /// What was missing
        reason: String,
    },

    /// The chapter page listed no usable images
    #[error("no page images found at '{url}'\n  Suggestion: Open the chapter in a browser to confirm it has pages")]
    NoImages {
        /// The chapter URL
        url: String,
    },

    /// Two chapters of one series share a designation
    #[error("series '{series}' lists chapter {number} more than once")]
    DuplicateChapter {
        /// Series name
        series: String,
        /// Repeated chapter designation
        number: String,
    },

    /// The resolver's HTTP client could not be built
    #[error("resolver '{resolver}' could not initialize networking: {message}")]
    ClientBuild {
        /// Resolver name
        resolver: String,
        /// Underlying builder error, rendered
        message: String,
    },
}

impl ResolveError {
    /// Creates a `NoResolver` error.
    #[must_use]
    pub fn no_resolver(url: &str) -> Self {
        Self::NoResolver {
            url: url.to_string(),
            suggestion: "Use a URL from a supported site (omegascans.org)".to_string(),
        }
    }

    /// Creates an `Http` error.
    #[must_use]
    pub fn http(url: &str, status: u16) -> Self {
        Self::Http {
            url: url.to_string(),
            status,
        }
    }

    /// Creates a `Network` error.
    #[must_use]
    pub fn network(url: &str, message: impl Into<String>) -> Self {
        Self::Network {
            url: url.to_string(),
            message: message.into(),
        }
    }

    /// Creates an `Unparsable` error.
    #[must_use]
    pub fn unparsable(url: &str, reason: impl Into<String>) -> Self {
        Self::Unparsable {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates a `NoImages` error.
    #[must_use]
    pub fn no_images(url: &str) -> Self {
        Self::NoImages {
            url: url.to_string(),
        }
    }

    /// Creates a `DuplicateChapter` error.
    #[must_use]
    pub fn duplicate_chapter(series: &str, number: &str) -> Self {
        Self::DuplicateChapter {
            series: series.to_string(),
            number: number.to_string(),
        }
    }

    /// Whether another request could succeed: network failures and
    /// 408/429/5xx answers are transient, everything else is permanent.
    #[must_use]
    pub fn failure_type(&self) -> FailureType {
        match self {
            Self::Network { .. } => FailureType::Transient,
            Self::Http { status, .. } => classify_http_status(*status),
            _ => FailureType::Permanent,
        }
    }

    /// Creates a `ClientBuild` error.
    #[must_use]
    pub fn client_build(resolver: &str, message: impl Into<String>) -> Self {
        Self::ClientBuild {
            resolver: resolver.to_string(),
            message: message.into(),
        }
    }
}
