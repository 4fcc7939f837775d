//! Error types for the fetch module.
//!
//! Every failed fetch attempt produces one [`FetchError`]; the retry layer
//! classifies it as transient or permanent via
//! [`classify_error`](super::classify_error).

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while fetching one page image.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS resolution, connection refused/reset, body read).
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Non-success HTTP response.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// File system error while writing the page.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The URL is malformed.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },
}

impl FetchError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Returns the reportable kind of this error.
    #[must_use]
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            Self::Network { .. } => FetchErrorKind::Network,
            Self::Timeout { .. } => FetchErrorKind::Timeout,
            Self::HttpStatus { status, .. } => FetchErrorKind::HttpStatus(*status),
            Self::Io { .. } => FetchErrorKind::Io,
            Self::InvalidUrl { .. } => FetchErrorKind::InvalidUrl,
        }
    }
}

/// Plain-data summary of a fetch failure, carried by download results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// Connection-level failure.
    Network,
    /// Request timed out.
    Timeout,
    /// Server answered with the given non-success status.
    HttpStatus(u16),
    /// Local write failure.
    Io,
    /// Malformed URL.
    InvalidUrl,
    /// The worker owning the task stopped before reporting it.
    Aborted,
}

impl FetchErrorKind {
    /// Returns the HTTP status if this kind carries one.
    #[must_use]
    pub fn http_status(self) -> Option<u16> {
        match self {
            Self::HttpStatus(status) => Some(status),
            _ => None,
        }
    }
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => f.write_str("network"),
            Self::Timeout => f.write_str("timeout"),
            Self::HttpStatus(status) => write!(f, "http-{status}"),
            Self::Io => f.write_str("io"),
            Self::InvalidUrl => f.write_str("invalid-url"),
            Self::Aborted => f.write_str("aborted"),
        }
    }
}
