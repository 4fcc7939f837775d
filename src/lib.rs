//! omegadl Core Library
//!
//! This library downloads the page images of serialized chapters from remote
//! sources and assembles each chapter into a single paginated document.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`policy`] - Run policy (worker count, retries, overwrite) and its validation
//! - [`model`] - Series, chapter references, image tasks and download results
//! - [`layout`] - On-disk series layout (`Images/`, `Chapters/`) and naming rules
//! - [`fetch`] - Concurrent, retrying image fetch pool over HTTP
//! - [`chapter`] - Chapter jobs: task construction, outcome, encoding
//! - [`series`] - Series orchestration across chapters
//! - [`resolver`] - Pluggable per-site resolvers producing chapter image URLs
//! - [`encoder`] - Pluggable page encoders (PDF by default)
//! - [`report`] - Result reporting for CLI output

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod chapter;
pub mod encoder;
pub mod fetch;
pub mod layout;
pub mod model;
pub mod policy;
pub mod report;
pub mod resolver;
pub mod series;
mod user_agent;

// Re-export commonly used types
pub use chapter::{ChapterContext, ChapterJob, ChapterOutcome, ChapterReport};
pub use encoder::{EncodeError, PageEncoder, PdfEncoder};
pub use fetch::{
    FailureType, FetchError, FetchErrorKind, FetchPool, FetchProgress, HttpFetcher, ImageFetcher,
    ProgressSnapshot, RetryDecision, RetryPolicy, classify_error,
};
pub use layout::SeriesLayout;
pub use model::{ChapterRef, DownloadResult, ImageTask, Series, TaskFailure, TaskStatus};
pub use policy::{ConfigError, DEFAULT_MAX_RETRIES, DEFAULT_WORKER_COUNT, RunPolicy};
pub use report::{ConsoleReporter, Reporter};
pub use resolver::{
    OmegaScansResolver, ResolveError, Resolver, ResolverRegistry, build_default_resolver_registry,
};
pub use series::{RunReport, SeriesOrchestrator};
