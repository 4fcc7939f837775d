//! Concurrent image fetching with bounded retries.
//!
//! This module provides:
//! - [`ImageFetcher`] - the single-attempt network seam, with [`HttpFetcher`] over `reqwest`
//! - [`FetchPool`] - a fixed set of workers draining a task queue
//! - [`RetryPolicy`] and [`classify_error`] - transient/permanent failure handling
//! - [`FetchProgress`] - shared counters for progress display
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use omegadl_core::{FetchPool, HttpFetcher, ImageTask, RunPolicy};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let policy = RunPolicy::default();
//! let pool = FetchPool::new(&policy, Arc::new(HttpFetcher::new()?));
//! let tasks = vec![ImageTask::new(0, "https://cdn.example.com/01.jpg", "/tmp/001.jpg")];
//! let results = pool.run(tasks, policy.overwrite_existing()).await;
//! println!("{} succeeded", results.iter().filter(|r| r.is_success()).count());
//! # Ok(())
//! # }
//! ```

mod client;
mod constants;
mod error;
mod pool;
mod progress;
mod retry;

pub use client::{HttpFetcher, ImageFetcher};
pub use constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
pub use error::{FetchError, FetchErrorKind};
pub use pool::FetchPool;
pub use progress::{FetchProgress, ProgressSnapshot};
pub(crate) use retry::classify_http_status;
pub use retry::{FailureType, RetryDecision, RetryPolicy, classify_error};
