//! Run policy shared read-only by every component of a run.

use thiserror::Error;
use tracing::debug;

/// Default number of concurrent fetch workers per chapter.
pub const DEFAULT_WORKER_COUNT: usize = 6;

/// Default number of additional attempts after a transient failure.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Minimum allowed worker count.
const MIN_WORKER_COUNT: usize = 1;

/// Maximum allowed worker count.
pub const MAX_WORKER_COUNT: usize = 100;

/// Invalid configuration detected before any chapter is processed.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Worker count outside the supported range.
    #[error(
        "invalid worker count {value}: must be between {MIN_WORKER_COUNT} and {MAX_WORKER_COUNT}"
    )]
    InvalidWorkerCount {
        /// The rejected value.
        value: usize,
    },

    /// Any other configuration value outside its accepted range.
    #[error("invalid value for `{field}`: {value}. Expected {expected}")]
    InvalidValue {
        /// Configuration key.
        field: &'static str,
        /// The rejected value, rendered for display.
        value: String,
        /// Human-readable accepted range.
        expected: &'static str,
    },
}

/// Worker cap, retry budget and overwrite behavior for one run.
///
/// Constructed once from configuration and passed by reference to the
/// orchestrator, chapter jobs and fetch pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunPolicy {
    worker_count: usize,
    max_retries: u32,
    overwrite_existing: bool,
}

impl Default for RunPolicy {
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_WORKER_COUNT,
            max_retries: DEFAULT_MAX_RETRIES,
            overwrite_existing: false,
        }
    }
}

impl RunPolicy {
    /// Creates a validated policy.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidWorkerCount`] when `worker_count` is
    /// outside `1..=100`.
    pub fn new(
        worker_count: usize,
        max_retries: u32,
        overwrite_existing: bool,
    ) -> Result<Self, ConfigError> {
        if !(MIN_WORKER_COUNT..=MAX_WORKER_COUNT).contains(&worker_count) {
            return Err(ConfigError::InvalidWorkerCount {
                value: worker_count,
            });
        }

        debug!(
            worker_count,
            max_retries, overwrite_existing, "run policy configured"
        );

        Ok(Self {
            worker_count,
            max_retries,
            overwrite_existing,
        })
    }

    /// Maximum number of in-flight downloads per chapter.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Additional attempts allowed after a transient failure.
    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Total attempts a single task may consume (`max_retries + 1`).
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Whether existing chapter documents and page images are replaced.
    #[must_use]
    pub fn overwrite_existing(&self) -> bool {
        self.overwrite_existing
    }
}
