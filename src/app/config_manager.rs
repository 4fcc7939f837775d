//! Configuration lifecycle: load the file config and merge CLI overrides.
//!
//! Precedence per value: command line, then config file, then built-in default.

use std::path::PathBuf;

use anyhow::Result;
use omegadl_core::fetch::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use omegadl_core::{ConfigError, DEFAULT_MAX_RETRIES, DEFAULT_WORKER_COUNT, RunPolicy};

use crate::app_config::{FileConfig, load_config};
use crate::cli::Args;

/// Resolved configuration bundle for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResolvedConfig {
    pub(crate) policy: RunPolicy,
    pub(crate) output_dir: PathBuf,
    pub(crate) verbose_report: bool,
    pub(crate) connect_timeout_secs: u64,
    pub(crate) read_timeout_secs: u64,
}

/// Loads the config file named by `--config` (or the default path) and merges `args` over it.
pub(crate) fn resolve_config(args: &Args) -> Result<ResolvedConfig> {
    let file = load_config(args.config.as_deref())?;
    Ok(merge_config(args, file.as_ref())?)
}

/// Merges CLI values over file values over defaults.
pub(crate) fn merge_config(
    args: &Args,
    file: Option<&FileConfig>,
) -> Result<ResolvedConfig, ConfigError> {
    let workers = args
        .workers
        .map(usize::from)
        .or_else(|| file.and_then(|c| c.workers))
        .unwrap_or(DEFAULT_WORKER_COUNT);
    let max_retries = args
        .max_retries
        .map(u32::from)
        .or_else(|| file.and_then(|c| c.max_retries))
        .unwrap_or(DEFAULT_MAX_RETRIES);
    let overwrite = args.force || file.and_then(|c| c.overwrite).unwrap_or(false);
    let verbose_report = args.verbose > 0 || file.and_then(|c| c.verbose).unwrap_or(false);
    let output_dir = args
        .output_dir
        .clone()
        .or_else(|| file.and_then(|c| c.output_dir.clone()))
        .unwrap_or_else(|| PathBuf::from("."));

    Ok(ResolvedConfig {
        policy: RunPolicy::new(workers, max_retries, overwrite)?,
        output_dir,
        verbose_report,
        connect_timeout_secs: file
            .and_then(|c| c.connect_timeout_secs)
            .unwrap_or(CONNECT_TIMEOUT_SECS),
        read_timeout_secs: file
            .and_then(|c| c.read_timeout_secs)
            .unwrap_or(READ_TIMEOUT_SECS),
    })
}
