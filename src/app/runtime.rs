use std::io::{self, IsTerminal};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use clap::Parser;
use omegadl_core::{
    ConsoleReporter, HttpFetcher, PdfEncoder, RunReport, SeriesOrchestrator,
    build_default_resolver_registry,
};
use tracing::{debug, info, warn};

use crate::ProcessExit;
use crate::app::{config_manager, exit_handler, progress_manager, terminal};
use crate::cli::Args;

pub(crate) async fn run_omegadl() -> Result<ProcessExit> {
    let args = Args::parse();

    let default_level = terminal::resolve_default_log_level(args.verbose, args.quiet);
    let no_color = terminal::should_disable_color(
        terminal::no_color_env_requested(),
        terminal::is_dumb_terminal(),
    );
    terminal::init_tracing(default_level, no_color);
    debug!(?args, "CLI arguments parsed");

    let config = config_manager::resolve_config(&args)?;
    info!(
        workers = config.policy.worker_count(),
        max_retries = config.policy.max_retries(),
        overwrite = config.policy.overwrite_existing(),
        output = %config.output_dir.display(),
        "omegadl starting"
    );

    let registry = build_default_resolver_registry(
        config.connect_timeout_secs,
        config.read_timeout_secs,
    )
    .context("Failed to initialize site resolvers")?;
    let fetcher = HttpFetcher::with_timeouts(config.connect_timeout_secs, config.read_timeout_secs)
        .context("Failed to initialize HTTP client")?;

    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_signal = Arc::clone(&interrupted);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupted_signal.store(true, Ordering::SeqCst);
        }
    });

    let orchestrator = SeriesOrchestrator::new(
        config.policy,
        Arc::new(registry),
        Arc::new(fetcher),
        Arc::new(PdfEncoder::new()),
        config.output_dir.clone(),
    )
    .with_stop_flag(Arc::clone(&interrupted))
    .with_reporter(Arc::new(ConsoleReporter::new(config.verbose_report)));

    let series = match args.series_url.as_deref() {
        Some(series_url) => Some(
            orchestrator
                .discover_series(series_url, args.series_name.as_deref())
                .await
                .with_context(|| format!("Failed to discover chapters of '{series_url}'"))?,
        ),
        None => None,
    };

    let use_bar = terminal::should_use_progress_bar(
        io::stderr().is_terminal(),
        args.quiet,
        terminal::is_dumb_terminal(),
    );
    let (progress_handle, progress_stop) =
        progress_manager::spawn_progress_ui(use_bar, Arc::clone(orchestrator.progress()));

    let report = match (&series, args.chapter_url.as_deref()) {
        (Some(series), _) => orchestrator.run_series(series).await,
        (None, Some(chapter_url)) => {
            orchestrator
                .run_single(
                    chapter_url,
                    args.chapter_num.as_deref(),
                    args.series_name.as_deref(),
                )
                .await
        }
        (None, None) => RunReport {
            series_name: String::new(),
            chapters: Vec::new(),
            cancelled: false,
        },
    };

    progress_stop.store(true, Ordering::SeqCst);
    if let Some(handle) = progress_handle {
        let _ = handle.await;
    }

    if report.cancelled || interrupted.load(Ordering::SeqCst) {
        warn!(
            completed = report.completed(),
            "Interrupted. Run again to resume; finished chapters are skipped."
        );
    }

    Ok(exit_handler::exit_outcome_for_run(&report))
}
