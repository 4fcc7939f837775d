//! Live progress display for download runs.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use omegadl_core::report::human_bytes;
use omegadl_core::{FetchProgress, ProgressSnapshot};

/// Spawns the progress UI when requested.
/// Returns (handle, stop) so the caller can signal stop and await the handle.
/// When `use_bar` is false, returns (None, stop) with stop already true.
pub(crate) fn spawn_progress_ui(
    use_bar: bool,
    progress: Arc<FetchProgress>,
) -> (Option<tokio::task::JoinHandle<()>>, Arc<AtomicBool>) {
    if !use_bar {
        return (None, Arc::new(AtomicBool::new(true)));
    }
    let stop = Arc::new(AtomicBool::new(false));
    let handle = spawn_bar_inner(progress, Arc::clone(&stop));
    (Some(handle), stop)
}

fn spawn_bar_inner(
    progress: Arc<FetchProgress>,
    stop: Arc<AtomicBool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(Duration::from_millis(100));

        while !stop.load(Ordering::SeqCst) {
            bar.set_message(render_progress_message(&progress.snapshot()));
            tokio::time::sleep(Duration::from_millis(120)).await;
        }

        bar.finish_and_clear();
    })
}

/// One-line progress summary: pages done out of queued, bytes, in-flight count.
pub(crate) fn render_progress_message(snapshot: &ProgressSnapshot) -> String {
    let mut message = format!(
        "[{}/{} pages] {} downloaded",
        snapshot.tasks_done(),
        snapshot.tasks_queued,
        human_bytes(snapshot.bytes_downloaded)
    );
    if snapshot.in_flight > 0 {
        message.push_str(&format!(", {} in flight", snapshot.in_flight));
    }
    if snapshot.tasks_failed > 0 {
        message.push_str(&format!(", {} failed", snapshot.tasks_failed));
    }
    message
}
