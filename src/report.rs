//! Result reporting: the [`Reporter`] seam and the console implementation.
//!
//! Milestones go through `tracing`; the verbose per-page table and the final
//! failure list are printed to stdout as plain lines built by pure render
//! functions.

use tracing::{info, warn};

use crate::chapter::{ChapterOutcome, ChapterReport};
use crate::model::{ChapterRef, DownloadResult};
use crate::series::RunReport;

/// Consumer of chapter and run outcomes.
pub trait Reporter: Send + Sync {
    /// Called before a chapter job starts. `position` is 1-based.
    fn chapter_started(&self, _chapter: &ChapterRef, _position: usize, _total: usize) {}

    /// Called once per chapter with its final report.
    fn chapter_finished(&self, report: &ChapterReport);

    /// Called once after the last chapter.
    fn run_finished(&self, report: &RunReport);
}

/// Reporter writing to the log and stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleReporter {
    verbose: bool,
}

impl ConsoleReporter {
    /// Creates a reporter; `verbose` adds the per-page results table.
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl Reporter for ConsoleReporter {
    fn chapter_started(&self, chapter: &ChapterRef, position: usize, total: usize) {
        info!(
            chapter = %chapter.number,
            url = %chapter.source_url,
            "Processing chapter {position}/{total}"
        );
    }

    fn chapter_finished(&self, report: &ChapterReport) {
        if self.verbose && !report.results.is_empty() {
            for line in render_results_table(&report.results) {
                println!("{line}");
            }
        }

        match report.outcome {
            ChapterOutcome::Completed if report.skipped => info!(
                chapter = %report.number,
                document = %display_document(report),
                "Chapter exists (skipping)"
            ),
            ChapterOutcome::Completed => info!(
                chapter = %report.number,
                pages = report.results.len(),
                reused = report.reused_count(),
                size = %human_bytes(report.bytes()),
                document = %display_document(report),
                "Chapter complete"
            ),
            outcome => warn!(
                chapter = %report.number,
                outcome = %outcome,
                succeeded = report.succeeded_count(),
                failed = report.failed_count(),
                missing = %format_indices(&report.missing_indices),
                error = report.error.as_deref().unwrap_or("-"),
                "Chapter incomplete"
            ),
        }
    }

    fn run_finished(&self, report: &RunReport) {
        info!(
            series = %report.series_name,
            completed = report.completed(),
            partially_failed = report.partially_failed(),
            failed = report.failed(),
            skipped = report.skipped(),
            size = %human_bytes(report.total_bytes()),
            "Run summary"
        );
        if report.cancelled {
            warn!("Run interrupted; remaining chapters were not started");
        }
        let width = terminal_width();
        for line in render_failure_lines(report) {
            println!("{}", truncate_to_width(&line, width));
        }
    }
}

fn display_document(report: &ChapterReport) -> String {
    report
        .document
        .as_ref()
        .map_or_else(|| "-".to_string(), |p| p.display().to_string())
}

/// Formats a byte count with binary units: `512 B`, `1.5 KB`, `3.2 MB`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} {}", UNITS[0])
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

/// Renders the per-page table, ordered by index.
///
/// The source URL is the last column and is never truncated.
#[must_use]
pub fn render_results_table(results: &[DownloadResult]) -> Vec<String> {
    let mut sorted: Vec<&DownloadResult> = results.iter().collect();
    sorted.sort_by_key(|r| r.task_index);

    let mut lines = Vec::with_capacity(sorted.len() + 1);
    lines.push(format!(
        "{:>4}  {:<12} {:>9}  {:>8}  {:<24}  {}",
        "#", "File", "Size", "Attempts", "Status", "URL"
    ));
    for result in sorted {
        let file = result
            .dest_path
            .file_name()
            .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
        let size = if result.bytes > 0 {
            human_bytes(result.bytes)
        } else {
            "-".to_string()
        };
        let status = match (&result.error, result.reused) {
            (Some(failure), _) => format!("FAIL ({}) {}", failure.kind, failure.message),
            (None, true) => "OK (existing)".to_string(),
            (None, false) => "OK".to_string(),
        };
        lines.push(format!(
            "{:>4}  {:<12} {:>9}  {:>8}  {:<24}  {}",
            format!("{:03}", result.task_index + 1),
            file,
            size,
            result.attempts_used,
            status,
            result.url
        ));
    }
    lines
}

/// One line per chapter that did not complete.
#[must_use]
pub fn render_failure_lines(report: &RunReport) -> Vec<String> {
    report
        .chapters
        .iter()
        .filter(|c| c.outcome != ChapterOutcome::Completed)
        .map(|c| {
            let mut line = format!("Chapter {}: {}", c.number, c.outcome);
            if !c.missing_indices.is_empty() {
                line.push_str(&format!(
                    " (missing pages {})",
                    format_indices(&c.missing_indices)
                ));
            }
            if let Some(error) = &c.error {
                line.push_str(" - ");
                line.push_str(error.lines().next().unwrap_or_default());
            }
            line
        })
        .collect()
}

/// Formats zero-based indices as 1-based page numbers.
fn format_indices(indices: &[usize]) -> String {
    if indices.is_empty() {
        return "-".to_string();
    }
    indices
        .iter()
        .map(|i| (i + 1).to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Returns terminal width from COLUMNS, or 100 if unset/invalid.
fn terminal_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|width| *width >= 20)
        .unwrap_or(100)
}

/// Truncates text to at most `width` chars, appending ellipsis if truncated.
fn truncate_to_width(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut output: String = text.chars().take(width - 1).collect();
    output.push('…');
    output
}
