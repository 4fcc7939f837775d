//! Series orchestration: discovery, then chapters one at a time.
//!
//! Chapters are never run in parallel; concurrency lives inside each
//! chapter's fetch pool. A chapter's failure never stops the series. The only
//! run-level failure is series discovery.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, instrument, warn};

use crate::chapter::{ChapterContext, ChapterJob, ChapterOutcome, ChapterReport};
use crate::encoder::PageEncoder;
use crate::fetch::{FetchProgress, ImageFetcher, RetryPolicy};
use crate::layout::{SeriesLayout, chapter_label_from_url, derive_series_name, sanitize_name};
use crate::model::{ChapterRef, DownloadResult, Series};
use crate::policy::RunPolicy;
use crate::report::Reporter;
use crate::resolver::{ResolveError, ResolverRegistry};

/// Aggregate outcome of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Series directory name.
    pub series_name: String,
    /// One report per chapter that was started, in processing order.
    pub chapters: Vec<ChapterReport>,
    /// The stop flag ended the run before every chapter was processed.
    pub cancelled: bool,
}

impl RunReport {
    fn count(&self, outcome: ChapterOutcome) -> usize {
        self.chapters.iter().filter(|c| c.outcome == outcome).count()
    }

    /// Chapters that ended `Completed` (including skipped ones).
    #[must_use]
    pub fn completed(&self) -> usize {
        self.count(ChapterOutcome::Completed)
    }

    /// Chapters that ended `PartiallyFailed`.
    #[must_use]
    pub fn partially_failed(&self) -> usize {
        self.count(ChapterOutcome::PartiallyFailed)
    }

    /// Chapters that ended `Failed`.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(ChapterOutcome::Failed)
    }

    /// Chapters skipped because their document already existed.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.chapters.iter().filter(|c| c.skipped).count()
    }

    /// Every page result of the run, chapter by chapter.
    pub fn download_results(&self) -> impl Iterator<Item = &DownloadResult> {
        self.chapters.iter().flat_map(|c| c.results.iter())
    }

    /// Bytes written across all chapters.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.chapters.iter().map(ChapterReport::bytes).sum()
    }
}

/// Drives chapter jobs for a series or a single chapter.
pub struct SeriesOrchestrator {
    registry: Arc<ResolverRegistry>,
    context: ChapterContext,
    output_dir: PathBuf,
    stop: Arc<AtomicBool>,
    reporter: Option<Arc<dyn Reporter>>,
}

impl std::fmt::Debug for SeriesOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeriesOrchestrator")
            .field("registry", &self.registry)
            .field("context", &self.context)
            .field("output_dir", &self.output_dir)
            .finish_non_exhaustive()
    }
}

impl SeriesOrchestrator {
    /// Creates an orchestrator writing series directories under `output_dir`.
    #[must_use]
    pub fn new(
        policy: RunPolicy,
        registry: Arc<ResolverRegistry>,
        fetcher: Arc<dyn ImageFetcher>,
        encoder: Arc<dyn PageEncoder>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            registry,
            context: ChapterContext::new(policy, fetcher, encoder),
            output_dir: output_dir.into(),
            stop: Arc::new(AtomicBool::new(false)),
            reporter: None,
        }
    }

    /// Replaces the page retry timing.
    #[must_use]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.context.retry_policy = retry_policy;
        self
    }

    /// Shares a progress accumulator with a display.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<FetchProgress>) -> Self {
        self.context.progress = progress;
        self
    }

    /// Uses an externally owned stop flag (set by a signal handler).
    #[must_use]
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    /// Attaches a reporter notified per chapter and at the end of the run.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// The stop flag checked between chapters.
    #[must_use]
    pub fn stop_flag(&self) -> &Arc<AtomicBool> {
        &self.stop
    }

    /// Progress accumulator shared by all chapter pools.
    #[must_use]
    pub fn progress(&self) -> &Arc<FetchProgress> {
        &self.context.progress
    }

    /// Output root.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Lists a series' chapters through the resolver registered for its URL.
    ///
    /// The series name is `name_override` when given, else derived from the
    /// URL; both are sanitized.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] if no resolver handles the URL, the series
    /// page cannot be read, or it lists a chapter twice.
    #[instrument(skip(self))]
    pub async fn discover_series(
        &self,
        series_url: &str,
        name_override: Option<&str>,
    ) -> Result<Series, ResolveError> {
        let resolver = self.registry.find(series_url)?;
        let chapters = resolver.list_chapters(series_url).await?;
        let name = name_override.map_or_else(|| derive_series_name(series_url), sanitize_name);
        info!(series = %name, chapters = chapters.len(), resolver = resolver.name(), "Series discovered");
        Series::new(name, chapters)
    }

    /// Processes every chapter of `series` in order.
    #[instrument(skip(self, series), fields(series = %series.name(), chapters = series.len()))]
    pub async fn run_series(&self, series: &Series) -> RunReport {
        self.run_chapters(series.name(), series.chapters()).await
    }

    /// Processes one chapter given by URL.
    ///
    /// The chapter label is `chapter_number` when given, else parsed from the
    /// URL (`custom` when absent). The series name is `series_name` when
    /// given, else the last path segment of the chapter URL.
    #[instrument(skip(self))]
    pub async fn run_single(
        &self,
        chapter_url: &str,
        chapter_number: Option<&str>,
        series_name: Option<&str>,
    ) -> RunReport {
        let number = chapter_number
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map_or_else(|| chapter_label_from_url(chapter_url), str::to_string);
        let name = series_name.map_or_else(
            || derive_series_name(chapter_url),
            sanitize_name,
        );
        let chapter = ChapterRef::new(number, chapter_url);
        self.run_chapters(&name, std::slice::from_ref(&chapter)).await
    }

    async fn run_chapters(&self, series_name: &str, chapters: &[ChapterRef]) -> RunReport {
        let layout = SeriesLayout::new(&self.output_dir, series_name);
        if let Err(e) = layout.ensure_dirs() {
            warn!(root = %layout.root().display(), error = %e, "could not create series directories");
        }
        info!(
            root = %layout.root().display(),
            chapters = chapters.len(),
            "Series directory ready"
        );

        let extension = self.context.encoder.extension();
        let total = chapters.len();
        let mut reports = Vec::with_capacity(total);
        let mut cancelled = false;

        for (position, chapter) in chapters.iter().enumerate() {
            if self.stop.load(Ordering::SeqCst) {
                warn!(
                    remaining = total - position,
                    "Stop requested; not starting further chapters"
                );
                cancelled = true;
                break;
            }

            if let Some(reporter) = &self.reporter {
                reporter.chapter_started(chapter, position + 1, total);
            }

            let job = ChapterJob::new(chapter.clone(), &layout, extension);
            let report = match self.registry.find(&chapter.source_url) {
                Ok(resolver) => job.execute(resolver.as_ref(), &self.context).await,
                Err(e) => {
                    warn!(chapter = %chapter.number, error = %e, "no resolver for chapter");
                    unresolvable_chapter(chapter, &e)
                }
            };

            if let Some(reporter) = &self.reporter {
                reporter.chapter_finished(&report);
            }
            reports.push(report);
        }

        let run = RunReport {
            series_name: series_name.to_string(),
            chapters: reports,
            cancelled,
        };
        if let Some(reporter) = &self.reporter {
            reporter.run_finished(&run);
        }
        run
    }
}

fn unresolvable_chapter(chapter: &ChapterRef, error: &ResolveError) -> ChapterReport {
    ChapterReport {
        number: chapter.number.clone(),
        source_url: chapter.source_url.clone(),
        outcome: ChapterOutcome::Failed,
        skipped: false,
        document: None,
        missing_indices: Vec::new(),
        results: Vec::new(),
        error: Some(error.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use tempfile::TempDir;

    use super::*;
    use crate::encoder::EncodeError;
    use crate::fetch::FetchError;
    use crate::resolver::Resolver;

    const SERIES_URL: &str = "https://reader.example.com/series/solo";

    /// Serves a fixed chapter map; chapters not in the map fail to resolve.
    struct MapResolver {
        chapters: Vec<ChapterRef>,
        pages: HashMap<String, Vec<String>>,
    }

    impl MapResolver {
        fn new(pages_per_chapter: &[usize]) -> Self {
            let mut chapters = Vec::new();
            let mut pages = HashMap::new();
            for (i, count) in pages_per_chapter.iter().enumerate() {
                let number = (i + 1).to_string();
                let url = format!("{SERIES_URL}/chapter-{number}");
                pages.insert(
                    url.clone(),
                    (0..*count)
                        .map(|p| format!("https://cdn.example.com/{number}/{p}.jpg"))
                        .collect(),
                );
                chapters.push(ChapterRef::new(number, url));
            }
            Self { chapters, pages }
        }
    }

    #[async_trait]
    impl Resolver for MapResolver {
        fn name(&self) -> &'static str {
            "map"
        }

        fn can_handle(&self, url: &str) -> bool {
            url.starts_with("https://reader.example.com/")
        }

        async fn list_chapters(&self, _series_url: &str) -> Result<Vec<ChapterRef>, ResolveError> {
            Ok(self.chapters.clone())
        }

        async fn resolve(&self, chapter: &ChapterRef) -> Result<Vec<String>, ResolveError> {
            self.pages
                .get(&chapter.source_url)
                .cloned()
                .ok_or_else(|| ResolveError::http(&chapter.source_url, 404))
        }
    }

    #[derive(Default)]
    struct OkFetcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ImageFetcher for OkFetcher {
        async fn fetch(&self, url: &str, _progress: &FetchProgress) -> Result<Vec<u8>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(url.as_bytes().to_vec())
        }
    }

    struct MarkerEncoder;

    impl PageEncoder for MarkerEncoder {
        fn extension(&self) -> &'static str {
            "pdf"
        }

        fn encode(&self, pages: &[PathBuf], output: &Path) -> Result<(), EncodeError> {
            std::fs::write(output, format!("{} pages", pages.len()))
                .map_err(|e| EncodeError::io(output, e))
        }
    }

    #[derive(Default)]
    struct RecordingReporter {
        started: Mutex<Vec<String>>,
        finished: Mutex<Vec<ChapterOutcome>>,
        runs: AtomicUsize,
    }

    impl Reporter for RecordingReporter {
        fn chapter_started(&self, chapter: &ChapterRef, _position: usize, _total: usize) {
            self.started.lock().unwrap().push(chapter.number.clone());
        }

        fn chapter_finished(&self, report: &ChapterReport) {
            self.finished.lock().unwrap().push(report.outcome);
        }

        fn run_finished(&self, _report: &RunReport) {
            self.runs.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn orchestrator(
        resolver: MapResolver,
        fetcher: Arc<OkFetcher>,
        output: &Path,
    ) -> SeriesOrchestrator {
        let mut registry = ResolverRegistry::new();
        registry.register(Arc::new(resolver));
        SeriesOrchestrator::new(
            RunPolicy::new(2, 0, false).unwrap(),
            Arc::new(registry),
            fetcher,
            Arc::new(MarkerEncoder),
            output,
        )
        .with_retry_policy(RetryPolicy::immediate(0))
    }

    #[tokio::test]
    async fn test_discover_series_uses_derived_or_override_name() {
        let dir = TempDir::new().unwrap();
        let orch = orchestrator(MapResolver::new(&[1, 1]), Arc::default(), dir.path());

        let series = orch.discover_series(SERIES_URL, None).await.unwrap();
        assert_eq!(series.name(), "solo");
        assert_eq!(series.len(), 2);

        let named = orch
            .discover_series(SERIES_URL, Some("Solo: Reborn"))
            .await
            .unwrap();
        assert_eq!(named.name(), "Solo_ Reborn");
    }

    #[tokio::test]
    async fn test_discover_series_without_resolver_fails() {
        let dir = TempDir::new().unwrap();
        let orch = orchestrator(MapResolver::new(&[1]), Arc::default(), dir.path());
        let result = orch
            .discover_series("https://elsewhere.example.com/series/x", None)
            .await;
        assert!(matches!(result, Err(ResolveError::NoResolver { .. })));
    }

    #[tokio::test]
    async fn test_run_series_two_chapters_completes_both() {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(OkFetcher::default());
        let reporter = Arc::new(RecordingReporter::default());
        let orch = orchestrator(MapResolver::new(&[3, 2]), fetcher.clone(), dir.path())
            .with_reporter(reporter.clone());

        let series = orch.discover_series(SERIES_URL, None).await.unwrap();
        let report = orch.run_series(&series).await;

        assert_eq!(report.completed(), 2);
        assert_eq!(report.failed(), 0);
        assert_eq!(report.download_results().count(), 5);
        assert!(report.download_results().all(DownloadResult::is_success));
        assert!(!report.cancelled);
        assert!(dir.path().join("solo/Chapters/chapter-1.pdf").is_file());
        assert!(dir.path().join("solo/Chapters/chapter-2.pdf").is_file());
        assert!(dir.path().join("solo/Images/chapter-1/003.jpg").is_file());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 5);

        assert_eq!(*reporter.started.lock().unwrap(), vec!["1", "2"]);
        assert_eq!(reporter.finished.lock().unwrap().len(), 2);
        assert_eq!(reporter.runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_run_series_second_run_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(OkFetcher::default());
        let orch = orchestrator(MapResolver::new(&[2]), fetcher.clone(), dir.path());
        let series = orch.discover_series(SERIES_URL, None).await.unwrap();

        orch.run_series(&series).await;
        let before = std::fs::read(dir.path().join("solo/Chapters/chapter-1.pdf")).unwrap();
        let calls_after_first = fetcher.calls.load(Ordering::SeqCst);

        let second = orch.run_series(&series).await;
        assert_eq!(second.skipped(), 1);
        assert_eq!(second.completed(), 1);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), calls_after_first);
        assert_eq!(
            std::fs::read(dir.path().join("solo/Chapters/chapter-1.pdf")).unwrap(),
            before
        );
    }

    #[tokio::test]
    async fn test_run_series_continues_after_failed_chapter() {
        let dir = TempDir::new().unwrap();
        let resolver = MapResolver::new(&[1, 1]);
        let mut chapters = resolver.chapters.clone();
        chapters.insert(
            1,
            ChapterRef::new("1.5", format!("{SERIES_URL}/chapter-1.5")),
        );
        let series = Series::new("solo", chapters).unwrap();
        let orch = orchestrator(resolver, Arc::default(), dir.path());

        let report = orch.run_series(&series).await;
        let outcomes: Vec<ChapterOutcome> = report.chapters.iter().map(|c| c.outcome).collect();
        assert_eq!(
            outcomes,
            vec![
                ChapterOutcome::Completed,
                ChapterOutcome::Failed,
                ChapterOutcome::Completed
            ]
        );
    }

    #[tokio::test]
    async fn test_run_series_stop_flag_prevents_new_chapters() {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(OkFetcher::default());
        let orch = orchestrator(MapResolver::new(&[1, 1]), fetcher.clone(), dir.path());
        orch.stop_flag().store(true, Ordering::SeqCst);

        let series = orch.discover_series(SERIES_URL, None).await.unwrap();
        let report = orch.run_series(&series).await;

        assert!(report.cancelled);
        assert!(report.chapters.is_empty());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_run_single_derives_label_and_series() {
        let dir = TempDir::new().unwrap();
        let orch = orchestrator(MapResolver::new(&[2]), Arc::default(), dir.path());

        let report = orch
            .run_single(&format!("{SERIES_URL}/chapter-1"), None, None)
            .await;

        assert_eq!(report.series_name, "chapter-1");
        assert_eq!(report.chapters.len(), 1);
        assert_eq!(report.chapters[0].number, "1");
        assert_eq!(report.completed(), 1);
        assert!(dir.path().join("chapter-1/Chapters/chapter-1.pdf").is_file());
    }

    #[tokio::test]
    async fn test_run_single_unknown_host_is_failed_chapter() {
        let dir = TempDir::new().unwrap();
        let orch = orchestrator(MapResolver::new(&[1]), Arc::default(), dir.path());

        let report = orch
            .run_single("https://elsewhere.example.com/x/chapter-3", Some("3"), Some("other"))
            .await;

        assert_eq!(report.series_name, "other");
        assert_eq!(report.failed(), 1);
        assert!(report.chapters[0].error.as_ref().unwrap().contains("no resolver"));
    }
}
