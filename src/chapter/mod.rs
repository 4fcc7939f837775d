//! Chapter jobs: one chapter's page tasks, their aggregate outcome and the
//! hand-off to the page encoder.
//!
//! A job is built from a [`ChapterRef`] and the resolver's ordered URL list.
//! Page files are named by index so a lexical listing of the image directory
//! reproduces page order; the encoder is only ever given pages sorted by
//! index.

mod report;

pub use report::{ChapterOutcome, ChapterReport};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::encoder::{EncodeError, PageEncoder};
use crate::fetch::{FetchPool, FetchProgress, ImageFetcher, RetryPolicy};
use crate::layout::{SeriesLayout, is_valid_image_url, page_file_name};
use crate::model::{ChapterRef, DownloadResult, ImageTask, TaskStatus};
use crate::policy::RunPolicy;
use crate::resolver::{ResolveError, Resolver};

/// Collaborators shared by every chapter job of a run.
#[derive(Clone)]
pub struct ChapterContext {
    /// Run policy.
    pub policy: RunPolicy,
    /// Network seam for page images.
    pub fetcher: Arc<dyn ImageFetcher>,
    /// Document encoder.
    pub encoder: Arc<dyn PageEncoder>,
    /// Retry timing for page fetches.
    pub retry_policy: RetryPolicy,
    /// Progress accumulator shared with any display.
    pub progress: Arc<FetchProgress>,
}

impl ChapterContext {
    /// Creates a context with the policy's retry count and a fresh progress accumulator.
    #[must_use]
    pub fn new(
        policy: RunPolicy,
        fetcher: Arc<dyn ImageFetcher>,
        encoder: Arc<dyn PageEncoder>,
    ) -> Self {
        Self {
            retry_policy: RetryPolicy::from_max_retries(policy.max_retries()),
            policy,
            fetcher,
            encoder,
            progress: Arc::new(FetchProgress::new()),
        }
    }

    /// Builds the per-chapter fetch pool.
    #[must_use]
    pub fn fetch_pool(&self) -> FetchPool {
        FetchPool::new(&self.policy, Arc::clone(&self.fetcher))
            .with_retry_policy(self.retry_policy.clone())
            .with_progress(Arc::clone(&self.progress))
    }
}

impl std::fmt::Debug for ChapterContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChapterContext")
            .field("policy", &self.policy)
            .field("retry_policy", &self.retry_policy)
            .finish_non_exhaustive()
    }
}

/// One chapter's page tasks and outcome.
#[derive(Debug)]
pub struct ChapterJob {
    chapter: ChapterRef,
    image_dir: PathBuf,
    document_path: PathBuf,
    tasks: Vec<ImageTask>,
    results: Vec<DownloadResult>,
    outcome: ChapterOutcome,
}

impl ChapterJob {
    /// Creates a job whose files live under `layout`.
    #[must_use]
    pub fn new(chapter: ChapterRef, layout: &SeriesLayout, document_extension: &str) -> Self {
        let image_dir = layout.chapter_image_dir(&chapter.number);
        let document_path = layout.chapter_document(&chapter.number, document_extension);
        Self::with_paths(chapter, image_dir, document_path)
    }

    /// Creates a job with explicit page directory and document path.
    #[must_use]
    pub fn with_paths(chapter: ChapterRef, image_dir: PathBuf, document_path: PathBuf) -> Self {
        Self {
            chapter,
            image_dir,
            document_path,
            tasks: Vec::new(),
            results: Vec::new(),
            outcome: ChapterOutcome::NotStarted,
        }
    }

    /// Builds one task per usable URL, indexed by position after filtering.
    ///
    /// Returns the number of tasks created.
    pub fn load_tasks<I, S>(&mut self, urls: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let urls: Vec<String> = urls
            .into_iter()
            .map(Into::into)
            .filter(|url| {
                let valid = is_valid_image_url(url);
                if !valid {
                    debug!(url = %url, "dropping unusable image URL");
                }
                valid
            })
            .collect();

        let total = urls.len();
        self.tasks = urls
            .into_iter()
            .enumerate()
            .map(|(index, url)| {
                let dest = self.image_dir.join(page_file_name(index, total, &url));
                ImageTask::new(index, url, dest)
            })
            .collect();
        total
    }

    /// Returns true if the document exists and may not be overwritten.
    #[must_use]
    pub fn should_skip(&self, policy: &RunPolicy) -> bool {
        !policy.overwrite_existing() && self.document_path.is_file()
    }

    /// Fetches every task through `pool` and computes the outcome.
    #[instrument(skip(self, pool, policy), fields(chapter = %self.chapter.number, tasks = self.tasks.len()))]
    pub async fn run(&mut self, pool: &FetchPool, policy: &RunPolicy) -> ChapterOutcome {
        self.outcome = ChapterOutcome::InProgress;
        let results = pool
            .run(self.tasks.clone(), policy.overwrite_existing())
            .await;

        for result in &results {
            if let Some(task) = self.tasks.iter_mut().find(|t| t.index == result.task_index) {
                task.status = result.status;
                task.attempts = result.attempts_used;
            }
        }
        self.results = results;
        self.outcome = self.compute_outcome();
        self.outcome
    }

    /// No succeeded task (including an empty chapter) is `Failed`.
    fn compute_outcome(&self) -> ChapterOutcome {
        let succeeded = self
            .tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Succeeded)
            .count();
        if succeeded == 0 {
            ChapterOutcome::Failed
        } else if succeeded == self.tasks.len() {
            ChapterOutcome::Completed
        } else {
            ChapterOutcome::PartiallyFailed
        }
    }

    /// Indices of tasks that did not succeed, ascending.
    #[must_use]
    pub fn missing_indices(&self) -> Vec<usize> {
        let mut missing: Vec<usize> = self
            .tasks
            .iter()
            .filter(|t| t.status != TaskStatus::Succeeded)
            .map(|t| t.index)
            .collect();
        missing.sort_unstable();
        missing
    }

    /// Paths of succeeded pages sorted by index.
    #[must_use]
    pub fn ordered_pages(&self) -> Vec<PathBuf> {
        let mut pages: Vec<&ImageTask> = self
            .tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Succeeded)
            .collect();
        pages.sort_by_key(|t| t.index);
        pages.into_iter().map(|t| t.dest_path.clone()).collect()
    }

    /// The chapter this job downloads.
    #[must_use]
    pub fn chapter(&self) -> &ChapterRef {
        &self.chapter
    }

    /// Directory page files are written to.
    #[must_use]
    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    /// Path of the chapter's document.
    #[must_use]
    pub fn document_path(&self) -> &Path {
        &self.document_path
    }

    /// Page tasks in index order.
    #[must_use]
    pub fn tasks(&self) -> &[ImageTask] {
        &self.tasks
    }

    /// Current outcome.
    #[must_use]
    pub fn outcome(&self) -> ChapterOutcome {
        self.outcome
    }

    /// Runs the whole chapter: skip check, resolve, fetch, encode.
    ///
    /// Never fails; every problem is folded into the returned report.
    #[instrument(skip(self, resolver, ctx), fields(chapter = %self.chapter.number))]
    pub async fn execute(mut self, resolver: &dyn Resolver, ctx: &ChapterContext) -> ChapterReport {
        if self.should_skip(&ctx.policy) {
            info!(
                document = %self.document_path.display(),
                "chapter document exists, skipping"
            );
            self.outcome = ChapterOutcome::Completed;
            return self.into_report(true, None);
        }

        let urls = match resolver.resolve(&self.chapter).await {
            Ok(urls) => urls,
            Err(e) => {
                warn!(error = %e, "chapter resolution failed");
                self.outcome = ChapterOutcome::Failed;
                return self.into_report(false, Some(e.to_string()));
            }
        };

        if self.load_tasks(urls) == 0 {
            let error = ResolveError::no_images(&self.chapter.source_url);
            warn!(error = %error, "chapter has no pages");
            self.outcome = ChapterOutcome::Failed;
            return self.into_report(false, Some(error.to_string()));
        }

        info!(pages = self.tasks.len(), "downloading chapter");
        let pool = ctx.fetch_pool();
        let outcome = self.run(&pool, &ctx.policy).await;

        if outcome != ChapterOutcome::Completed {
            warn!(
                outcome = %outcome,
                missing = ?self.missing_indices(),
                "chapter incomplete, document not written"
            );
            return self.into_report(false, None);
        }

        match encode_pages(&ctx.encoder, self.ordered_pages(), self.document_path.clone()).await {
            Ok(()) => {
                info!(document = %self.document_path.display(), "chapter document written");
                self.into_report(false, None)
            }
            Err(e) => {
                warn!(error = %e, "chapter encoding failed");
                self.outcome = ChapterOutcome::PartiallyFailed;
                self.into_report(false, Some(e.to_string()))
            }
        }
    }

    fn into_report(self, skipped: bool, error: Option<String>) -> ChapterReport {
        let document = (self.outcome == ChapterOutcome::Completed
            && self.document_path.is_file())
        .then(|| self.document_path.clone());
        let missing_indices = self.missing_indices();
        ChapterReport {
            number: self.chapter.number,
            source_url: self.chapter.source_url,
            outcome: self.outcome,
            skipped,
            document,
            missing_indices,
            results: self.results,
            error,
        }
    }
}

async fn encode_pages(
    encoder: &Arc<dyn PageEncoder>,
    pages: Vec<PathBuf>,
    output: PathBuf,
) -> Result<(), EncodeError> {
    let encoder = Arc::clone(encoder);
    tokio::task::spawn_blocking(move || encoder.encode(&pages, &output))
        .await
        .map_err(|e| EncodeError::interrupted(e.to_string()))?
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use tempfile::TempDir;

    use super::*;
    use crate::fetch::FetchError;

    struct ListResolver {
        result: Result<Vec<String>, ResolveError>,
        calls: AtomicUsize,
    }

    impl ListResolver {
        fn ok(urls: &[&str]) -> Self {
            Self {
                result: Ok(urls.iter().map(ToString::to_string).collect()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Resolver for ListResolver {
        fn name(&self) -> &'static str {
            "list"
        }

        fn can_handle(&self, _url: &str) -> bool {
            true
        }

        async fn list_chapters(&self, _series_url: &str) -> Result<Vec<ChapterRef>, ResolveError> {
            Ok(Vec::new())
        }

        async fn resolve(&self, _chapter: &ChapterRef) -> Result<Vec<String>, ResolveError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    /// Fails URLs containing "missing" with 404, serves everything else.
    #[derive(Default)]
    struct NotFoundFetcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ImageFetcher for NotFoundFetcher {
        async fn fetch(&self, url: &str, _progress: &FetchProgress) -> Result<Vec<u8>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if url.contains("missing") {
                Err(FetchError::http_status(url, 404))
            } else {
                Ok(url.as_bytes().to_vec())
            }
        }
    }

    /// Serves `.../<i>.jpg` after `(pages - i) * 25ms`, so later pages finish first.
    struct ReverseFetcher {
        pages: u64,
        finished: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ImageFetcher for ReverseFetcher {
        async fn fetch(&self, url: &str, _progress: &FetchProgress) -> Result<Vec<u8>, FetchError> {
            let page: u64 = url
                .rsplit('/')
                .next()
                .and_then(|name| name.strip_suffix(".jpg"))
                .and_then(|n| n.parse().ok())
                .unwrap();
            tokio::time::sleep(Duration::from_millis((self.pages - page) * 25)).await;
            self.finished.lock().unwrap().push(url.to_string());
            Ok(url.as_bytes().to_vec())
        }
    }

    /// Records the pages it was given and writes a marker document.
    #[derive(Default)]
    struct RecordingEncoder {
        calls: Mutex<Vec<Vec<PathBuf>>>,
        fail: bool,
    }

    impl PageEncoder for RecordingEncoder {
        fn extension(&self) -> &'static str {
            "pdf"
        }

        fn encode(&self, pages: &[PathBuf], output: &Path) -> Result<(), EncodeError> {
            self.calls.lock().unwrap().push(pages.to_vec());
            if self.fail {
                return Err(EncodeError::interrupted("forced"));
            }
            std::fs::create_dir_all(output.parent().unwrap()).unwrap();
            std::fs::write(output, b"doc").unwrap();
            Ok(())
        }
    }

    fn context(fetcher: Arc<NotFoundFetcher>, encoder: Arc<RecordingEncoder>) -> ChapterContext {
        let policy = RunPolicy::new(3, 2, false).unwrap();
        let mut ctx = ChapterContext::new(policy, fetcher, encoder);
        ctx.retry_policy = RetryPolicy::immediate(2);
        ctx
    }

    fn job(dir: &Path) -> ChapterJob {
        let layout = SeriesLayout::new(dir, "series");
        ChapterJob::new(
            ChapterRef::new("1", "https://omegascans.org/series/s/chapter-1"),
            &layout,
            "pdf",
        )
    }

    #[test]
    fn test_load_tasks_filters_and_names_pages() {
        let dir = TempDir::new().unwrap();
        let mut job = job(dir.path());
        let count = job.load_tasks([
            "https://cdn.example.com/a.png",
            "/relative.jpg",
            "https://cdn.example.com/icon.svg",
            "https://cdn.example.com/b",
        ]);

        assert_eq!(count, 2);
        let names: Vec<String> = job
            .tasks()
            .iter()
            .map(|t| t.dest_path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["001.png", "002.jpg"]);
        assert_eq!(job.tasks()[1].index, 1);
        assert!(job.tasks()[0].dest_path.starts_with(job.image_dir()));
    }

    #[test]
    fn test_should_skip_respects_overwrite() {
        let dir = TempDir::new().unwrap();
        let job = job(dir.path());
        let keep = RunPolicy::new(1, 0, false).unwrap();
        let overwrite = RunPolicy::new(1, 0, true).unwrap();
        assert!(!job.should_skip(&keep));

        std::fs::create_dir_all(job.document_path().parent().unwrap()).unwrap();
        std::fs::write(job.document_path(), b"doc").unwrap();
        assert!(job.should_skip(&keep));
        assert!(!job.should_skip(&overwrite));
    }

    #[tokio::test]
    async fn test_execute_all_pages_completes_and_encodes_in_order() {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(NotFoundFetcher::default());
        let encoder = Arc::new(RecordingEncoder::default());
        let ctx = context(fetcher, encoder.clone());
        let resolver = ListResolver::ok(&[
            "https://cdn.example.com/1.jpg",
            "https://cdn.example.com/2.jpg",
            "https://cdn.example.com/3.jpg",
        ]);

        let report = job(dir.path()).execute(&resolver, &ctx).await;

        assert_eq!(report.outcome, ChapterOutcome::Completed);
        assert!(!report.skipped);
        assert_eq!(report.succeeded_count(), 3);
        assert!(report.document.is_some());
        let calls = encoder.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let names: Vec<String> = calls[0]
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["001.jpg", "002.jpg", "003.jpg"]);
    }

    #[tokio::test]
    async fn test_execute_reverse_completion_keeps_page_order() {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(ReverseFetcher {
            pages: 5,
            finished: Mutex::new(Vec::new()),
        });
        let encoder = Arc::new(RecordingEncoder::default());
        let policy = RunPolicy::new(5, 0, false).unwrap();
        let mut ctx = ChapterContext::new(policy, fetcher.clone(), encoder.clone());
        ctx.retry_policy = RetryPolicy::immediate(0);
        let urls: Vec<String> = (0..5)
            .map(|i| format!("https://cdn.example.com/{i}.jpg"))
            .collect();
        let resolver = ListResolver {
            result: Ok(urls.clone()),
            calls: AtomicUsize::new(0),
        };

        let report = job(dir.path()).execute(&resolver, &ctx).await;

        let finished = fetcher.finished.lock().unwrap().clone();
        assert_eq!(finished.first(), Some(&urls[4]));
        assert_ne!(finished, urls);
        let indices: Vec<usize> = report.results.iter().map(|r| r.task_index).collect();
        assert_eq!(indices, [0, 1, 2, 3, 4]);
        assert_eq!(report.outcome, ChapterOutcome::Completed);
        let calls = encoder.calls.lock().unwrap();
        let names: Vec<String> = calls[0]
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["001.jpg", "002.jpg", "003.jpg", "004.jpg", "005.jpg"]);
    }

    #[tokio::test]
    async fn test_run_without_tasks_is_failed() {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(NotFoundFetcher::default());
        let ctx = context(fetcher.clone(), Arc::new(RecordingEncoder::default()));
        let mut job = job(dir.path());

        assert_eq!(job.load_tasks(Vec::<String>::new()), 0);
        let outcome = job.run(&ctx.fetch_pool(), &ctx.policy).await;

        assert_eq!(outcome, ChapterOutcome::Failed);
        assert!(job.missing_indices().is_empty());
        assert!(job.ordered_pages().is_empty());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_execute_partial_failure_skips_encoder() {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(NotFoundFetcher::default());
        let encoder = Arc::new(RecordingEncoder::default());
        let ctx = context(fetcher.clone(), encoder.clone());
        let resolver = ListResolver::ok(&[
            "https://cdn.example.com/1.jpg",
            "https://cdn.example.com/missing.jpg",
            "https://cdn.example.com/3.jpg",
        ]);

        let report = job(dir.path()).execute(&resolver, &ctx).await;

        assert_eq!(report.outcome, ChapterOutcome::PartiallyFailed);
        assert_eq!(report.missing_indices, vec![1]);
        assert_eq!(report.results.len(), 3);
        assert!(report.document.is_none());
        assert!(encoder.calls.lock().unwrap().is_empty());
        // 404 is not retried.
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_execute_all_failed_is_failed() {
        let dir = TempDir::new().unwrap();
        let ctx = context(
            Arc::new(NotFoundFetcher::default()),
            Arc::new(RecordingEncoder::default()),
        );
        let resolver = ListResolver::ok(&[
            "https://cdn.example.com/missing-1.jpg",
            "https://cdn.example.com/missing-2.jpg",
        ]);

        let report = job(dir.path()).execute(&resolver, &ctx).await;
        assert_eq!(report.outcome, ChapterOutcome::Failed);
        assert_eq!(report.missing_indices, vec![0, 1]);
    }

    #[tokio::test]
    async fn test_execute_resolution_error_fails_without_fetching() {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(NotFoundFetcher::default());
        let ctx = context(fetcher.clone(), Arc::new(RecordingEncoder::default()));
        let resolver = ListResolver {
            result: Err(ResolveError::http("https://omegascans.org/x", 500)),
            calls: AtomicUsize::new(0),
        };

        let report = job(dir.path()).execute(&resolver, &ctx).await;
        assert_eq!(report.outcome, ChapterOutcome::Failed);
        assert!(report.results.is_empty());
        assert!(report.error.unwrap().contains("HTTP 500"));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_execute_no_usable_urls_fails() {
        let dir = TempDir::new().unwrap();
        let ctx = context(
            Arc::new(NotFoundFetcher::default()),
            Arc::new(RecordingEncoder::default()),
        );
        let resolver = ListResolver::ok(&["https://cdn.example.com/logo.svg"]);

        let report = job(dir.path()).execute(&resolver, &ctx).await;
        assert_eq!(report.outcome, ChapterOutcome::Failed);
        assert!(report.error.unwrap().contains("no page images"));
    }

    #[tokio::test]
    async fn test_execute_existing_document_skips_resolver() {
        let dir = TempDir::new().unwrap();
        let job = job(dir.path());
        std::fs::create_dir_all(job.document_path().parent().unwrap()).unwrap();
        std::fs::write(job.document_path(), b"doc").unwrap();

        let fetcher = Arc::new(NotFoundFetcher::default());
        let ctx = context(fetcher.clone(), Arc::new(RecordingEncoder::default()));
        let resolver = ListResolver::ok(&["https://cdn.example.com/1.jpg"]);

        let report = job.execute(&resolver, &ctx).await;
        assert_eq!(report.outcome, ChapterOutcome::Completed);
        assert!(report.skipped);
        assert!(report.document.is_some());
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_execute_encode_error_marks_partially_failed() {
        let dir = TempDir::new().unwrap();
        let encoder = Arc::new(RecordingEncoder {
            fail: true,
            ..RecordingEncoder::default()
        });
        let ctx = context(Arc::new(NotFoundFetcher::default()), encoder);
        let resolver = ListResolver::ok(&["https://cdn.example.com/1.jpg"]);

        let report = job(dir.path()).execute(&resolver, &ctx).await;
        assert_eq!(report.outcome, ChapterOutcome::PartiallyFailed);
        assert!(report.missing_indices.is_empty());
        assert!(report.document.is_none());
        assert!(report.error.unwrap().contains("forced"));
    }
}
