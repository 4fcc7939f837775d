//! Fixed-size worker pool that drains a queue of image tasks.
//!
//! `worker_count` workers are spawned on a `JoinSet`; each pops the next task
//! from a shared queue, runs it to a terminal state (retrying transient
//! failures per the [`RetryPolicy`]) and sends exactly one [`DownloadResult`]
//! back over a channel. No task is abandoned while another is in flight, and
//! a failure never cancels sibling tasks.

use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use super::client::ImageFetcher;
use super::error::{FetchError, FetchErrorKind};
use super::progress::FetchProgress;
use super::retry::{FailureType, RetryDecision, RetryPolicy, classify_error};
use crate::model::{DownloadResult, ImageTask, TaskFailure, TaskStatus};
use crate::policy::RunPolicy;

/// Suffix of the temporary file a page is written to before rename.
const PARTIAL_SUFFIX: &str = "part";

/// Concurrent fetcher for one batch of image tasks.
///
/// A pool may be reused for several batches; each [`FetchPool::run`] call is
/// independent apart from the shared [`FetchProgress`].
#[derive(Clone)]
pub struct FetchPool {
    worker_count: usize,
    retry_policy: RetryPolicy,
    fetcher: Arc<dyn ImageFetcher>,
    progress: Arc<FetchProgress>,
}

impl std::fmt::Debug for FetchPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchPool")
            .field("worker_count", &self.worker_count)
            .field("retry_policy", &self.retry_policy)
            .finish_non_exhaustive()
    }
}

impl FetchPool {
    /// Creates a pool sized and retried according to `policy`.
    #[must_use]
    pub fn new(policy: &RunPolicy, fetcher: Arc<dyn ImageFetcher>) -> Self {
        Self {
            worker_count: policy.worker_count(),
            retry_policy: RetryPolicy::from_max_retries(policy.max_retries()),
            fetcher,
            progress: Arc::new(FetchProgress::new()),
        }
    }

    /// Replaces the retry policy (tests use zero-delay policies).
    #[must_use]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Shares an externally owned progress accumulator.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<FetchProgress>) -> Self {
        self.progress = progress;
        self
    }

    /// Number of workers a batch is split across.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Progress accumulator updated by this pool.
    #[must_use]
    pub fn progress(&self) -> &Arc<FetchProgress> {
        &self.progress
    }

    /// Runs every task to a terminal state.
    ///
    /// Returns exactly one result per input task, ordered by task index.
    /// When `overwrite` is false, tasks whose destination already exists are
    /// reported as succeeded without a network attempt.
    pub async fn run(&self, tasks: Vec<ImageTask>, overwrite: bool) -> Vec<DownloadResult> {
        self.run_with_observer(tasks, overwrite, |_| {}).await
    }

    /// Like [`FetchPool::run`], calling `observer` as each result arrives.
    #[instrument(skip(self, tasks, observer), fields(tasks = tasks.len(), workers = self.worker_count))]
    pub async fn run_with_observer<F>(
        &self,
        tasks: Vec<ImageTask>,
        overwrite: bool,
        mut observer: F,
    ) -> Vec<DownloadResult>
    where
        F: FnMut(&DownloadResult),
    {
        if tasks.is_empty() {
            debug!("no tasks to fetch");
            return Vec::new();
        }

        let task_count = tasks.len();
        self.progress.add_queued(task_count);

        // Kept to synthesize results for tasks a crashed worker never reported.
        let mut pending: BTreeMap<usize, ImageTask> =
            tasks.iter().map(|t| (t.index, t.clone())).collect();

        let queue = Arc::new(Mutex::new(tasks.into_iter().collect::<VecDeque<_>>()));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let worker = Arc::new(Worker {
            fetcher: Arc::clone(&self.fetcher),
            retry_policy: self.retry_policy.clone(),
            progress: Arc::clone(&self.progress),
            overwrite,
        });

        let spawned = self.worker_count.clamp(1, task_count);
        let mut workers = JoinSet::new();
        for worker_id in 0..spawned {
            let queue = Arc::clone(&queue);
            let worker = Arc::clone(&worker);
            let tx = tx.clone();
            workers.spawn(async move {
                while let Some(task) = next_task(&queue) {
                    let result = worker.process(task).await;
                    if tx.send(result).is_err() {
                        break;
                    }
                }
                debug!(worker_id, "worker drained queue");
            });
        }
        drop(tx);

        let mut results = Vec::with_capacity(task_count);
        while let Some(result) = rx.recv().await {
            observer(&result);
            pending.remove(&result.task_index);
            results.push(result);
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "fetch worker terminated abnormally");
            }
        }

        for (_, task) in pending {
            warn!(index = task.index, url = %task.url, "task lost by worker; marking failed");
            self.progress.record_outcome(false);
            let result = DownloadResult::failed(task, aborted_failure());
            observer(&result);
            results.push(result);
        }

        results.sort_by_key(|r| r.task_index);

        let succeeded = results.iter().filter(|r| r.is_success()).count();
        info!(
            succeeded,
            failed = task_count - succeeded,
            "fetch batch complete"
        );
        results
    }
}

fn next_task(queue: &Mutex<VecDeque<ImageTask>>) -> Option<ImageTask> {
    queue
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .pop_front()
}

fn aborted_failure() -> TaskFailure {
    TaskFailure {
        kind: FetchErrorKind::Aborted,
        failure_type: FailureType::Permanent,
        message: "worker stopped before reporting the task".to_string(),
    }
}

/// State shared by all workers of one batch.
struct Worker {
    fetcher: Arc<dyn ImageFetcher>,
    retry_policy: RetryPolicy,
    progress: Arc<FetchProgress>,
    overwrite: bool,
}

impl Worker {
    #[instrument(skip(self, task), fields(index = task.index, url = %task.url))]
    async fn process(&self, mut task: ImageTask) -> DownloadResult {
        if !self.overwrite && file_exists(&task.dest_path).await {
            debug!(path = %task.dest_path.display(), "page already on disk, reusing");
            self.progress.record_outcome(true);
            return DownloadResult::reused(task);
        }

        task.status = TaskStatus::Downloading;
        self.progress.download_started();
        let result = self.attempt_until_terminal(task).await;
        self.progress.download_finished();
        self.progress.record_outcome(result.is_success());
        result
    }

    async fn attempt_until_terminal(&self, mut task: ImageTask) -> DownloadResult {
        loop {
            task.attempts += 1;
            let attempt = task.attempts;

            let error = match self.fetcher.fetch(&task.url, &self.progress).await {
                Ok(bytes) => match write_page(&task.dest_path, &bytes).await {
                    Ok(()) => {
                        task.status = TaskStatus::Succeeded;
                        debug!(attempt, bytes = bytes.len(), "page saved");
                        return DownloadResult::succeeded(task, bytes.len() as u64);
                    }
                    Err(e) => e,
                },
                Err(e) => e,
            };

            match self.retry_policy.should_retry(classify_error(&error), attempt) {
                RetryDecision::Retry { delay, attempt: next } => {
                    warn!(
                        attempt,
                        next_attempt = next,
                        delay_ms = delay.as_millis(),
                        error = %error,
                        "fetch failed, retrying"
                    );
                    self.progress.record_retry();
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::DoNotRetry { reason } => {
                    warn!(attempt, error = %error, reason = %reason, "fetch failed");
                    task.status = TaskStatus::Failed;
                    return DownloadResult::failed(task, TaskFailure::from_error(&error));
                }
            }
        }
    }
}

async fn file_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(".");
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

/// Writes to `<dest>.part` then renames, so `dest` is either absent or complete.
async fn write_page(dest: &Path, bytes: &[u8]) -> Result<(), FetchError> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| FetchError::io(parent, e))?;
    }
    let partial = partial_path(dest);
    tokio::fs::write(&partial, bytes)
        .await
        .map_err(|e| FetchError::io(&partial, e))?;
    if let Err(e) = tokio::fs::rename(&partial, dest).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(FetchError::io(dest, e));
    }
    Ok(())
}
