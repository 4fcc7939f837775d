//! Data model shared by the fetch pool, chapter jobs and the orchestrator.

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

use crate::fetch::{FailureType, FetchError, FetchErrorKind, classify_error};
use crate::resolver::ResolveError;

/// One orderable unit of a series.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChapterRef {
    /// Chapter designation exactly as supplied (may be fractional, e.g. `30.5`).
    pub number: String,
    /// Page the resolver reads the chapter's image list from.
    pub source_url: String,
}

impl ChapterRef {
    /// Creates a chapter reference.
    #[must_use]
    pub fn new(number: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            source_url: source_url.into(),
        }
    }
}

impl fmt::Display for ChapterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chapter {}", self.number)
    }
}

/// An ordered, immutable collection of chapters sharing a destination directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Series {
    name: String,
    chapters: Vec<ChapterRef>,
}

impl Series {
    /// Creates a series, rejecting duplicate chapter numbers.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::DuplicateChapter`] if two chapters share a number.
    pub fn new(name: impl Into<String>, chapters: Vec<ChapterRef>) -> Result<Self, ResolveError> {
        let name = name.into();
        let mut seen = HashSet::with_capacity(chapters.len());
        for chapter in &chapters {
            if !seen.insert(chapter.number.as_str()) {
                return Err(ResolveError::duplicate_chapter(&name, &chapter.number));
            }
        }
        Ok(Self { name, chapters })
    }

    /// Series directory name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Chapters in resolver order.
    #[must_use]
    pub fn chapters(&self) -> &[ChapterRef] {
        &self.chapters
    }

    /// Number of chapters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    /// Returns true if the series has no chapters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }
}

/// Lifecycle of one image task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Queued, not yet picked up by a worker.
    Pending,
    /// A worker is attempting the fetch.
    Downloading,
    /// Bytes are on disk at the destination path.
    Succeeded,
    /// Permanent failure or retries exhausted.
    Failed,
}

impl TaskStatus {
    /// Returns true for `Succeeded` and `Failed`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Stable lowercase label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Downloading => "downloading",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

/// Download of one page image, identified by its zero-based page index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageTask {
    /// Zero-based page position; the only key for final page order.
    pub index: usize,
    /// Image URL.
    pub url: String,
    /// Where the page is written.
    pub dest_path: PathBuf,
    /// Attempts consumed so far.
    pub attempts: u32,
    /// Current status.
    pub status: TaskStatus,
}

impl ImageTask {
    /// Creates a pending task.
    #[must_use]
    pub fn new(index: usize, url: impl Into<String>, dest_path: impl Into<PathBuf>) -> Self {
        Self {
            index,
            url: url.into(),
            dest_path: dest_path.into(),
            attempts: 0,
            status: TaskStatus::Pending,
        }
    }
}

/// Why a task ended `Failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    /// Reportable error kind (carries the HTTP status when there was one).
    pub kind: FetchErrorKind,
    /// Whether the last error was transient (retries exhausted) or permanent.
    pub failure_type: FailureType,
    /// Rendered error message.
    pub message: String,
}

impl TaskFailure {
    /// Captures the final error of a failed task.
    #[must_use]
    pub fn from_error(error: &FetchError) -> Self {
        Self {
            kind: error.kind(),
            failure_type: classify_error(error),
            message: error.to_string(),
        }
    }
}

/// Immutable per-task outcome record, emitted once per task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    /// Page index of the task.
    pub task_index: usize,
    /// Image URL.
    pub url: String,
    /// Destination path of the page.
    pub dest_path: PathBuf,
    /// Terminal status (`Succeeded` or `Failed`).
    pub status: TaskStatus,
    /// Final error for failed tasks.
    pub error: Option<TaskFailure>,
    /// Network attempts consumed (0 when an existing file was reused).
    pub attempts_used: u32,
    /// Bytes written (0 on failure or reuse).
    pub bytes: u64,
    /// An existing file at the destination was kept instead of re-fetching.
    pub reused: bool,
}

impl DownloadResult {
    pub(crate) fn succeeded(task: ImageTask, bytes: u64) -> Self {
        Self {
            task_index: task.index,
            url: task.url,
            dest_path: task.dest_path,
            status: TaskStatus::Succeeded,
            error: None,
            attempts_used: task.attempts,
            bytes,
            reused: false,
        }
    }

    pub(crate) fn reused(task: ImageTask) -> Self {
        Self {
            task_index: task.index,
            url: task.url,
            dest_path: task.dest_path,
            status: TaskStatus::Succeeded,
            error: None,
            attempts_used: 0,
            bytes: 0,
            reused: true,
        }
    }

    pub(crate) fn failed(task: ImageTask, failure: TaskFailure) -> Self {
        Self {
            task_index: task.index,
            url: task.url,
            dest_path: task.dest_path,
            status: TaskStatus::Failed,
            error: Some(failure),
            attempts_used: task.attempts,
            bytes: 0,
            reused: false,
        }
    }

    /// Returns true if the task succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == TaskStatus::Succeeded
    }

    /// HTTP status of the final failure, if any.
    #[must_use]
    pub fn http_status(&self) -> Option<u16> {
        self.error.as_ref().and_then(|e| e.kind.http_status())
    }
}
