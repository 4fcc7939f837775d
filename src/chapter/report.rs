//! Chapter outcome and the per-chapter report handed to reporters.

use std::fmt;
use std::path::PathBuf;

use crate::model::DownloadResult;

/// Lifecycle and terminal state of a chapter job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChapterOutcome {
    /// Job created, nothing attempted yet.
    NotStarted,
    /// Tasks are being fetched.
    InProgress,
    /// Every page succeeded and the document was written (or already existed).
    Completed,
    /// Some pages succeeded but at least one failed, or encoding failed.
    PartiallyFailed,
    /// No page succeeded, or the chapter could not be resolved.
    Failed,
}

impl ChapterOutcome {
    /// Returns true once the job can no longer change state.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::PartiallyFailed | Self::Failed
        )
    }

    /// Stable lowercase label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not-started",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
            Self::PartiallyFailed => "partially-failed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ChapterOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything known about one chapter after its job finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterReport {
    /// Chapter designation.
    pub number: String,
    /// Chapter page URL.
    pub source_url: String,
    /// Terminal outcome.
    pub outcome: ChapterOutcome,
    /// The document already existed and nothing was attempted.
    pub skipped: bool,
    /// Document path when one exists after the job.
    pub document: Option<PathBuf>,
    /// Page indices that did not download.
    pub missing_indices: Vec<usize>,
    /// One result per page task, ordered by index.
    pub results: Vec<DownloadResult>,
    /// Resolution or encoding error, rendered.
    pub error: Option<String>,
}

impl ChapterReport {
    /// Pages that ended succeeded.
    #[must_use]
    pub fn succeeded_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    /// Pages that ended failed.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.results.len() - self.succeeded_count()
    }

    /// Pages reused from a previous run.
    #[must_use]
    pub fn reused_count(&self) -> usize {
        self.results.iter().filter(|r| r.reused).count()
    }

    /// Bytes written for this chapter's pages.
    #[must_use]
    pub fn bytes(&self) -> u64 {
        self.results.iter().map(|r| r.bytes).sum()
    }
}
