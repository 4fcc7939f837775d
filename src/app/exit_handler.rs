//! Exit code logic for the omegadl process.
//!
//! Single responsibility: map the run report to the process exit outcome.

use omegadl_core::RunReport;

use crate::ProcessExit;

/// Determines the process exit outcome from completed and incomplete chapter counts.
pub(crate) fn determine_exit_outcome(completed: usize, incomplete: usize) -> ProcessExit {
    if incomplete == 0 {
        ProcessExit::Success
    } else if completed > 0 {
        ProcessExit::Partial
    } else {
        ProcessExit::Failure
    }
}

/// Exit outcome for a finished run; an interrupted run is a failure.
pub(crate) fn exit_outcome_for_run(report: &RunReport) -> ProcessExit {
    if report.cancelled {
        return ProcessExit::Failure;
    }
    determine_exit_outcome(
        report.completed(),
        report.failed() + report.partially_failed(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use omegadl_core::{ChapterOutcome, ChapterReport};

    fn chapter(outcome: ChapterOutcome) -> ChapterReport {
        ChapterReport {
            number: "1".to_string(),
            source_url: "https://omegascans.org/series/s/chapter-1".to_string(),
            outcome,
            skipped: false,
            document: None,
            missing_indices: Vec::new(),
            results: Vec::new(),
            error: None,
        }
    }

    #[test]
    fn test_exit_outcome_success_when_no_failures() {
        assert_eq!(determine_exit_outcome(3, 0), ProcessExit::Success);
    }

    #[test]
    fn test_exit_outcome_success_when_zero_completed_zero_failed() {
        assert_eq!(determine_exit_outcome(0, 0), ProcessExit::Success);
    }

    #[test]
    fn test_exit_outcome_partial_when_mixed() {
        assert_eq!(determine_exit_outcome(2, 1), ProcessExit::Partial);
    }

    #[test]
    fn test_exit_outcome_failure_when_all_failed() {
        assert_eq!(determine_exit_outcome(0, 2), ProcessExit::Failure);
    }

    #[test]
    fn test_exit_outcome_for_run_counts_partial_chapters_as_incomplete() {
        let report = RunReport {
            series_name: "s".to_string(),
            chapters: vec![
                chapter(ChapterOutcome::Completed),
                chapter(ChapterOutcome::PartiallyFailed),
            ],
            cancelled: false,
        };
        assert_eq!(exit_outcome_for_run(&report), ProcessExit::Partial);

        let only_partial = RunReport {
            chapters: vec![chapter(ChapterOutcome::PartiallyFailed)],
            ..report
        };
        assert_eq!(exit_outcome_for_run(&only_partial), ProcessExit::Failure);
    }

    #[test]
    fn test_exit_outcome_for_run_cancelled_is_failure() {
        let report = RunReport {
            series_name: "s".to_string(),
            chapters: vec![chapter(ChapterOutcome::Completed)],
            cancelled: true,
        };
        assert_eq!(exit_outcome_for_run(&report), ProcessExit::Failure);
    }
}
