//! Shared progress accumulator injected into fetch pools.
//!
//! A single [`FetchProgress`] can be shared between the pools of every
//! chapter in a run and a display task that polls [`FetchProgress::snapshot`].
//! Nothing here is global: a pool without an injected accumulator gets its
//! own private instance.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Thread-safe counters updated by fetch workers.
#[derive(Debug, Default)]
pub struct FetchProgress {
    bytes_downloaded: AtomicU64,
    tasks_queued: AtomicUsize,
    tasks_succeeded: AtomicUsize,
    tasks_failed: AtomicUsize,
    retries: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

/// Point-in-time copy of [`FetchProgress`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    /// Body bytes received across all attempts.
    pub bytes_downloaded: u64,
    /// Tasks handed to a pool so far.
    pub tasks_queued: usize,
    /// Tasks finished successfully (including reused files).
    pub tasks_succeeded: usize,
    /// Tasks that ended failed.
    pub tasks_failed: usize,
    /// Retry attempts made.
    pub retries: usize,
    /// Tasks currently downloading.
    pub in_flight: usize,
    /// Highest simultaneous downloading count observed.
    pub peak_in_flight: usize,
}

impl ProgressSnapshot {
    /// Tasks that reached a terminal state.
    #[must_use]
    pub fn tasks_done(&self) -> usize {
        self.tasks_succeeded + self.tasks_failed
    }
}

impl FetchProgress {
    /// Creates a new accumulator with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a consistent-enough copy of all counters.
    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            bytes_downloaded: self.bytes_downloaded.load(Ordering::SeqCst),
            tasks_queued: self.tasks_queued.load(Ordering::SeqCst),
            tasks_succeeded: self.tasks_succeeded.load(Ordering::SeqCst),
            tasks_failed: self.tasks_failed.load(Ordering::SeqCst),
            retries: self.retries.load(Ordering::SeqCst),
            in_flight: self.in_flight.load(Ordering::SeqCst),
            peak_in_flight: self.peak_in_flight.load(Ordering::SeqCst),
        }
    }

    /// Adds received body bytes.
    pub fn add_bytes(&self, bytes: u64) {
        self.bytes_downloaded.fetch_add(bytes, Ordering::SeqCst);
    }

    pub(crate) fn add_queued(&self, count: usize) {
        self.tasks_queued.fetch_add(count, Ordering::SeqCst);
    }

    pub(crate) fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn download_started(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    pub(crate) fn download_finished(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    pub(crate) fn record_outcome(&self, succeeded: bool) {
        if succeeded {
            self.tasks_succeeded.fetch_add(1, Ordering::SeqCst);
        } else {
            self.tasks_failed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn test_progress_default_is_zero() {
        let snapshot = FetchProgress::new().snapshot();
        assert_eq!(snapshot, ProgressSnapshot::default());
        assert_eq!(snapshot.tasks_done(), 0);
    }

    #[test]
    fn test_progress_tracks_peak_in_flight() {
        let progress = FetchProgress::new();
        progress.download_started();
        progress.download_started();
        progress.download_finished();
        progress.download_started();
        progress.download_finished();
        progress.download_finished();

        let snapshot = progress.snapshot();
        assert_eq!(snapshot.in_flight, 0);
        assert_eq!(snapshot.peak_in_flight, 2);
    }

    #[test]
    fn test_progress_thread_safe() {
        let progress = Arc::new(FetchProgress::new());
        let mut handles = Vec::new();

        for _ in 0..8 {
            let progress = Arc::clone(&progress);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    progress.add_bytes(10);
                    progress.record_outcome(true);
                    progress.record_outcome(false);
                    progress.record_retry();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = progress.snapshot();
        assert_eq!(snapshot.bytes_downloaded, 8000);
        assert_eq!(snapshot.tasks_succeeded, 800);
        assert_eq!(snapshot.tasks_failed, 800);
        assert_eq!(snapshot.retries, 800);
        assert_eq!(snapshot.tasks_done(), 1600);
    }
}
