use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Thread-safe counters describing pipeline activity.
#[derive(Default)]
pub struct RunMetrics {
    runs_completed: AtomicU64,
    runs_failed: AtomicU64,
    chunks_transformed: AtomicU64,
    chunks_failed: AtomicU64,
    last_run_at: Mutex<Option<String>>,
}

impl RunMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the per-chunk tally of one finished stage.
    pub fn record_stage(&self, succeeded: u64, failed: u64) {
        self.chunks_transformed
            .fetch_add(succeeded, Ordering::Relaxed);
        self.chunks_failed.fetch_add(failed, Ordering::Relaxed);
    }

    /// Record a run that produced a summary.
    pub fn record_completed(&self) {
        self.runs_completed.fetch_add(1, Ordering::Relaxed);
        self.touch();
    }

    /// Record a run that ended in a terminal error.
    pub fn record_failed(&self) {
        self.runs_failed.fetch_add(1, Ordering::Relaxed);
        self.touch();
    }

    fn touch(&self) {
        let stamp = OffsetDateTime::now_utc().format(&Rfc3339).ok();
        if let Ok(mut guard) = self.last_run_at.lock() {
            *guard = stamp;
        }
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            runs_completed: self.runs_completed.load(Ordering::Relaxed),
            runs_failed: self.runs_failed.load(Ordering::Relaxed),
            chunks_transformed: self.chunks_transformed.load(Ordering::Relaxed),
            chunks_failed: self.chunks_failed.load(Ordering::Relaxed),
            last_run_at: self
                .last_run_at
                .lock()
                .ok()
                .and_then(|guard| guard.clone()),
        }
    }
}

/// Immutable view of pipeline counters used for reporting.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Runs that returned a summary since startup.
    pub runs_completed: u64,
    /// Runs that ended in a terminal error since startup.
    pub runs_failed: u64,
    /// Chunk transforms (translate or summarize) that succeeded.
    pub chunks_transformed: u64,
    /// Chunk transforms that failed or timed out.
    pub chunks_failed: u64,
    /// RFC3339 timestamp of the most recent finished run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_run_at: Option<String>,
}
