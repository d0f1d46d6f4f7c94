use serde::Serialize;

use crate::model::{AnomalyKind, Thread, ThreadId};

// ---------------------------------------------------------------------------
// Observers
// ---------------------------------------------------------------------------

/// Per-thread progress callback. Purely observational.
pub trait Progress {
    fn advance(&mut self);
    fn finish(&mut self);
}

/// Does nothing. For quiet runs and tests.
pub struct NoProgress;

impl Progress for NoProgress {
    fn advance(&mut self) {}
    fn finish(&mut self) {}
}

/// Receives a locator request for an anomalous thread. Only called when
/// the policy's `enumerate` flag is set; resolving and printing the
/// locator is the implementor's business.
pub trait LinkReporter {
    fn anomaly(&mut self, kind: AnomalyKind, thread: &Thread);
}

/// Swallows anomaly links.
pub struct NoLinks;

impl LinkReporter for NoLinks {
    fn anomaly(&mut self, _kind: AnomalyKind, _thread: &Thread) {}
}

// ---------------------------------------------------------------------------
// Accumulator
// ---------------------------------------------------------------------------

/// Per-category counters for one pass. An explicit accumulator owned by
/// the orchestrator, merged into the report at the end of the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunTotals {
    pub good: u64,
    pub good_with_duplicates: u64,
    pub good_with_disorder: u64,
    pub partial: u64,
    pub partial_with_duplicates: u64,
    pub partial_with_disorder: u64,
    pub missing: u64,
}

/// A thread the pass could not process. Its repair (if one started) was
/// rolled back.
#[derive(Debug, Clone, Serialize)]
pub struct ThreadFailure {
    pub thread: ThreadId,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub engine_version: String,
    pub run_at: String,
}

impl RunMeta {
    pub fn stamp() -> Self {
        Self {
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Final output of a reconciliation pass.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub meta: RunMeta,
    pub thread_count: u64,
    pub totals: RunTotals,
    pub threads_updated: u64,
    pub posts_updated: u64,
    pub failures: Vec<ThreadFailure>,
}

impl RunReport {
    /// Human-readable summary in the fixed reporting order.
    pub fn summary_lines(&self) -> Vec<String> {
        let t = &self.totals;
        let mut lines = vec![
            format!("Total threads: {}", self.thread_count),
            format!("Threads completely numbered: {}", t.good),
            format!("-- with duplicates: {}", t.good_with_duplicates),
            format!("-- with disorder: {}", t.good_with_disorder),
            format!("Threads partially numbered: {}", t.partial),
            format!("-- with duplicates: {}", t.partial_with_duplicates),
            format!("-- with disorder: {}", t.partial_with_disorder),
            format!("Threads not numbered: {}", t.missing),
            String::new(),
            format!("Updated threads: {}", self.threads_updated),
            format!("Updated posts: {}", self.posts_updated),
        ];
        if !self.failures.is_empty() {
            lines.push(String::new());
            lines.push(format!("Failed threads: {}", self.failures.len()));
            for failure in &self.failures {
                lines.push(format!("-- thread {}: {}", failure.thread, failure.error));
            }
        }
        lines
    }
}
