//! Result aggregation and progress reporting.
//!
//! The [`Aggregator`] collects results in arrival order as workers hand them
//! over and freezes into a [`Report`] once the pool has drained.

use crate::types::TokenResult;

/// Receives a callback for every finished check.
///
/// Called from the collecting task, never concurrently. `completed` counts
/// results seen so far including this one; `total` is the input size.
pub trait ProgressSink: Send + Sync {
    fn on_result(&self, completed: usize, total: usize, result: &TokenResult);
}

/// Progress sink that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_result(&self, _completed: usize, _total: usize, _result: &TokenResult) {}
}

impl<F> ProgressSink for F
where
    F: Fn(usize, usize, &TokenResult) + Send + Sync,
{
    fn on_result(&self, completed: usize, total: usize, result: &TokenResult) {
        self(completed, total, result)
    }
}

/// Collects results as they arrive.
#[derive(Debug, Default)]
pub struct Aggregator {
    expected: usize,
    results: Vec<TokenResult>,
}

impl Aggregator {
    /// Create an aggregator expecting `expected` results.
    pub fn new(expected: usize) -> Self {
        Self {
            expected,
            results: Vec::with_capacity(expected),
        }
    }

    /// Record one result.
    pub fn push(&mut self, result: TokenResult) {
        self.results.push(result);
    }

    /// Number of results recorded so far.
    pub fn completed(&self) -> usize {
        self.results.len()
    }

    /// Freeze into a report.
    pub fn finish(self, cancelled: bool) -> Report {
        Report {
            expected: self.expected,
            results: self.results,
            cancelled,
        }
    }
}

/// Final outcome of a validation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    expected: usize,
    results: Vec<TokenResult>,
    cancelled: bool,
}

impl Report {
    /// Every result, in arrival order.
    pub fn results(&self) -> &[TokenResult] {
        &self.results
    }

    /// Results that passed, in arrival order.
    pub fn valid(&self) -> Vec<&TokenResult> {
        self.results.iter().filter(|r| r.is_valid).collect()
    }

    /// Results that failed, in arrival order.
    pub fn invalid(&self) -> Vec<&TokenResult> {
        self.results.iter().filter(|r| !r.is_valid).collect()
    }

    /// Number of results collected.
    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn valid_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_valid).count()
    }

    pub fn invalid_count(&self) -> usize {
        self.total() - self.valid_count()
    }

    /// Number of tokens that were submitted.
    pub fn expected(&self) -> usize {
        self.expected
    }

    /// Tokens never checked because the run was cancelled.
    pub fn skipped(&self) -> usize {
        self.expected.saturating_sub(self.results.len())
    }

    /// Whether the run was cancelled before finishing.
    pub fn was_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Full token values of every valid result, in arrival order.
    pub fn valid_raw_tokens(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| r.is_valid)
            .map(|r| r.raw_value.as_str())
            .collect()
    }
}
