//! Aggregated results of a fetch and of a whole download job.

use std::collections::BTreeMap;
use std::fmt;

use crate::outcome::{DetailFetchOutcome, ErrorKind};
use crate::parcel::ParcelId;

/// Default number of failure messages kept for display.
pub const DEFAULT_SAMPLE_CAP: usize = 5;

/// How a fetch ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// Every batch ran.
    Completed,
    /// The caller cancelled; the report is partial.
    Cancelled,
    /// Budgeted failures went above the allowance.
    BudgetExceeded { failures: usize, budget: usize },
    /// A job-level condition stopped the run.
    Fatal { kind: Option<ErrorKind>, message: String },
}

impl Termination {
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Whether this ending should be reported to the host as an error.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::BudgetExceeded { .. } | Self::Fatal { .. })
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => f.write_str("completed"),
            Self::Cancelled => f.write_str("cancelled"),
            Self::BudgetExceeded { failures, budget } => write!(
                f,
                "aborted after {failures} failures (error budget {budget})"
            ),
            Self::Fatal {
                kind: Some(kind),
                message,
            } => write!(f, "aborted ({kind}): {message}"),
            Self::Fatal {
                kind: None,
                message,
            } => write!(f, "aborted: {message}"),
        }
    }
}

/// One recorded failure message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureSample {
    pub id: ParcelId,
    pub kind: ErrorKind,
    pub message: String,
}

/// Per-kind failure counts plus a bounded sample of messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureSummary {
    counts: BTreeMap<ErrorKind, usize>,
    samples: Vec<FailureSample>,
    sample_cap: usize,
}

impl Default for FailureSummary {
    fn default() -> Self {
        Self::with_sample_cap(DEFAULT_SAMPLE_CAP)
    }
}

impl FailureSummary {
    #[must_use]
    pub fn with_sample_cap(sample_cap: usize) -> Self {
        Self {
            counts: BTreeMap::new(),
            samples: Vec::new(),
            sample_cap,
        }
    }

    /// Count a failure; returns `true` when its message was sampled.
    pub fn record(&mut self, id: &ParcelId, kind: ErrorKind, message: &str) -> bool {
        *self.counts.entry(kind).or_default() += 1;
        if self.samples.len() >= self.sample_cap {
            return false;
        }
        self.samples.push(FailureSample {
            id: id.clone(),
            kind,
            message: message.to_owned(),
        });
        true
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    #[must_use]
    pub fn count(&self, kind: ErrorKind) -> usize {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    /// Non-zero counts in kind order.
    pub fn counts(&self) -> impl Iterator<Item = (ErrorKind, usize)> + '_ {
        self.counts.iter().map(|(kind, count)| (*kind, *count))
    }

    #[must_use]
    pub fn samples(&self) -> &[FailureSample] {
        &self.samples
    }

    /// Failures whose messages were not sampled.
    #[must_use]
    pub fn suppressed(&self) -> usize {
        self.total().saturating_sub(self.samples.len())
    }

    #[must_use]
    pub const fn sample_cap(&self) -> usize {
        self.sample_cap
    }
}

/// Everything the batch fetcher learned.
///
/// `outcomes` lists results batch by batch; within a batch they appear in
/// completion order. Records rejected by the normalizer are recorded as
/// `InvalidGeometry` failures.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchReport {
    pub outcomes: Vec<DetailFetchOutcome>,
    /// Identifiers whose detail request completed.
    pub attempted: usize,
    /// Features handed to the sink.
    pub materialized: usize,
    /// Failures charged to the error budget.
    pub failed: usize,
    /// Batches started.
    pub batches: usize,
    pub termination: Termination,
    pub failures: FailureSummary,
}

impl FetchReport {
    /// Report for a fetch that never started a batch.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            outcomes: Vec::new(),
            attempted: 0,
            materialized: 0,
            failed: 0,
            batches: 0,
            termination: Termination::Completed,
            failures: FailureSummary::default(),
        }
    }

    /// Successful outcomes, in report order.
    pub fn successes(&self) -> impl Iterator<Item = &DetailFetchOutcome> {
        self.outcomes.iter().filter(|outcome| outcome.is_success())
    }
}

/// User-facing result of a download job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSummary {
    /// Identifiers returned by the listing.
    pub found: usize,
    pub attempted: usize,
    pub materialized: usize,
    pub failed: usize,
    pub batches: usize,
    pub termination: Termination,
    pub failures: FailureSummary,
}

impl JobSummary {
    /// Summarize a fetch report for a listing of `found` identifiers.
    #[must_use]
    pub fn from_report(found: usize, report: FetchReport) -> Self {
        Self {
            found,
            attempted: report.attempted,
            materialized: report.materialized,
            failed: report.failed,
            batches: report.batches,
            termination: report.termination,
            failures: report.failures,
        }
    }
}

impl fmt::Display for JobSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "found {} parcels, loaded {}, failed {} ({})",
            self.found, self.materialized, self.failed, self.termination
        )
    }
}
