//! Batch sizing, error budget and concurrency policy for a fetch.
//!
//! The heuristics below are defaults, not invariants: every value can be
//! overridden through the `with_*` builders.

use std::num::NonZeroUsize;
use std::slice::Chunks;
use std::time::Duration;

use crate::parcel::ParcelId;
use crate::report::DEFAULT_SAMPLE_CAP;

/// Listings up to this size use [`SMALL_BATCH`].
pub const SMALL_JOB_LIMIT: usize = 50;
/// Listings up to this size use [`MEDIUM_BATCH`].
pub const MEDIUM_JOB_LIMIT: usize = 200;
/// Batch size for listings of at most [`SMALL_JOB_LIMIT`] parcels.
pub const SMALL_BATCH: usize = 10;
/// Batch size for listings of at most [`MEDIUM_JOB_LIMIT`] parcels.
pub const MEDIUM_BATCH: usize = 20;
/// Batch size for larger listings.
pub const LARGE_BATCH: usize = 25;
/// Upper bound on the derived error budget.
pub const MAX_DERIVED_BUDGET: usize = 50;
/// Upper bound on the derived worker limit.
pub const MAX_DERIVED_WORKERS: usize = 15;
/// Default ceiling for a single detail request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Tunables for the batch detail fetcher.
///
/// # Examples
///
/// ```
/// use parcel_core::FetchPolicy;
///
/// let policy = FetchPolicy::new();
/// assert_eq!(policy.batch_size_for(120), 20);
/// assert_eq!(policy.error_budget_for(120), 12);
///
/// let fixed = FetchPolicy::new().with_batch_size(2).with_error_budget(1);
/// let job = fixed.plan(vec!["1".into(), "2".into(), "3".into()]);
/// assert_eq!(job.batch_count(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPolicy {
    batch_size: Option<NonZeroUsize>,
    error_budget: Option<usize>,
    worker_limit: Option<NonZeroUsize>,
    request_timeout: Duration,
    sample_cap: usize,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            batch_size: None,
            error_budget: None,
            worker_limit: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            sample_cap: DEFAULT_SAMPLE_CAP,
        }
    }
}

impl FetchPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fix the batch size; zero restores the adaptive default.
    #[must_use]
    pub const fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = NonZeroUsize::new(size);
        self
    }

    #[must_use]
    pub const fn with_error_budget(mut self, budget: usize) -> Self {
        self.error_budget = Some(budget);
        self
    }

    /// Cap concurrent requests; zero restores the derived default.
    #[must_use]
    pub const fn with_worker_limit(mut self, workers: usize) -> Self {
        self.worker_limit = NonZeroUsize::new(workers);
        self
    }

    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Maximum number of failure messages kept in the summary.
    #[must_use]
    pub const fn with_sample_cap(mut self, cap: usize) -> Self {
        self.sample_cap = cap;
        self
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    #[must_use]
    pub const fn sample_cap(&self) -> usize {
        self.sample_cap
    }

    /// Batch size for a listing of `total` identifiers.
    #[must_use]
    pub const fn batch_size_for(&self, total: usize) -> usize {
        if let Some(size) = self.batch_size {
            return size.get();
        }
        if total <= SMALL_JOB_LIMIT {
            SMALL_BATCH
        } else if total <= MEDIUM_JOB_LIMIT {
            MEDIUM_BATCH
        } else {
            LARGE_BATCH
        }
    }

    /// Failures tolerated for a listing of `total` identifiers.
    #[must_use]
    pub fn error_budget_for(&self, total: usize) -> usize {
        self.error_budget
            .unwrap_or_else(|| MAX_DERIVED_BUDGET.min(total / 10))
    }

    /// Concurrent requests allowed for the given batch size.
    #[must_use]
    pub fn worker_limit_for(&self, batch_size: usize) -> usize {
        self.worker_limit.map_or_else(
            || batch_size.clamp(1, MAX_DERIVED_WORKERS),
            NonZeroUsize::get,
        )
    }

    /// Resolve the policy against a concrete identifier list.
    #[must_use]
    pub fn plan(&self, ids: Vec<ParcelId>) -> BatchJob {
        let total = ids.len();
        let batch_size = self.batch_size_for(total);
        BatchJob {
            ids,
            batch_size,
            error_budget: self.error_budget_for(total),
            worker_limit: self.worker_limit_for(batch_size),
            request_timeout: self.request_timeout,
            sample_cap: self.sample_cap,
        }
    }
}

/// A resolved unit of work: identifiers plus the limits that apply to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchJob {
    ids: Vec<ParcelId>,
    batch_size: usize,
    error_budget: usize,
    worker_limit: usize,
    request_timeout: Duration,
    sample_cap: usize,
}

impl BatchJob {
    #[must_use]
    pub fn ids(&self) -> &[ParcelId] {
        &self.ids
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    #[must_use]
    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    #[must_use]
    pub const fn error_budget(&self) -> usize {
        self.error_budget
    }

    #[must_use]
    pub const fn worker_limit(&self) -> usize {
        self.worker_limit
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    #[must_use]
    pub const fn sample_cap(&self) -> usize {
        self.sample_cap
    }

    /// Consecutive batches; only the last may be shorter.
    pub fn batches(&self) -> Chunks<'_, ParcelId> {
        self.ids.chunks(self.batch_size)
    }

    #[must_use]
    pub fn batch_count(&self) -> usize {
        self.ids.len().div_ceil(self.batch_size)
    }
}
