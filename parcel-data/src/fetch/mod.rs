//! Batched, bounded-concurrency retrieval of parcel details.
//!
//! Identifiers are split into consecutive batches. Each batch is submitted
//! to one worker pool shared by the whole job and drained completely before
//! the next one starts, so batches never overlap. The coordinator alone
//! updates counters and talks to the sinks, after a batch has drained.
//!
//! A job stops early when
//! - the cancellation token fires (checked before each batch and while one
//!   is in flight),
//! - an `Authentication` or `RateLimited` failure was seen in the batch,
//! - the sink refused a feature, or
//! - budgeted failures exceed the error budget.

use std::time::Duration;

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use log::{debug, info, warn};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use parcel_core::{
    BatchJob, DetailFetchOutcome, ErrorKind, FailureSummary, FeatureSink, FetchPolicy,
    FetchReport, ParcelFeature, ParcelId, ParcelSource, ProgressSink, Termination, normalize,
};

/// Fetch every identifier under `policy` and emit accepted features to `sink`.
///
/// # Examples
///
/// ```no_run
/// use parcel_core::{FetchPolicy, NoProgress, ParcelFeature, ParcelSource};
/// use parcel_data::fetch::fetch_details;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn demo(source: &dyn ParcelSource) {
/// let mut features: Vec<ParcelFeature> = Vec::new();
/// let report = fetch_details(
///     source,
///     vec!["1".into(), "2".into()],
///     &FetchPolicy::new(),
///     &mut features,
///     &mut NoProgress,
///     &CancellationToken::new(),
/// )
/// .await;
/// println!("{} loaded ({})", report.materialized, report.termination);
/// # }
/// ```
pub async fn fetch_details<S, K, P>(
    source: &S,
    ids: Vec<ParcelId>,
    policy: &FetchPolicy,
    sink: &mut K,
    progress: &mut P,
    cancel: &CancellationToken,
) -> FetchReport
where
    S: ParcelSource + ?Sized,
    K: FeatureSink + ?Sized,
    P: ProgressSink + ?Sized,
{
    let job = policy.plan(ids);
    fetch_job(source, &job, sink, progress, cancel).await
}

/// Run an already planned [`BatchJob`].
pub async fn fetch_job<S, K, P>(
    source: &S,
    job: &BatchJob,
    sink: &mut K,
    progress: &mut P,
    cancel: &CancellationToken,
) -> FetchReport
where
    S: ParcelSource + ?Sized,
    K: FeatureSink + ?Sized,
    P: ProgressSink + ?Sized,
{
    if job.is_empty() {
        debug!("no parcels to fetch");
        return FetchReport::empty();
    }

    let total = job.total();
    let batch_count = job.batch_count();
    let pool = Semaphore::new(job.worker_limit());
    let mut state = Coordinator::new(sink, job.sample_cap());
    let mut termination = Termination::Completed;

    for (index, batch) in job.batches().enumerate() {
        if cancel.is_cancelled() {
            termination = Termination::Cancelled;
            break;
        }
        state.batches += 1;
        debug!(
            "batch {}/{batch_count}: requesting {} parcels",
            index + 1,
            batch.len()
        );

        let drained = drain_batch(source, batch, &pool, job.request_timeout(), cancel).await;
        state.attempted += drained.outcomes.len();
        for outcome in drained.outcomes {
            state.accept(outcome);
        }
        if drained.interrupted {
            debug!("batch {} interrupted by cancellation", index + 1);
            termination = Termination::Cancelled;
            break;
        }

        progress.batch_completed(state.attempted, total);
        if let Some(fatal) = state.fatal.take() {
            termination = fatal;
            break;
        }
        if state.failed > job.error_budget() {
            termination = Termination::BudgetExceeded {
                failures: state.failed,
                budget: job.error_budget(),
            };
            break;
        }
    }

    let report = state.finish(termination);
    info!(
        "fetched {} of {total} parcels in {} batches: {} loaded, {} failed ({})",
        report.attempted, report.batches, report.materialized, report.failed, report.termination
    );
    report
}

struct Drained {
    outcomes: Vec<DetailFetchOutcome>,
    interrupted: bool,
}

/// Run one batch through the pool, collecting outcomes as they complete.
///
/// On cancellation the remaining requests are dropped.
async fn drain_batch<S>(
    source: &S,
    batch: &[ParcelId],
    pool: &Semaphore,
    limit: Duration,
    cancel: &CancellationToken,
) -> Drained
where
    S: ParcelSource + ?Sized,
{
    let mut in_flight: FuturesUnordered<_> = batch
        .iter()
        .map(|id| fetch_one(source, id, pool, limit))
        .collect();
    let mut outcomes = Vec::with_capacity(batch.len());
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                return Drained { outcomes, interrupted: true };
            }
            next = in_flight.next() => match next {
                Some(outcome) => outcomes.push(outcome),
                None => return Drained { outcomes, interrupted: false },
            },
        }
    }
}

async fn fetch_one<S>(
    source: &S,
    id: &ParcelId,
    pool: &Semaphore,
    limit: Duration,
) -> DetailFetchOutcome
where
    S: ParcelSource + ?Sized,
{
    let Ok(_permit) = pool.acquire().await else {
        return DetailFetchOutcome::failure(id.clone(), ErrorKind::Connection, "worker pool closed");
    };
    match tokio::time::timeout(limit, source.fetch_detail(id)).await {
        Ok(Ok(detail)) => DetailFetchOutcome::success(id.clone(), detail),
        Ok(Err(err)) => DetailFetchOutcome::failure(id.clone(), err.kind(), err.to_string()),
        Err(_) => DetailFetchOutcome::failure(
            id.clone(),
            ErrorKind::Timeout,
            format!("no response within {} ms", limit.as_millis()),
        ),
    }
}

/// Counters and sink access owned by the coordinating task.
struct Coordinator<'a, K: ?Sized> {
    sink: &'a mut K,
    outcomes: Vec<DetailFetchOutcome>,
    attempted: usize,
    materialized: usize,
    failed: usize,
    batches: usize,
    failures: FailureSummary,
    suppression_noted: bool,
    fatal: Option<Termination>,
    sink_closed: bool,
}

impl<'a, K: FeatureSink + ?Sized> Coordinator<'a, K> {
    fn new(sink: &'a mut K, sample_cap: usize) -> Self {
        Self {
            sink,
            outcomes: Vec::new(),
            attempted: 0,
            materialized: 0,
            failed: 0,
            batches: 0,
            failures: FailureSummary::with_sample_cap(sample_cap),
            suppression_noted: false,
            fatal: None,
            sink_closed: false,
        }
    }

    /// Normalize a success and hand it to the sink, or book a failure.
    fn accept(&mut self, outcome: DetailFetchOutcome) {
        let (id, fields, geometry) = match outcome {
            DetailFetchOutcome::Success {
                id,
                fields,
                geometry,
            } => (id, fields, geometry),
            DetailFetchOutcome::Failure { id, kind, message } => {
                self.record_failure(id, kind, message);
                return;
            }
        };

        let canonical = match normalize(&geometry) {
            Ok(canonical) => canonical,
            Err(err) => {
                self.record_failure(id, ErrorKind::InvalidGeometry, err.to_string());
                return;
            }
        };
        if !self.sink_closed {
            let feature = ParcelFeature::new(id.clone(), fields.clone(), canonical);
            match self.sink.add_feature(feature) {
                Ok(()) => self.materialized += 1,
                Err(err) => {
                    warn!("feature sink failed: {err}");
                    self.sink_closed = true;
                    self.fatal.get_or_insert(Termination::Fatal {
                        kind: None,
                        message: err.to_string(),
                    });
                }
            }
        }
        self.outcomes.push(DetailFetchOutcome::Success {
            id,
            fields,
            geometry,
        });
    }

    fn record_failure(&mut self, id: ParcelId, kind: ErrorKind, message: String) {
        if self.failures.record(&id, kind, &message) {
            warn!("parcel {id} failed ({kind}): {message}");
        } else if !self.suppression_noted {
            self.suppression_noted = true;
            warn!(
                "further failure messages suppressed after {}",
                self.failures.sample_cap()
            );
        }

        if kind.counts_against_budget() {
            self.failed += 1;
        } else if self.fatal.is_none() {
            self.fatal = Some(Termination::Fatal {
                kind: Some(kind),
                message: message.clone(),
            });
        }
        self.outcomes
            .push(DetailFetchOutcome::failure(id, kind, message));
    }

    fn finish(self, termination: Termination) -> FetchReport {
        FetchReport {
            outcomes: self.outcomes,
            attempted: self.attempted,
            materialized: self.materialized,
            failed: self.failed,
            batches: self.batches,
            termination,
            failures: self.failures,
        }
    }
}
