//! End-to-end download job: list a region, fetch every parcel, report.

use log::info;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use parcel_core::{
    BoundingBox, FeatureSink, FetchPolicy, FetchReport, JobHost, JobSummary, ParcelSource,
    ProgressSink, SourceError, Termination, percent,
};

use crate::fetch::fetch_details;

/// Errors that prevent a job from producing a summary.
#[derive(Debug, Error)]
pub enum JobError {
    /// The region listing failed; no detail request was issued.
    #[error("failed to list parcels in {region}")]
    Listing {
        region: BoundingBox,
        #[source]
        source: SourceError,
    },
}

/// Forwards batch progress to the host and relays its cancellation flag.
struct HostProgress<'a, H: ?Sized> {
    host: &'a H,
    cancel: &'a CancellationToken,
}

impl<H: JobHost + ?Sized> ProgressSink for HostProgress<'_, H> {
    fn batch_completed(&mut self, processed: usize, total: usize) {
        self.host.report_progress(percent(processed, total));
        if self.host.is_cancelled() {
            self.cancel.cancel();
        }
    }
}

/// List `region`, fetch every parcel and emit accepted features to `sink`.
///
/// The host hears about the listing, per-batch progress as a percentage,
/// and the outcome. A budget abort or fatal detail error is reported once
/// as a fatal error; cancellation is reported as information.
///
/// # Errors
///
/// Returns [`JobError::Listing`] when the region cannot be listed. The host
/// has already been told about the failure.
pub async fn run_download<S, K, H>(
    source: &S,
    region: &BoundingBox,
    policy: &FetchPolicy,
    sink: &mut K,
    host: &H,
    cancel: &CancellationToken,
) -> Result<JobSummary, JobError>
where
    S: ParcelSource + ?Sized,
    K: FeatureSink + ?Sized,
    H: JobHost + ?Sized,
{
    if host.is_cancelled() {
        cancel.cancel();
    }
    if cancel.is_cancelled() {
        host.report_info("download cancelled before it started");
        let report = FetchReport {
            termination: Termination::Cancelled,
            ..FetchReport::empty()
        };
        return Ok(JobSummary::from_report(0, report));
    }

    host.report_info(&format!("requesting parcels in {region}"));
    let ids = match source.list_identifiers(region).await {
        Ok(ids) => ids,
        Err(source) => {
            host.report_error(&format!("failed to list parcels: {source}"), true);
            return Err(JobError::Listing {
                region: *region,
                source,
            });
        }
    };

    let found = ids.len();
    host.report_info(&format!("found {found} parcels"));
    if found == 0 {
        host.report_progress(100);
        info!("no parcels in {region}");
        return Ok(JobSummary::from_report(0, FetchReport::empty()));
    }

    let mut progress = HostProgress { host, cancel };
    let report = fetch_details(source, ids, policy, sink, &mut progress, cancel).await;
    let summary = JobSummary::from_report(found, report);

    match &summary.termination {
        termination if termination.is_error() => {
            host.report_error(&format!("download {termination}"), true);
        }
        Termination::Cancelled => host.report_info(&format!("download cancelled: {summary}")),
        _ => host.report_info(&summary.to_string()),
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{StubParcelSource, StubReply};
    use parcel_core::test_support::{HostEvent, RecordingHost, numbered_ids, square_detail};
    use parcel_core::{ErrorKind, ParcelFeature};
    use rstest::{fixture, rstest};

    #[fixture]
    fn region() -> BoundingBox {
        BoundingBox::new(11.0, 45.0, 11.005, 45.005).expect("valid region")
    }

    fn ok() -> StubReply {
        StubReply::Detail(square_detail("p"))
    }

    #[rstest]
    #[tokio::test]
    async fn completed_job_reports_progress_and_summary(region: BoundingBox) {
        let source = StubParcelSource::new(numbered_ids(4), ok());
        let host = RecordingHost::default();
        let mut features: Vec<ParcelFeature> = Vec::new();
        let policy = FetchPolicy::new().with_batch_size(2);

        let summary = run_download(
            &source,
            &region,
            &policy,
            &mut features,
            &host,
            &CancellationToken::new(),
        )
        .await
        .expect("job runs");

        assert_eq!(summary.found, 4);
        assert_eq!(summary.materialized, 4);
        assert!(summary.termination.is_completed());
        assert_eq!(host.progress(), vec![50, 100]);
        assert!(host.fatal_errors().is_empty());
        assert!(
            host.events()
                .contains(&HostEvent::Info("found 4 parcels".to_owned()))
        );
    }

    #[rstest]
    #[tokio::test]
    async fn listing_failure_is_fatal(region: BoundingBox) {
        let source = StubParcelSource::failing_listing(SourceError::Authentication {
            url: "stub".into(),
            status: 403,
            message: "check subscription".into(),
        });
        let host = RecordingHost::default();
        let mut features: Vec<ParcelFeature> = Vec::new();

        let err = run_download(
            &source,
            &region,
            &FetchPolicy::new(),
            &mut features,
            &host,
            &CancellationToken::new(),
        )
        .await
        .expect_err("listing fails");

        assert!(matches!(err, JobError::Listing { .. }));
        assert_eq!(host.fatal_errors().len(), 1);
        assert!(source.detail_calls().is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn empty_region_completes_without_details(region: BoundingBox) {
        let source = StubParcelSource::new(Vec::new(), ok());
        let host = RecordingHost::default();
        let mut features: Vec<ParcelFeature> = Vec::new();

        let summary = run_download(
            &source,
            &region,
            &FetchPolicy::new(),
            &mut features,
            &host,
            &CancellationToken::new(),
        )
        .await
        .expect("job runs");

        assert_eq!(summary.found, 0);
        assert_eq!(summary.batches, 0);
        assert_eq!(host.progress(), vec![100]);
        assert!(source.detail_calls().is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn budget_abort_is_reported_once(region: BoundingBox) {
        let timeout = StubReply::Error(SourceError::Timeout { url: "stub".into() });
        let source = StubParcelSource::new(numbered_ids(6), timeout);
        let host = RecordingHost::default();
        let mut features: Vec<ParcelFeature> = Vec::new();
        let policy = FetchPolicy::new().with_batch_size(2).with_error_budget(1);

        let summary = run_download(
            &source,
            &region,
            &policy,
            &mut features,
            &host,
            &CancellationToken::new(),
        )
        .await
        .expect("job runs");

        assert!(matches!(summary.termination, Termination::BudgetExceeded { .. }));
        assert_eq!(summary.failures.count(ErrorKind::Timeout), 2);
        assert_eq!(host.fatal_errors().len(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn host_cancellation_skips_listing(region: BoundingBox) {
        let source = StubParcelSource::new(numbered_ids(2), ok());
        let host = RecordingHost::cancelled();
        let mut features: Vec<ParcelFeature> = Vec::new();

        let summary = run_download(
            &source,
            &region,
            &FetchPolicy::new(),
            &mut features,
            &host,
            &CancellationToken::new(),
        )
        .await
        .expect("job runs");

        assert_eq!(summary.termination, Termination::Cancelled);
        assert_eq!(source.list_calls(), 0);
        assert!(host.fatal_errors().is_empty());
    }
}
