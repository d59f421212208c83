//! Collaborators supplied by whoever hosts a download job.

use thiserror::Error;

use crate::parcel::{ParcelFeature, ParcelId};

/// Receives the only incremental signal the fetcher emits.
pub trait ProgressSink {
    /// Called once after each batch has fully drained.
    fn batch_completed(&mut self, processed: usize, total: usize);
}

/// A progress sink that ignores every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn batch_completed(&mut self, _processed: usize, _total: usize) {}
}

/// Errors raised by a [`FeatureSink`].
#[derive(Debug, Error)]
pub enum SinkError {
    /// Writing the feature failed.
    #[error("failed to write parcel {id}")]
    Io {
        id: ParcelId,
        #[source]
        source: std::io::Error,
    },
    /// The sink refused the feature.
    #[error("sink rejected parcel {id}: {message}")]
    Rejected { id: ParcelId, message: String },
}

/// Destination for materialized parcels.
pub trait FeatureSink {
    /// Accept one feature.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] when the feature cannot be stored. The job
    /// stops at the first sink error.
    fn add_feature(&mut self, feature: ParcelFeature) -> Result<(), SinkError>;
}

impl FeatureSink for Vec<ParcelFeature> {
    fn add_feature(&mut self, feature: ParcelFeature) -> Result<(), SinkError> {
        self.push(feature);
        Ok(())
    }
}

/// User-facing reporting surface of the host application.
pub trait JobHost {
    /// Overall completion, 0 to 100.
    fn report_progress(&self, percent: u8);

    /// Whether the user asked to stop.
    fn is_cancelled(&self) -> bool;

    fn report_error(&self, message: &str, fatal: bool);

    fn report_info(&self, message: &str);
}

/// Whole-number percentage, clamped to 100; an empty job is complete.
#[must_use]
pub fn percent(processed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let scaled = processed.min(total).saturating_mul(100) / total;
    u8::try_from(scaled).unwrap_or(100)
}
