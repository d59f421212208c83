//! Access to the remote parcel service.
//!
//! [`ParcelSource`] covers the two endpoints the pipeline needs: the region
//! query that lists identifiers and the per-identifier detail lookup.
//! Failures are reported as [`SourceError`], which classifies itself into an
//! [`ErrorKind`](crate::ErrorKind) for budgeting.

mod error;
mod provider;

pub use error::SourceError;
pub use provider::ParcelSource;
