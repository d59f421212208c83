//! Core domain types for the parcel downloader.
//!
//! The crate models one download job: a [`BoundingBox`] is listed into
//! [`ParcelId`]s, each identifier is fetched into a [`DetailFetchOutcome`],
//! and accepted records become [`ParcelFeature`]s whose geometry has been
//! normalized into a [`CanonicalGeometry`]. The collaborators a job needs
//! ([`ParcelSource`], [`FeatureSink`], [`ProgressSink`], [`JobHost`] and
//! [`CredentialStore`]) are traits so that hosts and tests can supply their
//! own.
//!
//! Constructors validate their input and return `Result` so that invalid
//! regions or geometries are rejected at the edge.

pub mod credentials;
pub mod geometry;
mod host;
mod outcome;
mod parcel;
pub mod policy;
mod region;
mod report;
pub mod source;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use credentials::{
    CREDENTIAL_NAMESPACE, CredentialCheck, CredentialStore, CredentialStoreError, Credentials,
};
pub use geometry::{CanonicalGeometry, GeometryError, RawGeometry, normalize};
pub use host::{FeatureSink, JobHost, NoProgress, ProgressSink, SinkError, percent};
pub use outcome::{DetailFetchOutcome, ErrorKind, ParcelDetail};
pub use parcel::{Attributes, FieldValue, ParcelFeature, ParcelId};
pub use policy::{BatchJob, FetchPolicy};
pub use region::{BoundingBox, BoundingBoxError};
pub use report::{FailureSample, FailureSummary, FetchReport, JobSummary, Termination};
pub use source::{ParcelSource, SourceError};
