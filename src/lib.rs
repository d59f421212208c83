//! Facade crate for the parcel downloader.
//!
//! This crate re-exports the core domain types together with the HTTP parcel
//! source, the batch fetcher and the download job driver.

#![forbid(unsafe_code)]

pub use parcel_core::{
    BoundingBox, CanonicalGeometry, CredentialCheck, CredentialStore, Credentials, ErrorKind,
    FeatureSink, FetchPolicy, FetchReport, JobHost, JobSummary, ParcelFeature, ParcelId,
    ParcelSource, ProgressSink, SourceError, Termination,
};

pub use parcel_data::{
    FileCredentialStore, HttpParcelSource, HttpParcelSourceConfig, JobError, ProviderBuildError,
    fetch_details, run_download, validate_credentials,
};
