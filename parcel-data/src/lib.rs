//! Data access and job orchestration for the parcel downloader.
//!
//! Responsibilities:
//! - Talk to the cadastral parcel API over HTTP ([`http`], [`api`]).
//! - Fetch parcel details in bounded batches ([`fetch`]).
//! - Run a whole download job against a host ([`job`]).
//! - Persist and verify API credentials ([`credentials`]).
//!
//! Boundaries:
//! - Do not encode domain rules (live in `parcel-core`).
//! - Keep blocking I/O off async executors; prefer async-capable clients.
//!
//! Invariants:
//! - Only the coordinating task mutates job counters.
//! - No global mutable state.

pub mod api;
pub mod credentials;
pub mod fetch;
pub mod http;
pub mod job;

#[doc(hidden)]
pub mod test_support;

pub use credentials::{FileCredentialStore, validate_credentials};
pub use fetch::{fetch_details, fetch_job};
pub use http::{HttpParcelSource, HttpParcelSourceConfig, ProviderBuildError};
pub use job::{JobError, run_download};
