//! Error types emitted by the parcel CLI.
//!
//! Keep this error type reasonably small, as many CLI helpers return
//! `Result<_, CliError>` and the workspace enables `clippy::result_large_err`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use parcel_core::{BoundingBoxError, CredentialStoreError, Termination};
use parcel_data::{JobError, ProviderBuildError};
use thiserror::Error;

/// Errors emitted by the parcel CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// The bounding box did not parse or validate.
    #[error("invalid bounding box {input:?}: {source}")]
    InvalidBoundingBox {
        input: String,
        #[source]
        source: BoundingBoxError,
    },
    /// No usable credentials were given or stored.
    #[error("no API credentials: pass --api-key and --bearer-token or save them first")]
    MissingCredentials,
    /// Reading or writing the credential file failed.
    #[error(transparent)]
    CredentialStore(#[from] CredentialStoreError),
    /// Constructing the HTTP parcel source failed.
    #[error("failed to build parcel source for {base_url:?}: {source}")]
    BuildParcelSource {
        base_url: String,
        #[source]
        source: ProviderBuildError,
    },
    /// Creating or writing the GeoJSON output failed.
    #[error("failed to write GeoJSON output {path:?}: {source}")]
    WriteOutput {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Listing the region failed.
    #[error(transparent)]
    Job(#[from] JobError),
    /// The download stopped before every parcel was attempted.
    #[error("download {0}")]
    Aborted(Termination),
    /// The credential check did not confirm the credentials.
    #[error("credential check failed: {message}")]
    CredentialCheck { message: String },
    /// Writing to standard output failed.
    #[error("failed to write output: {0}")]
    WriteStdout(#[source] std::io::Error),
    /// Another logger was already installed.
    #[error("failed to install the logger: {0}")]
    Logger(#[from] log::SetLoggerError),
}
