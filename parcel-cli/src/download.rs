//! `download` command: list a region, fetch every parcel, write GeoJSON.

use std::io::{self, Write};
use std::time::Duration;

use camino::Utf8PathBuf;
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use parcel_core::{
    BoundingBox, CredentialStore, Credentials, ErrorKind, FetchPolicy, JobHost, JobSummary,
    ParcelSource, Termination,
};
use parcel_data::{FileCredentialStore, run_download};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::credentials::{CredentialOverrides, build_source, credentials_file_or_default};
use crate::geojson::GeoJsonSink;
use crate::host::StreamHost;
use crate::{ARG_API_KEY, ARG_BBOX, ARG_BEARER_TOKEN, ARG_CREDENTIALS_FILE, ARG_OUTPUT};
use crate::{CliError, ENV_BBOX, ENV_DOWNLOAD_CREDENTIALS_FILE, ENV_OUTPUT};

/// CLI arguments for the `download` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "List every parcel inside a WGS84 bounding box, fetch the \
                 enriched record of each one in bounded batches and write them \
                 to a GeoJSON FeatureCollection. Options may also be set in \
                 configuration files or PARCELS_* environment variables.",
    about = "Download the parcels inside a bounding box"
)]
#[ortho_config(prefix = "PARCELS")]
pub(crate) struct DownloadArgs {
    /// Region as `min_lon,min_lat,max_lon,max_lat`.
    #[arg(long = ARG_BBOX, value_name = "bbox", allow_hyphen_values = true)]
    #[serde(default)]
    pub(crate) bbox: Option<String>,
    /// GeoJSON file to create.
    #[arg(long = ARG_OUTPUT, short = 'o', value_name = "path")]
    #[serde(default)]
    pub(crate) output: Option<Utf8PathBuf>,
    /// RapidAPI key; falls back to the stored value.
    #[arg(long = ARG_API_KEY, value_name = "key")]
    #[serde(default)]
    pub(crate) api_key: Option<String>,
    /// Bearer token; falls back to the stored value.
    #[arg(long = ARG_BEARER_TOKEN, value_name = "token")]
    #[serde(default)]
    pub(crate) bearer_token: Option<String>,
    /// Override the API base URL.
    #[arg(long = "base-url", value_name = "url")]
    #[serde(default)]
    pub(crate) base_url: Option<String>,
    /// Settings file holding stored credentials.
    #[arg(long = ARG_CREDENTIALS_FILE, value_name = "path")]
    #[serde(default)]
    pub(crate) credentials_file: Option<Utf8PathBuf>,
    /// Identifiers per batch; derived from the listing size when unset.
    #[arg(long = "batch-size", value_name = "count")]
    #[serde(default)]
    pub(crate) batch_size: Option<usize>,
    /// Failures tolerated before aborting; derived when unset.
    #[arg(long = "error-budget", value_name = "count")]
    #[serde(default)]
    pub(crate) error_budget: Option<usize>,
    /// Concurrent detail requests; derived from the batch size when unset.
    #[arg(long = "workers", value_name = "count")]
    #[serde(default)]
    pub(crate) workers: Option<usize>,
    /// Ceiling for one detail request, in seconds.
    #[arg(long = "request-timeout", value_name = "seconds")]
    #[serde(default)]
    pub(crate) request_timeout_secs: Option<u64>,
    /// Store the effective credentials after a successful listing.
    #[arg(
        long = "save-credentials",
        num_args = 0..=1,
        default_missing_value = "true",
        value_name = "bool"
    )]
    #[serde(default)]
    pub(crate) save_credentials: Option<bool>,
}

/// Validated `download` configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DownloadConfig {
    pub(crate) region: BoundingBox,
    pub(crate) output: Utf8PathBuf,
    pub(crate) overrides: CredentialOverrides,
    pub(crate) credentials_file: Utf8PathBuf,
    pub(crate) base_url: Option<String>,
    pub(crate) policy: FetchPolicy,
    pub(crate) save_credentials: bool,
}

impl DownloadArgs {
    pub(crate) fn into_config(self) -> Result<DownloadConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        DownloadConfig::try_from(merged)
    }
}

impl TryFrom<DownloadArgs> for DownloadConfig {
    type Error = CliError;

    fn try_from(args: DownloadArgs) -> Result<Self, Self::Error> {
        let input = args.bbox.ok_or(CliError::MissingArgument {
            field: ARG_BBOX,
            env: ENV_BBOX,
        })?;
        let region = input
            .parse::<BoundingBox>()
            .map_err(|source| CliError::InvalidBoundingBox { input, source })?;
        let output = args.output.ok_or(CliError::MissingArgument {
            field: ARG_OUTPUT,
            env: ENV_OUTPUT,
        })?;

        let mut policy = FetchPolicy::new();
        if let Some(size) = args.batch_size {
            policy = policy.with_batch_size(size);
        }
        if let Some(budget) = args.error_budget {
            policy = policy.with_error_budget(budget);
        }
        if let Some(workers) = args.workers {
            policy = policy.with_worker_limit(workers);
        }
        if let Some(secs) = args.request_timeout_secs.filter(|secs| *secs > 0) {
            policy = policy.with_request_timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            region,
            output,
            overrides: CredentialOverrides {
                api_key: args.api_key,
                bearer_token: args.bearer_token,
            },
            credentials_file: credentials_file_or_default(
                args.credentials_file,
                ENV_DOWNLOAD_CREDENTIALS_FILE,
            )?,
            base_url: args.base_url,
            policy,
            save_credentials: args.save_credentials.unwrap_or(false),
        })
    }
}

pub(super) async fn run_download_command(
    args: DownloadArgs,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    let config = args.into_config()?;
    let store = FileCredentialStore::new(config.credentials_file.clone());
    let credentials = config.overrides.resolve(&store)?;
    let source = build_source(config.base_url.as_deref(), credentials.clone())?;
    let host = StreamHost::new(io::stderr(), cancel.clone());

    let summary =
        download_and_remember(&config, &source, &store, &credentials, &host, cancel).await?;
    write_summary(&mut io::stdout().lock(), &summary).map_err(CliError::WriteStdout)?;
    finish_summary(summary)
}

/// Run the job and, when asked, store the credentials it ran with.
///
/// Credentials are saved once the listing succeeded, including for an empty
/// region. A listing failure, or a job stopped because the service rejected
/// the credentials, saves nothing.
pub(crate) async fn download_and_remember<S, H>(
    config: &DownloadConfig,
    source: &S,
    store: &dyn CredentialStore,
    credentials: &Credentials,
    host: &H,
    cancel: &CancellationToken,
) -> Result<JobSummary, CliError>
where
    S: ParcelSource + ?Sized,
    H: JobHost + ?Sized,
{
    let summary = download_with(config, source, host, cancel).await?;
    let rejected = matches!(
        summary.termination,
        Termination::Fatal {
            kind: Some(ErrorKind::Authentication),
            ..
        }
    );
    if config.save_credentials && !rejected {
        store.save(credentials)?;
        host.report_info(&format!("saved credentials to {}", config.credentials_file));
    }
    Ok(summary)
}

/// Run the job into the configured GeoJSON file.
///
/// The collection is closed even when the job stops early so that the file
/// stays valid.
pub(crate) async fn download_with<S, H>(
    config: &DownloadConfig,
    source: &S,
    host: &H,
    cancel: &CancellationToken,
) -> Result<JobSummary, CliError>
where
    S: ParcelSource + ?Sized,
    H: JobHost + ?Sized,
{
    let write_error = |source| CliError::WriteOutput {
        path: config.output.clone(),
        source,
    };
    let mut sink = GeoJsonSink::create(&config.output).map_err(write_error)?;
    let outcome = run_download(
        source,
        &config.region,
        &config.policy,
        &mut sink,
        host,
        cancel,
    )
    .await;
    sink.finish().map_err(write_error)?;
    Ok(outcome?)
}

/// Budget aborts and fatal failures become [`CliError::Aborted`].
pub(crate) fn finish_summary(summary: JobSummary) -> Result<(), CliError> {
    if summary.termination.is_error() {
        Err(CliError::Aborted(summary.termination))
    } else {
        Ok(())
    }
}

/// Print the summary line, per-kind counts and the sampled messages.
pub(crate) fn write_summary(writer: &mut dyn Write, summary: &JobSummary) -> io::Result<()> {
    writeln!(writer, "{summary}")?;
    for (kind, count) in summary.failures.counts() {
        writeln!(writer, "  {kind}: {count}")?;
    }
    for sample in summary.failures.samples() {
        writeln!(writer, "  - {} ({}): {}", sample.id, sample.kind, sample.message)?;
    }
    let suppressed = summary.failures.suppressed();
    if suppressed > 0 {
        writeln!(writer, "  ... and {suppressed} more")?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<DownloadConfig, CliError> {
    let merged = DownloadArgs::merge_from_layers(layers).map_err(CliError::from)?;
    DownloadConfig::try_from(merged)
}
