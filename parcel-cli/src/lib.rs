//! Command-line interface for downloading cadastral parcels.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};
use env_logger::{Builder, Env};
use tokio_util::sync::CancellationToken;

mod credentials;
mod download;
mod error;
mod geojson;
mod host;

pub use error::CliError;

use credentials::CredentialsArgs;
use download::DownloadArgs;

const ARG_BBOX: &str = "bbox";
const ARG_OUTPUT: &str = "output";
const ARG_API_KEY: &str = "api-key";
const ARG_BEARER_TOKEN: &str = "bearer-token";
const ARG_CREDENTIALS_FILE: &str = "credentials-file";
const ENV_BBOX: &str = "PARCELS_CMDS_DOWNLOAD_BBOX";
const ENV_OUTPUT: &str = "PARCELS_CMDS_DOWNLOAD_OUTPUT";
const ENV_DOWNLOAD_CREDENTIALS_FILE: &str = "PARCELS_CMDS_DOWNLOAD_CREDENTIALS_FILE";
const ENV_CREDENTIALS_ACTION: &str = "PARCELS_CMDS_CREDENTIALS_ACTION";
const ENV_CREDENTIALS_API_KEY: &str = "PARCELS_CMDS_CREDENTIALS_API_KEY";
const ENV_CREDENTIALS_BEARER_TOKEN: &str = "PARCELS_CMDS_CREDENTIALS_BEARER_TOKEN";
const ENV_CREDENTIALS_FILE: &str = "PARCELS_CMDS_CREDENTIALS_CREDENTIALS_FILE";

/// Run the parcel CLI with the current process arguments and environment.
///
/// Diagnostics go to standard error through `env_logger`. `RUST_LOG`
/// selects the filter; without it, `--verbose` shows debug output and the
/// default shows warnings only. Ctrl-C cancels a running download; parcels
/// already written are kept.
///
/// # Errors
///
/// Returns [`CliError`] when arguments or configuration are invalid, when
/// the download cannot start or is aborted, or when output cannot be written.
pub async fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    logger(Env::default(), cli.verbose).try_init()?;
    match cli.command {
        Command::Download(args) => {
            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_interrupt.cancel();
                }
            });
            download::run_download_command(args, &cancel).await
        }
        Command::Credentials(args) => credentials::run_credentials_command(args).await,
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "parcels",
    about = "Download enriched cadastral parcels for Italy as GeoJSON",
    version
)]
struct Cli {
    /// Show debug diagnostics unless `RUST_LOG` says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

/// Logger reading its filter from `env`, falling back to the verbosity flag.
fn logger(env: Env<'_>, verbose: bool) -> Builder {
    let fallback = if verbose { "debug" } else { "warn" };
    Builder::from_env(env.default_filter_or(fallback))
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch every parcel inside a bounding box.
    Download(DownloadArgs),
    /// Manage the stored API credentials.
    Credentials(CredentialsArgs),
}

#[cfg(test)]
mod tests;
