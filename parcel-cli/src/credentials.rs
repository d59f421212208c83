//! `credentials` command and the credential resolution shared with `download`.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::{Parser, ValueEnum};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use parcel_core::{CredentialCheck, CredentialStore, Credentials};
use parcel_data::http::{DEFAULT_BASE_URL, HttpParcelSource, HttpParcelSourceConfig};
use parcel_data::{FileCredentialStore, validate_credentials};
use serde::{Deserialize, Serialize};

use crate::{ARG_API_KEY, ARG_BEARER_TOKEN, ARG_CREDENTIALS_FILE, CliError};
use crate::{
    ENV_CREDENTIALS_ACTION, ENV_CREDENTIALS_API_KEY, ENV_CREDENTIALS_BEARER_TOKEN,
    ENV_CREDENTIALS_FILE,
};

const CREDENTIALS_DIR: &str = "parcel-downloader";
const CREDENTIALS_FILE: &str = "credentials.json";

/// What to do with the stored credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum CredentialAction {
    /// Store the given API key and bearer token.
    Save,
    /// Remove stored credentials.
    Clear,
    /// Print the stored credentials in masked form.
    Show,
    /// Test the effective credentials against the service.
    Check,
}

/// CLI arguments for the `credentials` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Save, clear, show or check the RapidAPI key and bearer \
                 token. Secrets are kept obfuscated in a JSON settings file.",
    about = "Manage stored API credentials"
)]
#[ortho_config(prefix = "PARCELS")]
pub(crate) struct CredentialsArgs {
    /// Action to perform.
    #[arg(value_enum, value_name = "action")]
    #[serde(default)]
    pub(crate) action: Option<CredentialAction>,
    /// RapidAPI key.
    #[arg(long = ARG_API_KEY, value_name = "key")]
    #[serde(default)]
    pub(crate) api_key: Option<String>,
    /// Bearer token sent in the `Authorization` header.
    #[arg(long = ARG_BEARER_TOKEN, value_name = "token")]
    #[serde(default)]
    pub(crate) bearer_token: Option<String>,
    /// Override the API base URL.
    #[arg(long = "base-url", value_name = "url")]
    #[serde(default)]
    pub(crate) base_url: Option<String>,
    /// Settings file holding the stored credentials.
    #[arg(long = ARG_CREDENTIALS_FILE, value_name = "path")]
    #[serde(default)]
    pub(crate) credentials_file: Option<Utf8PathBuf>,
}

/// Credentials given on the command line, in the environment or in config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct CredentialOverrides {
    pub(crate) api_key: Option<String>,
    pub(crate) bearer_token: Option<String>,
}

impl CredentialOverrides {
    /// Explicit values win field by field; the store fills the gaps.
    pub(crate) fn resolve(&self, store: &dyn CredentialStore) -> Result<Credentials, CliError> {
        let explicit = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .map(str::to_owned)
        };
        let (api_key, bearer_token) = (explicit(&self.api_key), explicit(&self.bearer_token));
        let credentials = match (api_key, bearer_token) {
            (Some(api_key), Some(bearer_token)) => Credentials::new(api_key, bearer_token),
            (api_key, bearer_token) => {
                let stored = store.load()?.ok_or(CliError::MissingCredentials)?;
                Credentials::new(
                    api_key.unwrap_or_else(|| stored.api_key().to_owned()),
                    bearer_token.unwrap_or_else(|| stored.bearer_token().to_owned()),
                )
            }
        };
        if credentials.is_complete() {
            Ok(credentials)
        } else {
            Err(CliError::MissingCredentials)
        }
    }
}

/// Default settings file under the user's configuration directory.
pub(crate) fn default_credentials_file() -> Option<Utf8PathBuf> {
    let base = std::env::var("XDG_CONFIG_HOME")
        .ok()
        .filter(|dir| !dir.is_empty())
        .map(Utf8PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .filter(|dir| !dir.is_empty())
                .map(|home| Utf8PathBuf::from(home).join(".config"))
        })?;
    Some(base.join(CREDENTIALS_DIR).join(CREDENTIALS_FILE))
}

pub(crate) fn credentials_file_or_default(
    path: Option<Utf8PathBuf>,
    env: &'static str,
) -> Result<Utf8PathBuf, CliError> {
    path.or_else(default_credentials_file)
        .ok_or(CliError::MissingArgument {
            field: ARG_CREDENTIALS_FILE,
            env,
        })
}

/// Build the HTTP source for `base_url` (or the public service).
pub(crate) fn build_source(
    base_url: Option<&str>,
    credentials: Credentials,
) -> Result<HttpParcelSource, CliError> {
    let base_url = base_url.unwrap_or(DEFAULT_BASE_URL);
    let config = HttpParcelSourceConfig::new(credentials).with_base_url(base_url);
    HttpParcelSource::with_config(config).map_err(|source| CliError::BuildParcelSource {
        base_url: base_url.to_owned(),
        source,
    })
}

/// Resolved `credentials` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CredentialsConfig {
    pub(crate) action: CredentialAction,
    pub(crate) overrides: CredentialOverrides,
    pub(crate) base_url: Option<String>,
    pub(crate) credentials_file: Utf8PathBuf,
}

impl CredentialsArgs {
    pub(crate) fn into_config(self) -> Result<CredentialsConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        CredentialsConfig::try_from(merged)
    }
}

impl TryFrom<CredentialsArgs> for CredentialsConfig {
    type Error = CliError;

    fn try_from(args: CredentialsArgs) -> Result<Self, Self::Error> {
        let action = args.action.ok_or(CliError::MissingArgument {
            field: "action",
            env: ENV_CREDENTIALS_ACTION,
        })?;
        Ok(Self {
            action,
            overrides: CredentialOverrides {
                api_key: args.api_key,
                bearer_token: args.bearer_token,
            },
            base_url: args.base_url,
            credentials_file: credentials_file_or_default(
                args.credentials_file,
                ENV_CREDENTIALS_FILE,
            )?,
        })
    }
}

pub(super) async fn run_credentials_command(args: CredentialsArgs) -> Result<(), CliError> {
    let config = args.into_config()?;
    execute(&config, &mut std::io::stdout().lock()).await
}

/// Perform the configured action, writing its result to `writer`.
pub(crate) async fn execute(
    config: &CredentialsConfig,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let store = FileCredentialStore::new(config.credentials_file.clone());
    let overrides = &config.overrides;
    let message = match config.action {
        CredentialAction::Save => {
            let (Some(api_key), Some(bearer_token)) = (&overrides.api_key, &overrides.bearer_token)
            else {
                return Err(if overrides.api_key.is_none() {
                    CliError::MissingArgument {
                        field: ARG_API_KEY,
                        env: ENV_CREDENTIALS_API_KEY,
                    }
                } else {
                    CliError::MissingArgument {
                        field: ARG_BEARER_TOKEN,
                        env: ENV_CREDENTIALS_BEARER_TOKEN,
                    }
                });
            };
            let credentials = Credentials::new(api_key.trim(), bearer_token.trim());
            if !credentials.is_complete() {
                return Err(CliError::MissingCredentials);
            }
            store.save(&credentials)?;
            format!("saved {credentials} to {}", store.path())
        }
        CredentialAction::Clear => {
            store.clear()?;
            format!("cleared credentials in {}", store.path())
        }
        CredentialAction::Show => store.load()?.map_or_else(
            || format!("no credentials stored in {}", store.path()),
            |credentials| credentials.to_string(),
        ),
        CredentialAction::Check => {
            let credentials = overrides.resolve(&store)?;
            let source = build_source(config.base_url.as_deref(), credentials)?;
            let check = validate_credentials(&source).await;
            return report_check(writer, &check);
        }
    };
    writeln!(writer, "{message}").map_err(CliError::WriteStdout)
}

/// Print the check verdict; anything but `Valid` is an error.
pub(crate) fn report_check(writer: &mut dyn Write, check: &CredentialCheck) -> Result<(), CliError> {
    writeln!(writer, "{check}").map_err(CliError::WriteStdout)?;
    match check {
        CredentialCheck::Valid { .. } => Ok(()),
        CredentialCheck::Invalid { message } | CredentialCheck::RateLimited { message } => {
            Err(CliError::CredentialCheck {
                message: message.clone(),
            })
        }
    }
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<CredentialsConfig, CliError> {
    let merged = CredentialsArgs::merge_from_layers(layers).map_err(CliError::from)?;
    CredentialsConfig::try_from(merged)
}
