//! Unit tests for the `credentials` command and credential resolution.

use super::helpers::{Workspace, runtime};
use super::*;
use crate::credentials::{
    CredentialAction, CredentialOverrides, CredentialsConfig, config_from_layers_for_test, execute,
};
use ortho_config::MergeComposer;
use parcel_core::test_support::MemoryCredentialStore;
use parcel_core::{CredentialStore, Credentials};
use parcel_data::FileCredentialStore;
use parcel_data::test_support::{CannedResponse, CannedServer};
use rstest::{fixture, rstest};
use serde_json::json;

const KEY: &str = "rapid-key-0123456789";
const TOKEN: &str = "bearer-token-abcdefgh";

#[fixture]
fn workspace() -> Workspace {
    Workspace::new()
}

fn config(workspace: &Workspace, action: CredentialAction) -> CredentialsConfig {
    CredentialsConfig {
        action,
        overrides: CredentialOverrides::default(),
        base_url: None,
        credentials_file: workspace.credentials_file(),
    }
}

fn run(config: &CredentialsConfig) -> (Result<(), CliError>, String) {
    let mut buffer = Vec::new();
    let result = runtime().block_on(execute(config, &mut buffer));
    (result, String::from_utf8(buffer).expect("utf-8 output"))
}

fn overrides(api_key: Option<&str>, bearer_token: Option<&str>) -> CredentialOverrides {
    CredentialOverrides {
        api_key: api_key.map(str::to_owned),
        bearer_token: bearer_token.map(str::to_owned),
    }
}

#[rstest]
fn save_show_and_clear_round_trip(workspace: Workspace) {
    let save = CredentialsConfig {
        overrides: overrides(Some(KEY), Some(TOKEN)),
        ..config(&workspace, CredentialAction::Save)
    };
    let (result, output) = run(&save);
    result.expect("save succeeds");
    assert!(output.starts_with("saved api key rapid-ke...6789"));
    assert!(!output.contains(KEY));

    let (result, output) = run(&config(&workspace, CredentialAction::Show));
    result.expect("show succeeds");
    assert_eq!(
        output,
        "api key rapid-ke...6789, bearer token bearer-t...efgh\n"
    );

    let (result, _) = run(&config(&workspace, CredentialAction::Clear));
    result.expect("clear succeeds");
    let (result, output) = run(&config(&workspace, CredentialAction::Show));
    result.expect("show succeeds");
    assert!(output.starts_with("no credentials stored"));
}

#[rstest]
fn save_requires_both_secrets(workspace: Workspace) {
    let save = CredentialsConfig {
        overrides: overrides(Some(KEY), None),
        ..config(&workspace, CredentialAction::Save)
    };
    let (result, _) = run(&save);
    match result {
        Err(CliError::MissingArgument { field, env }) => {
            assert_eq!(field, ARG_BEARER_TOKEN);
            assert_eq!(env, ENV_CREDENTIALS_BEARER_TOKEN);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
    let store = FileCredentialStore::new(workspace.credentials_file());
    assert_eq!(store.load().expect("load"), None);
}

#[rstest]
#[case::both_explicit(Some("cli-key-000000"), Some("cli-token-0000"), "cli-key-000000", "cli-token-0000")]
#[case::key_only(Some("cli-key-000000"), None, "cli-key-000000", TOKEN)]
#[case::token_only(None, Some("cli-token-0000"), KEY, "cli-token-0000")]
#[case::blank_falls_back(Some("  "), None, KEY, TOKEN)]
fn explicit_values_override_stored_ones_field_by_field(
    #[case] api_key: Option<&str>,
    #[case] bearer_token: Option<&str>,
    #[case] expected_key: &str,
    #[case] expected_token: &str,
) {
    let store = MemoryCredentialStore::with_credentials(Credentials::new(KEY, TOKEN));
    let resolved = overrides(api_key, bearer_token)
        .resolve(&store)
        .expect("credentials resolve");
    assert_eq!(resolved.api_key(), expected_key);
    assert_eq!(resolved.bearer_token(), expected_token);
}

#[rstest]
fn resolution_without_any_source_fails() {
    let store = MemoryCredentialStore::default();
    let err = overrides(Some("cli-key-000000"), None)
        .resolve(&store)
        .expect_err("token is missing everywhere");
    assert!(matches!(err, CliError::MissingCredentials));
}

#[rstest]
fn check_reports_valid_credentials(workspace: Workspace) {
    let server = CannedServer::spawn(vec![CannedResponse::json(
        200,
        r#"{"success": true, "data": ["A1", "A2"]}"#,
    )])
    .expect("spawn server");
    let check = CredentialsConfig {
        overrides: overrides(Some(KEY), Some(TOKEN)),
        base_url: Some(server.base_url().to_owned()),
        ..config(&workspace, CredentialAction::Check)
    };

    let (result, output) = run(&check);
    result.expect("valid credentials");
    assert_eq!(output, "credentials are valid (2 parcels in test area)\n");
    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].header("x-rapidapi-key"), Some(KEY));
}

#[rstest]
fn check_fails_on_rejected_credentials(workspace: Workspace) {
    let server = CannedServer::spawn(vec![CannedResponse::json(
        401,
        r#"{"message": "Invalid API key"}"#,
    )])
    .expect("spawn server");
    let check = CredentialsConfig {
        overrides: overrides(Some(KEY), Some(TOKEN)),
        base_url: Some(server.base_url().to_owned()),
        ..config(&workspace, CredentialAction::Check)
    };

    let (result, output) = run(&check);
    assert_eq!(output, "Invalid credentials\n");
    match result {
        Err(CliError::CredentialCheck { message }) => assert_eq!(message, "Invalid credentials"),
        other => panic!("expected CredentialCheck, found {other:?}"),
    }
}

#[rstest]
fn action_is_required() {
    let mut composer = MergeComposer::new();
    composer.push_cli(json!({ "credentials_file": "credentials.json" }));
    let err = config_from_layers_for_test(composer.layers()).expect_err("action is missing");
    match err {
        CliError::MissingArgument { field, env } => {
            assert_eq!(field, "action");
            assert_eq!(env, ENV_CREDENTIALS_ACTION);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn action_is_read_from_configuration_layers() {
    let mut composer = MergeComposer::new();
    composer.push_file(
        json!({ "action": "show", "credentials_file": "from-file.json" }),
        None,
    );
    composer.push_environment(json!({ "credentials_file": "from-env.json" }));
    let config = config_from_layers_for_test(composer.layers()).expect("config should build");
    assert_eq!(config.action, CredentialAction::Show);
    assert_eq!(config.credentials_file.as_str(), "from-env.json");
}
