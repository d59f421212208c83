//! Focused unit tests covering download configuration and execution.

use super::helpers::{Workspace, read_json, runtime};
use super::*;
use camino::Utf8PathBuf;
use crate::download::{
    DownloadArgs, DownloadConfig, config_from_layers_for_test, download_and_remember,
    download_with, finish_summary, write_summary,
};
use ortho_config::MergeComposer;
use parcel_core::test_support::{
    HostEvent, MemoryCredentialStore, RecordingHost, numbered_ids, square_detail,
};
use parcel_core::{
    BoundingBoxError, CredentialStore, Credentials, ErrorKind, FailureSummary, JobSummary, ParcelId, SourceError, Termination,
};
use parcel_data::test_support::{StubParcelSource, StubReply};
use rstest::{fixture, rstest};
use serde_json::json;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[fixture]
fn workspace() -> Workspace {
    Workspace::new()
}

fn args_for(workspace: &Workspace) -> DownloadArgs {
    DownloadArgs {
        bbox: Some("11.0,45.0,11.01,45.01".to_owned()),
        output: Some(workspace.output()),
        credentials_file: Some(workspace.credentials_file()),
        ..DownloadArgs::default()
    }
}

fn config_for(workspace: &Workspace) -> DownloadConfig {
    DownloadConfig::try_from(args_for(workspace)).expect("config should build")
}

fn service_error(message: &str) -> SourceError {
    SourceError::Service {
        url: "stub://detail".to_owned(),
        status: Some(500),
        message: message.to_owned(),
    }
}

#[rstest]
#[case::bbox(None, Some("out.geojson"), ARG_BBOX, ENV_BBOX)]
#[case::output(Some("11,45,12,46"), None, ARG_OUTPUT, ENV_OUTPUT)]
fn converting_without_required_fields_errors(
    #[case] bbox: Option<&str>,
    #[case] output: Option<&str>,
    #[case] field: &'static str,
    #[case] env_var: &'static str,
) {
    let args = DownloadArgs {
        bbox: bbox.map(str::to_owned),
        output: output.map(Utf8PathBuf::from),
        credentials_file: Some(Utf8PathBuf::from("credentials.json")),
        ..DownloadArgs::default()
    };
    let err = DownloadConfig::try_from(args).expect_err("missing field should error");
    match err {
        CliError::MissingArgument {
            field: missing,
            env,
        } => {
            assert_eq!(missing, field);
            assert_eq!(env, env_var);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn rejects_an_inverted_bounding_box(workspace: Workspace) {
    let args = DownloadArgs {
        bbox: Some("12,45,11,46".to_owned()),
        ..args_for(&workspace)
    };
    let err = DownloadConfig::try_from(args).expect_err("inverted bbox should error");
    match err {
        CliError::InvalidBoundingBox { input, source } => {
            assert_eq!(input, "12,45,11,46");
            assert!(matches!(source, BoundingBoxError::Inverted { .. }));
        }
        other => panic!("expected InvalidBoundingBox, found {other:?}"),
    }
}

#[rstest]
fn policy_overrides_reach_the_batch_plan(workspace: Workspace) {
    let args = DownloadArgs {
        batch_size: Some(3),
        error_budget: Some(1),
        workers: Some(2),
        request_timeout_secs: Some(5),
        ..args_for(&workspace)
    };
    let config = DownloadConfig::try_from(args).expect("config should build");
    let job = config.policy.plan(numbered_ids(7));
    assert_eq!(job.batch_size(), 3);
    assert_eq!(job.batch_count(), 3);
    assert_eq!(job.error_budget(), 1);
    assert_eq!(job.worker_limit(), 2);
    assert_eq!(job.request_timeout(), Duration::from_secs(5));
    assert!(!config.save_credentials);
}

#[rstest]
fn merge_layers_honours_precedence(workspace: Workspace) {
    let mut composer = MergeComposer::new();
    composer.push_file(
        json!({
            "bbox": "11.0,45.0,11.5,45.5",
            "output": workspace.path("from-file.geojson").as_str(),
            "credentials_file": workspace.credentials_file().as_str(),
            "batch_size": 5,
            "error_budget": 2,
        }),
        None,
    );
    composer.push_environment(json!({
        "output": workspace.path("from-env.geojson").as_str(),
        "batch_size": 7,
    }));
    composer.push_cli(json!({
        "batch_size": 9,
        "save_credentials": true,
    }));

    let config =
        config_from_layers_for_test(composer.layers()).expect("merged config should build");
    assert_eq!(config.region.to_string(), "11,45,11.5,45.5");
    assert_eq!(config.output, workspace.path("from-env.geojson"));
    assert_eq!(config.credentials_file, workspace.credentials_file());
    let job = config.policy.plan(numbered_ids(30));
    assert_eq!(job.batch_size(), 9);
    assert_eq!(job.error_budget(), 2);
    assert!(config.save_credentials);
}

#[rstest]
fn invalid_layer_maps_to_configuration_error() {
    let mut composer = MergeComposer::new();
    composer.push_cli(json!({ "batch_size": "many" }));

    let err = config_from_layers_for_test(composer.layers())
        .expect_err("invalid config layer should map to CliError::Configuration");
    match err {
        CliError::Configuration(_) => {}
        other => panic!("expected CliError::Configuration, found {other:?}"),
    }
}

#[rstest]
fn parses_negative_coordinates_and_bare_save_flag() {
    let cli = Cli::try_parse_from([
        "parcels",
        "download",
        "--bbox",
        "-3.7,40.4,-3.6,40.5",
        "-o",
        "out.geojson",
        "--save-credentials",
    ])
    .expect("arguments parse");
    match cli.command {
        Command::Download(args) => {
            assert_eq!(args.bbox.as_deref(), Some("-3.7,40.4,-3.6,40.5"));
            assert_eq!(args.output, Some(Utf8PathBuf::from("out.geojson")));
            assert_eq!(args.save_credentials, Some(true));
        }
        Command::Credentials(_) => panic!("expected download command"),
    }
}

#[rstest]
fn download_writes_every_parcel_as_geojson(workspace: Workspace) {
    let config = config_for(&workspace);
    let source = StubParcelSource::new(
        numbered_ids(3),
        StubReply::Detail(square_detail("Verona")),
    );
    let host = RecordingHost::default();
    let cancel = CancellationToken::new();

    let summary = runtime()
        .block_on(download_with(&config, &source, &host, &cancel))
        .expect("download succeeds");

    assert_eq!(summary.found, 3);
    assert_eq!(summary.materialized, 3);
    assert_eq!(summary.termination, Termination::Completed);
    assert_eq!(host.progress().last(), Some(&100));

    let document = read_json(&config.output);
    let features = document["features"].as_array().expect("features array");
    assert_eq!(features.len(), 3);
    assert!(
        features
            .iter()
            .all(|feature| feature["properties"]["name"] == "Verona")
    );
    finish_summary(summary).expect("completed job is not an error");
}

#[rstest]
fn budget_abort_keeps_the_output_valid(workspace: Workspace) {
    let config = DownloadConfig {
        policy: parcel_core::FetchPolicy::new()
            .with_batch_size(2)
            .with_error_budget(1),
        ..config_for(&workspace)
    };
    let source = StubParcelSource::new(
        numbered_ids(3),
        StubReply::Error(service_error("boom")),
    )
    .with_reply("1", StubReply::Detail(square_detail("ok")));
    let host = RecordingHost::default();
    let cancel = CancellationToken::new();

    let summary = runtime()
        .block_on(download_with(&config, &source, &host, &cancel))
        .expect("listing succeeds");

    assert_eq!(summary.materialized, 1);
    assert_eq!(
        summary.termination,
        Termination::BudgetExceeded {
            failures: 2,
            budget: 1
        }
    );
    let document = read_json(&config.output);
    assert_eq!(document["features"].as_array().map(Vec::len), Some(1));

    match finish_summary(summary) {
        Err(CliError::Aborted(Termination::BudgetExceeded { .. })) => {}
        other => panic!("expected budget abort, found {other:?}"),
    }
}

#[rstest]
fn listing_failure_is_a_job_error(workspace: Workspace) {
    let config = config_for(&workspace);
    let source = StubParcelSource::failing_listing(SourceError::Timeout {
        url: "stub://list".to_owned(),
    });
    let host = RecordingHost::default();
    let cancel = CancellationToken::new();

    let err = runtime()
        .block_on(download_with(&config, &source, &host, &cancel))
        .expect_err("listing failure should surface");
    assert!(matches!(err, CliError::Job(_)), "unexpected error {err:?}");
    assert_eq!(source.detail_calls(), Vec::<ParcelId>::new());

    let document = read_json(&config.output);
    assert_eq!(document["features"], json!([]));
}

fn saving_config(workspace: &Workspace) -> DownloadConfig {
    DownloadConfig {
        save_credentials: true,
        ..config_for(workspace)
    }
}

#[rstest]
fn empty_region_still_saves_accepted_credentials(workspace: Workspace) {
    let config = saving_config(&workspace);
    let source = StubParcelSource::new(Vec::new(), StubReply::Detail(square_detail("unused")));
    let store = MemoryCredentialStore::default();
    let credentials = Credentials::new("rapid-key-0123456789", "bearer-token-abcdefgh");
    let host = RecordingHost::default();
    let cancel = CancellationToken::new();

    let summary = runtime()
        .block_on(download_and_remember(
            &config,
            &source,
            &store,
            &credentials,
            &host,
            &cancel,
        ))
        .expect("empty download succeeds");
    assert_eq!(summary.found, 0);
    assert_eq!(store.load().expect("load"), Some(credentials));
    let saved = format!("saved credentials to {}", config.credentials_file);
    assert!(host.events().contains(&HostEvent::Info(saved)));
}

#[rstest]
fn failed_listing_saves_nothing(workspace: Workspace) {
    let config = saving_config(&workspace);
    let source = StubParcelSource::failing_listing(SourceError::Timeout {
        url: "stub://list".to_owned(),
    });
    let store = MemoryCredentialStore::default();
    let credentials = Credentials::new("rapid-key-0123456789", "bearer-token-abcdefgh");
    let host = RecordingHost::default();
    let cancel = CancellationToken::new();

    let err = runtime()
        .block_on(download_and_remember(
            &config,
            &source,
            &store,
            &credentials,
            &host,
            &cancel,
        ))
        .expect_err("listing failure should surface");
    assert!(matches!(err, CliError::Job(_)), "unexpected error {err:?}");
    assert_eq!(store.load().expect("load"), None);
}

#[rstest]
fn rejected_credentials_are_not_saved(workspace: Workspace) {
    let config = saving_config(&workspace);
    let rejection = StubReply::Error(SourceError::Authentication {
        url: "stub://detail".to_owned(),
        status: 401,
        message: "Invalid API key".to_owned(),
    });
    let source = StubParcelSource::new(numbered_ids(2), rejection);
    let store = MemoryCredentialStore::default();
    let credentials = Credentials::new("rapid-key-0123456789", "bearer-token-abcdefgh");
    let host = RecordingHost::default();
    let cancel = CancellationToken::new();

    let summary = runtime()
        .block_on(download_and_remember(
            &config,
            &source,
            &store,
            &credentials,
            &host,
            &cancel,
        ))
        .expect("job runs to its fatal stop");
    assert!(summary.termination.is_error());
    assert_eq!(store.load().expect("load"), None);
}

#[rstest]
fn summary_lists_counts_samples_and_suppressed_messages() {
    let mut failures = FailureSummary::with_sample_cap(1);
    failures.record(&ParcelId::from("2"), ErrorKind::Timeout, "timed out");
    failures.record(&ParcelId::from("3"), ErrorKind::Timeout, "timed out");
    failures.record(&ParcelId::from("4"), ErrorKind::Service, "HTTP 500");
    let summary = JobSummary {
        found: 4,
        attempted: 4,
        materialized: 1,
        failed: 3,
        batches: 1,
        termination: Termination::Completed,
        failures,
    };

    let mut buffer = Vec::new();
    write_summary(&mut buffer, &summary).expect("write summary");
    let text = String::from_utf8(buffer).expect("utf-8 summary");

    assert!(text.starts_with("found 4 parcels, loaded 1, failed 3"));
    assert!(text.contains("  timeout: 2\n"));
    assert!(text.contains("  service: 1\n"));
    assert!(text.contains("  - 2 (timeout): timed out\n"));
    assert!(text.contains("  ... and 2 more\n"));
}
