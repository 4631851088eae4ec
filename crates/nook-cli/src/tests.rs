use std::collections::HashMap;
use std::time::Duration;

use chrono::NaiveDate;
use clap::Parser;
use nook_core::db::LocalStore;
use nook_core::models::Recurrence;
use nook_core::{SyncResult, Task};
use pretty_assertions::assert_eq;

use crate::cli::{Cli, Commands};
use crate::commands::common::{
    build_remote, format_sync_timestamp, normalize_identifier, open_local, redact,
    sync_outcome_line,
};
use crate::commands::config::{format_config_lines, redacted_json, run_config_init};
use crate::commands::generate::{format_instance_lines, run_generate};
use crate::commands::status::{format_status_lines, CollectionCount, StatusReport};
use crate::commands::sync::{run_sync, SyncDirection};
use crate::config::CliConfig;
use crate::error::CliError;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map = pairs
        .iter()
        .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
        .collect::<HashMap<_, _>>();
    move |key| map.get(key).cloned()
}

fn remote_config() -> CliConfig {
    CliConfig {
        firestore_project_id: Some("nook-test".to_string()),
        id_token: Some("token-123456".to_string()),
        ..CliConfig::default()
    }
}

#[test]
fn parses_generate_arguments() {
    let cli = Cli::try_parse_from(["nook", "generate", "--date", "2024-05-14", "--dry-run"]).unwrap();
    match cli.command {
        Commands::Generate {
            date,
            collection,
            dry_run,
            json,
        } => {
            assert_eq!(date, NaiveDate::from_ymd_opt(2024, 5, 14));
            assert_eq!(collection, "tasks");
            assert!(dry_run);
            assert!(!json);
        }
        _ => panic!("expected generate"),
    }
}

#[test]
fn rejects_malformed_generate_date() {
    assert!(Cli::try_parse_from(["nook", "generate", "--date", "14/05/2024"]).is_err());
}

#[test]
fn global_db_path_is_accepted_after_subcommand() {
    let cli = Cli::try_parse_from(["nook", "status", "--db-path", "/tmp/nook.db"]).unwrap();
    assert_eq!(cli.db_path.unwrap().to_str(), Some("/tmp/nook.db"));
}

#[test]
fn env_overrides_replace_file_values() {
    let mut config = CliConfig {
        principal: Some("from-file".to_string()),
        sync_interval_secs: Some(60),
        ..CliConfig::default()
    };

    config.apply_overrides(env(&[
        ("NOOK_PRINCIPAL", " user-42 "),
        ("NOOK_COLLECTIONS", "tasks, moods,,tasks"),
        ("NOOK_SYNC_INTERVAL_SECS", "120"),
        ("NOOK_HTTP_TIMEOUT_SECS", "soon"),
    ]));

    assert_eq!(config.principal.as_deref(), Some("user-42"));
    assert_eq!(config.collections, vec!["tasks", "moods"]);
    assert_eq!(config.sync_interval(), Duration::from_secs(120));
    assert_eq!(config.http_timeout(), Duration::from_secs(30));
}

#[test]
fn blank_env_values_do_not_clear_config() {
    let mut config = remote_config();
    config.apply_overrides(env(&[("NOOK_ID_TOKEN", "   ")]));
    assert_eq!(config.id_token.as_deref(), Some("token-123456"));
}

#[test]
fn config_file_roundtrip_normalizes_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("cli-config.json");
    let config = CliConfig {
        firestore_project_id: Some("  nook-test ".to_string()),
        principal: Some(String::new()),
        collections: vec!["moods".to_string(), " ".to_string()],
        ..CliConfig::default()
    };

    config.save_to_path(&path).unwrap();
    let loaded = CliConfig::load_from_path(&path).unwrap();

    assert_eq!(loaded.firestore_project_id.as_deref(), Some("nook-test"));
    assert_eq!(loaded.principal, None);
    assert_eq!(loaded.collections, vec!["moods"]);
}

#[test]
fn missing_config_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let loaded = CliConfig::load_from_path(&dir.path().join("absent.json")).unwrap();
    assert_eq!(loaded, CliConfig::default());
    assert_eq!(loaded.sync_settings().collections.len(), 6);
}

#[test]
fn malformed_config_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cli-config.json");
    std::fs::write(&path, "{ not json").unwrap();

    let error = CliConfig::load_from_path(&path).unwrap_err();
    assert!(matches!(error, CliError::Config(message) if message.contains("Failed to parse")));
}

#[test]
fn validate_rejects_zero_intervals_and_bad_urls() {
    let zero = CliConfig {
        sync_interval_secs: Some(0),
        ..CliConfig::default()
    };
    assert!(zero.validate().is_err());

    let bad_url = CliConfig {
        firestore_base_url: Some("localhost:8080".to_string()),
        ..CliConfig::default()
    };
    assert!(bad_url.validate().is_err());
    assert!(remote_config().validate().is_ok());
}

#[test]
fn debug_output_hides_secrets() {
    let config = CliConfig {
        firestore_api_key: Some("api-secret".to_string()),
        ..remote_config()
    };
    let rendered = format!("{config:?}");
    assert!(!rendered.contains("token-123456"));
    assert!(!rendered.contains("api-secret"));

    let json = redacted_json(&config).to_string();
    assert!(!json.contains("token-123456"));
    assert!(format_config_lines(&config)
        .iter()
        .any(|line| line.contains("****3456")));
}

#[test]
fn redact_keeps_only_tail() {
    assert_eq!(redact(None), "(not set)");
    assert_eq!(redact(Some("abc")), "****");
    assert_eq!(redact(Some("abcdefgh")), "****efgh");
}

#[test]
fn format_sync_timestamp_returns_utc_label() {
    assert_eq!(format_sync_timestamp(0), "1970-01-01 00:00:00 UTC");
}

#[test]
fn failed_sync_result_becomes_error() {
    let error = sync_outcome_line("Push", &SyncResult::failed(0, "User not authenticated"))
        .unwrap_err();
    assert_eq!(error.to_string(), "Sync failed: User not authenticated");

    let line = sync_outcome_line("Push", &SyncResult::succeeded(0)).unwrap();
    assert_eq!(line, "Push completed at 1970-01-01 00:00:00 UTC");
}

#[test]
fn normalize_identifier_rejects_blank() {
    assert!(matches!(
        normalize_identifier("  ", CliError::EmptyRecordId),
        Err(CliError::EmptyRecordId)
    ));
    assert_eq!(
        normalize_identifier(" t1 ", CliError::EmptyRecordId).unwrap(),
        "t1"
    );
}

#[test]
fn build_remote_requires_project_and_token() {
    assert!(matches!(
        build_remote(&CliConfig::default()),
        Err(CliError::SyncNotConfigured)
    ));
    assert!(build_remote(&remote_config()).is_ok());
}

#[tokio::test(flavor = "multi_thread")]
async fn push_without_principal_fails_before_any_request() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nook.db");
    let config = CliConfig {
        firestore_base_url: Some("http://127.0.0.1:9".to_string()),
        ..remote_config()
    };

    let error = run_sync(SyncDirection::Push, &config, &db_path)
        .await
        .unwrap_err();

    assert_eq!(error.to_string(), "Sync failed: User not authenticated");
}

#[tokio::test(flavor = "multi_thread")]
async fn generate_writes_instances_once() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nook.db");
    let today = NaiveDate::from_ymd_opt(2024, 5, 14).unwrap();

    let mut template = Task::new("stretch");
    template.recurrence = Recurrence::Daily;
    template.due_date = today.pred_opt();
    template.done = true;
    {
        let local = open_local(&db_path).await.unwrap();
        local
            .bulk_insert("tasks", &[template.to_record()])
            .await
            .unwrap();
    }

    run_generate("tasks", Some(today), true, false, &db_path)
        .await
        .unwrap();
    assert_eq!(
        open_local(&db_path)
            .await
            .unwrap()
            .read_all("tasks")
            .await
            .unwrap()
            .len(),
        1
    );

    run_generate("tasks", Some(today), false, false, &db_path)
        .await
        .unwrap();
    run_generate("tasks", Some(today), false, true, &db_path)
        .await
        .unwrap();

    let stored = open_local(&db_path)
        .await
        .unwrap()
        .read_all("tasks")
        .await
        .unwrap();
    assert_eq!(stored.len(), 2);
}

#[test]
fn status_lines_list_counts() {
    let report = StatusReport {
        db_path: "/tmp/nook.db".to_string(),
        principal: None,
        remote_configured: false,
        tracked_collections: vec!["tasks".to_string()],
        counts: vec![CollectionCount {
            collection: "tasks".to_string(),
            records: 3,
        }],
    };

    let lines = format_status_lines(&report, &CliConfig::default());
    assert!(lines.iter().any(|line| line.contains("(signed out)")));
    assert!(lines.iter().any(|line| line.contains("not configured")));
    assert!(lines
        .iter()
        .any(|line| line.contains("tasks") && line.ends_with('3')));
}

#[test]
fn instance_lines_show_due_date_and_recurrence() {
    let mut task = Task::new("water plants");
    task.recurrence = Recurrence::Weekly;
    task.due_date = NaiveDate::from_ymd_opt(2024, 5, 14);

    let lines = format_instance_lines(&[task.clone()]);
    assert_eq!(
        lines,
        vec![format!("{}  2024-05-14  weekly      water plants", task.id)]
    );
}

#[test]
fn config_init_refuses_to_overwrite_without_force() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cli-config.json");

    run_config_init(&remote_config(), &path, false).unwrap();
    assert!(run_config_init(&CliConfig::default(), &path, false).is_err());
    run_config_init(&CliConfig::default(), &path, true).unwrap();

    assert_eq!(CliConfig::load_from_path(&path).unwrap(), CliConfig::default());
}
