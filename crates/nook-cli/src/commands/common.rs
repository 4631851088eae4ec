use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use nook_core::auth::StaticAuth;
use nook_core::db::LibSqlLocalStore;
use nook_core::observe::RequestLog;
use nook_core::remote::{FirestoreRemote, RemoteStore};
use nook_core::{SyncEngine, SyncResult};

use crate::config::CliConfig;
use crate::error::CliError;

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("NOOK_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("nook")
        .join("nook.db")
}

pub async fn open_local(db_path: &Path) -> Result<LibSqlLocalStore, CliError> {
    Ok(LibSqlLocalStore::open_path(db_path).await?)
}

pub fn build_remote(config: &CliConfig) -> Result<Arc<dyn RemoteStore>, CliError> {
    let (Some(project_id), Some(id_token)) = (&config.firestore_project_id, &config.id_token)
    else {
        return Err(CliError::SyncNotConfigured);
    };

    let mut remote = FirestoreRemote::new(project_id.as_str(), id_token.as_str())?
        .with_api_key(config.firestore_api_key.clone())
        .with_timeout(config.http_timeout())?;
    if let Some(base_url) = &config.firestore_base_url {
        remote = remote.with_base_url(base_url.as_str())?;
    }
    Ok(Arc::new(remote))
}

/// Auth state from config; a missing principal leaves the engine signed out.
pub fn build_auth(config: &CliConfig) -> Arc<StaticAuth> {
    Arc::new(match &config.principal {
        Some(principal) => StaticAuth::signed_in(principal.as_str()),
        None => StaticAuth::signed_out(),
    })
}

pub fn build_engine(
    config: &CliConfig,
    local: LibSqlLocalStore,
    remote: Arc<dyn RemoteStore>,
) -> SyncEngine {
    SyncEngine::new(
        Arc::new(local),
        remote,
        build_auth(config),
        Arc::new(RequestLog::default()),
        config.sync_settings(),
    )
}

pub fn normalize_identifier(value: &str, empty: CliError) -> Result<String, CliError> {
    let value = value.trim();
    if value.is_empty() {
        Err(empty)
    } else {
        Ok(value.to_string())
    }
}

/// Turn a sync outcome into a printable line or an error
pub fn sync_outcome_line(label: &str, result: &SyncResult) -> Result<String, CliError> {
    if result.success() {
        Ok(format!(
            "{label} completed at {}",
            format_sync_timestamp(result.timestamp())
        ))
    } else {
        Err(CliError::SyncFailed(
            result.error().unwrap_or("unknown error").to_string(),
        ))
    }
}

pub fn format_sync_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

/// Mask all but the last four characters of a secret
pub fn redact(value: Option<&str>) -> String {
    match value {
        None => "(not set)".to_string(),
        Some(value) if value.chars().count() <= 4 => "****".to_string(),
        Some(value) => {
            let tail = value
                .chars()
                .rev()
                .take(4)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect::<String>();
            format!("****{tail}")
        }
    }
}
