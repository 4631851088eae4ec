use std::path::Path;

use serde_json::json;

use crate::commands::common::redact;
use crate::config::CliConfig;
use crate::error::CliError;

pub fn run_config_show(config: &CliConfig, as_json: bool) -> Result<(), CliError> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(&redacted_json(config))?);
        return Ok(());
    }
    for line in format_config_lines(config) {
        println!("{line}");
    }
    Ok(())
}

pub fn run_config_init(config: &CliConfig, path: &Path, force: bool) -> Result<(), CliError> {
    if path.exists() && !force {
        return Err(CliError::Config(format!(
            "{} already exists; pass --force to overwrite",
            path.display()
        )));
    }
    config.save_to_path(path)?;
    println!("{}", path.display());
    Ok(())
}

pub fn run_config_path(path: &Path) {
    println!("{}", path.display());
}

pub fn redacted_json(config: &CliConfig) -> serde_json::Value {
    json!({
        "firestore_project_id": config.firestore_project_id,
        "firestore_api_key": config.firestore_api_key.as_deref().map(|key| redact(Some(key))),
        "firestore_base_url": config.firestore_base_url,
        "id_token": config.id_token.as_deref().map(|token| redact(Some(token))),
        "principal": config.principal,
        "collections": config.sync_settings().collections,
        "sync_interval_secs": config.sync_interval().as_secs(),
        "http_timeout_secs": config.http_timeout().as_secs(),
        "live_poll_secs": config.live_poll_interval().as_secs(),
    })
}

pub fn format_config_lines(config: &CliConfig) -> Vec<String> {
    let text = |value: &Option<String>| value.clone().unwrap_or_else(|| "(not set)".to_string());
    vec![
        format!("firestore_project_id: {}", text(&config.firestore_project_id)),
        format!(
            "firestore_api_key:    {}",
            redact(config.firestore_api_key.as_deref())
        ),
        format!("firestore_base_url:   {}", text(&config.firestore_base_url)),
        format!("id_token:             {}", redact(config.id_token.as_deref())),
        format!("principal:            {}", text(&config.principal)),
        format!(
            "collections:          {}",
            config.sync_settings().collections.join(", ")
        ),
        format!(
            "sync_interval_secs:   {}",
            config.sync_interval().as_secs()
        ),
        format!("http_timeout_secs:    {}", config.http_timeout().as_secs()),
        format!(
            "live_poll_secs:       {}",
            config.live_poll_interval().as_secs()
        ),
    ]
}
