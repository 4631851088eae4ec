//! Persistent CLI configuration with environment overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use nook_core::util::{is_http_url, normalize_text_option};
use nook_core::SyncSettings;
use serde::{Deserialize, Serialize};

use crate::error::CliError;

const CONFIG_FILE_NAME: &str = "cli-config.json";
const DEFAULT_SYNC_INTERVAL_SECS: u64 = 300;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_LIVE_POLL_SECS: u64 = 60;

#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliConfig {
    #[serde(default)]
    pub firestore_project_id: Option<String>,
    #[serde(default)]
    pub firestore_api_key: Option<String>,
    /// Alternative endpoint, e.g. the Firestore emulator
    #[serde(default)]
    pub firestore_base_url: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub principal: Option<String>,
    #[serde(default)]
    pub collections: Vec<String>,
    #[serde(default)]
    pub sync_interval_secs: Option<u64>,
    #[serde(default)]
    pub http_timeout_secs: Option<u64>,
    #[serde(default)]
    pub live_poll_secs: Option<u64>,
}

impl std::fmt::Debug for CliConfig {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("CliConfig")
            .field("firestore_project_id", &self.firestore_project_id)
            .field(
                "firestore_api_key",
                &self.firestore_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("firestore_base_url", &self.firestore_base_url)
            .field("id_token", &self.id_token.as_ref().map(|_| "[REDACTED]"))
            .field("principal", &self.principal)
            .field("collections", &self.collections)
            .field("sync_interval_secs", &self.sync_interval_secs)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("live_poll_secs", &self.live_poll_secs)
            .finish()
    }
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("nook")
        .join(CONFIG_FILE_NAME)
}

impl CliConfig {
    /// Load the config file (if any), then apply `NOOK_*` environment overrides.
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let mut config = Self::load_from_path(path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, CliError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(|error| {
            CliError::Config(format!(
                "Failed to read config at {}: {}",
                path.display(),
                error
            ))
        })?;
        let mut config = serde_json::from_str::<Self>(&raw).map_err(|error| {
            CliError::Config(format!(
                "Failed to parse config at {}: {}",
                path.display(),
                error
            ))
        })?;
        config.normalize();
        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), CliError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        std::fs::write(path, serde_json::to_string_pretty(&normalized)?)?;
        Ok(())
    }

    /// Override fields from `NOOK_*` variables resolved through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let text = |key: &str| normalize_text_option(lookup(key));
        let seconds = |key: &str| {
            text(key).and_then(|raw| match raw.parse::<u64>() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("Ignoring {}: '{}' is not a number of seconds", key, raw);
                    None
                }
            })
        };

        if let Some(value) = text("NOOK_FIRESTORE_PROJECT_ID") {
            self.firestore_project_id = Some(value);
        }
        if let Some(value) = text("NOOK_FIRESTORE_API_KEY") {
            self.firestore_api_key = Some(value);
        }
        if let Some(value) = text("NOOK_FIRESTORE_BASE_URL") {
            self.firestore_base_url = Some(value);
        }
        if let Some(value) = text("NOOK_ID_TOKEN") {
            self.id_token = Some(value);
        }
        if let Some(value) = text("NOOK_PRINCIPAL") {
            self.principal = Some(value);
        }
        if let Some(value) = text("NOOK_COLLECTIONS") {
            self.collections = value.split(',').map(ToString::to_string).collect();
        }
        if let Some(value) = seconds("NOOK_SYNC_INTERVAL_SECS") {
            self.sync_interval_secs = Some(value);
        }
        if let Some(value) = seconds("NOOK_HTTP_TIMEOUT_SECS") {
            self.http_timeout_secs = Some(value);
        }
        if let Some(value) = seconds("NOOK_LIVE_POLL_SECS") {
            self.live_poll_secs = Some(value);
        }
        self.normalize();
    }

    pub fn normalize(&mut self) {
        self.firestore_project_id = normalize_text_option(self.firestore_project_id.take());
        self.firestore_api_key = normalize_text_option(self.firestore_api_key.take());
        self.firestore_base_url = normalize_text_option(self.firestore_base_url.take());
        self.id_token = normalize_text_option(self.id_token.take());
        self.principal = normalize_text_option(self.principal.take());
        self.collections = SyncSettings::default()
            .with_collections(std::mem::take(&mut self.collections))
            .collections;
    }

    pub fn validate(&self) -> Result<(), CliError> {
        if let Some(url) = &self.firestore_base_url {
            if !is_http_url(url) {
                return Err(CliError::Config(
                    "firestore_base_url must include http:// or https://".to_string(),
                ));
            }
        }
        for (name, value) in [
            ("sync_interval_secs", self.sync_interval_secs),
            ("http_timeout_secs", self.http_timeout_secs),
            ("live_poll_secs", self.live_poll_secs),
        ] {
            if value == Some(0) {
                return Err(CliError::Config(format!("{name} must be greater than zero")));
            }
        }
        Ok(())
    }

    /// Whether enough is configured to talk to the remote store
    pub const fn is_remote_configured(&self) -> bool {
        self.firestore_project_id.is_some() && self.id_token.is_some()
    }

    /// Configured collections, or the default set when none are listed
    pub fn sync_settings(&self) -> SyncSettings {
        if self.collections.is_empty() {
            SyncSettings::default()
        } else {
            SyncSettings::default().with_collections(self.collections.iter().cloned())
        }
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs.unwrap_or(DEFAULT_SYNC_INTERVAL_SECS))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS))
    }

    pub fn live_poll_interval(&self) -> Duration {
        Duration::from_secs(self.live_poll_secs.unwrap_or(DEFAULT_LIVE_POLL_SECS))
    }
}
