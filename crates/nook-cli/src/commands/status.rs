use std::path::Path;

use serde::Serialize;

use crate::commands::common::{open_local, redact};
use crate::config::CliConfig;
use crate::error::CliError;

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct StatusReport {
    pub db_path: String,
    pub principal: Option<String>,
    pub remote_configured: bool,
    pub tracked_collections: Vec<String>,
    pub counts: Vec<CollectionCount>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct CollectionCount {
    pub collection: String,
    pub records: usize,
}

pub async fn run_status(config: &CliConfig, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let local = open_local(db_path).await?;
    let counts = local
        .counts()
        .await?
        .into_iter()
        .map(|(collection, records)| CollectionCount { collection, records })
        .collect();

    let report = StatusReport {
        db_path: db_path.display().to_string(),
        principal: config.principal.clone(),
        remote_configured: config.is_remote_configured(),
        tracked_collections: config.sync_settings().collections,
        counts,
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in format_status_lines(&report, config) {
            println!("{line}");
        }
    }
    Ok(())
}

pub fn format_status_lines(report: &StatusReport, config: &CliConfig) -> Vec<String> {
    let mut lines = vec![
        format!("Database:    {}", report.db_path),
        format!(
            "Principal:   {}",
            report.principal.as_deref().unwrap_or("(signed out)")
        ),
        format!(
            "Remote:      {}",
            if report.remote_configured {
                config.firestore_project_id.as_deref().unwrap_or("configured")
            } else {
                "not configured"
            }
        ),
        format!("ID token:    {}", redact(config.id_token.as_deref())),
        format!("Collections: {}", report.tracked_collections.join(", ")),
    ];

    if report.counts.is_empty() {
        lines.push("No local records.".to_string());
    }
    for count in &report.counts {
        lines.push(format!("  {:<14} {}", count.collection, count.records));
    }
    lines
}
