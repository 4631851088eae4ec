use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use nook_core::db::LocalStore;
use nook_core::recurrence::{plan_missing_instances, RecurrenceGenerator};
use nook_core::Task;

use crate::commands::common::{normalize_identifier, open_local};
use crate::error::CliError;

pub async fn run_generate(
    collection: &str,
    date: Option<NaiveDate>,
    dry_run: bool,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let collection = normalize_identifier(collection, CliError::EmptyCollection)?;
    let today = date.unwrap_or_else(|| chrono::Local::now().date_naive());
    let local = open_local(db_path).await?;

    let instances = if dry_run {
        let tasks = local
            .read_all(&collection)
            .await?
            .iter()
            .map(Task::from_record)
            .collect::<Vec<_>>();
        plan_missing_instances(&tasks, today)
    } else {
        RecurrenceGenerator::new(Arc::new(local), collection.as_str())
            .generate_for_stored_tasks(today)
            .await?
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&instances)?);
        return Ok(());
    }

    if instances.is_empty() {
        println!("No recurring instances needed for {today}.");
        return Ok(());
    }
    for line in format_instance_lines(&instances) {
        println!("{line}");
    }
    Ok(())
}

pub fn format_instance_lines(instances: &[Task]) -> Vec<String> {
    instances
        .iter()
        .map(|task| {
            let due = task
                .due_date
                .map_or_else(|| "-".to_string(), |due| due.to_string());
            format!(
                "{}  {}  {:<10}  {}",
                task.id,
                due,
                task.recurrence.as_str(),
                task.title
            )
        })
        .collect()
}
