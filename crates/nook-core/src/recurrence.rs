//! Recurring task instance generation.
//!
//! A template roots a chain of dated instances. For each template the
//! generator decides whether today's instance is missing and creates it
//! through the local store. Duplicate prevention is a best-effort existence
//! check over the stored tasks, not a storage constraint.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Weekday};
use uuid::Uuid;

use crate::db::LocalStore;
use crate::error::Result;
use crate::models::{Recurrence, Task};
use crate::util::now_millis;

/// Why no instance was generated for a template today
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Not a recurring task without a parent
    NotTemplate,
    /// Workday recurrence on a Saturday or Sunday
    Weekend,
    /// An occurrence due today already exists
    AlreadyExists,
    /// The latest occurrence is still open
    LatestOpen,
    /// The latest occurrence is due after today
    NotYetDue,
    /// Less than one full period since the latest occurrence
    PeriodNotElapsed,
}

/// Decide whether `template` needs an instance due `today`.
pub fn evaluate_template(
    template: &Task,
    tasks: &[Task],
    today: NaiveDate,
) -> std::result::Result<(), SkipReason> {
    if !template.is_template() {
        return Err(SkipReason::NotTemplate);
    }

    if template.recurrence == Recurrence::Workdays
        && matches!(today.weekday(), Weekday::Sat | Weekday::Sun)
    {
        return Err(SkipReason::Weekend);
    }

    let chain = tasks.iter().filter(|task| {
        task.id == template.id || task.parent_task_id.as_deref() == Some(template.id.as_str())
    });

    if chain.clone().any(|task| task.due_date == Some(today)) {
        return Err(SkipReason::AlreadyExists);
    }

    // No dated occurrence yet: the first instance is due today.
    let Some((latest, latest_due)) = chain
        .filter_map(|task| task.due_date.map(|due| (task, due)))
        .max_by_key(|(_, due)| *due)
    else {
        return Ok(());
    };

    if !latest.done {
        return Err(SkipReason::LatestOpen);
    }
    if latest_due > today {
        return Err(SkipReason::NotYetDue);
    }
    if period_elapsed(template.recurrence, latest_due, today) {
        Ok(())
    } else {
        Err(SkipReason::PeriodNotElapsed)
    }
}

/// Instances that should exist today but do not. Pure; writes nothing.
pub fn plan_missing_instances(tasks: &[Task], today: NaiveDate) -> Vec<Task> {
    tasks
        .iter()
        .filter(|task| task.is_template())
        .filter_map(|template| match evaluate_template(template, tasks, today) {
            Ok(()) => Some(new_instance(template, today)),
            Err(reason) => {
                tracing::debug!(template = %template.id, ?reason, "No instance needed");
                None
            }
        })
        .collect()
}

/// Writes missing recurring instances into the local store
pub struct RecurrenceGenerator {
    local: Arc<dyn LocalStore>,
    collection: String,
}

impl RecurrenceGenerator {
    pub fn new(local: Arc<dyn LocalStore>, collection: impl Into<String>) -> Self {
        Self {
            local,
            collection: collection.into(),
        }
    }

    /// Create every missing instance for `today` and return the ones written.
    ///
    /// `tasks` is checked together with the stored collection, so a stale
    /// slice does not produce duplicates. If the store cannot be read, only
    /// `tasks` is checked. A failed write is logged and skipped; it is not
    /// retried.
    pub async fn generate_missing_instances(&self, tasks: &[Task], today: NaiveDate) -> Vec<Task> {
        let mut known = tasks.to_vec();
        match self.stored_tasks().await {
            Ok(stored) => {
                for task in stored {
                    if !known.iter().any(|existing| existing.id == task.id) {
                        known.push(task);
                    }
                }
            }
            Err(error) => tracing::warn!(
                collection = %self.collection,
                "Checking recurring instances without stored tasks: {}",
                error
            ),
        }
        self.write_instances(&known, today).await
    }

    /// Load the task collection from the local store and generate against it.
    pub async fn generate_for_stored_tasks(&self, today: NaiveDate) -> Result<Vec<Task>> {
        let tasks = self.stored_tasks().await?;
        Ok(self.write_instances(&tasks, today).await)
    }

    async fn stored_tasks(&self) -> Result<Vec<Task>> {
        Ok(self
            .local
            .read_all(&self.collection)
            .await?
            .iter()
            .map(Task::from_record)
            .collect())
    }

    async fn write_instances(&self, tasks: &[Task], today: NaiveDate) -> Vec<Task> {
        let mut created = Vec::new();
        for instance in plan_missing_instances(tasks, today) {
            match self
                .local
                .bulk_insert(&self.collection, &[instance.to_record()])
                .await
            {
                Ok(()) => {
                    tracing::info!(
                        template = instance.parent_task_id.as_deref().unwrap_or_default(),
                        id = %instance.id,
                        due = %today,
                        "Created recurring instance"
                    );
                    created.push(instance);
                }
                Err(error) => tracing::error!(
                    template = instance.parent_task_id.as_deref().unwrap_or_default(),
                    "Failed to create recurring instance: {}",
                    error
                ),
            }
        }
        created
    }
}

fn new_instance(template: &Task, today: NaiveDate) -> Task {
    let now = now_millis();
    Task {
        id: Uuid::now_v7().to_string(),
        title: template.title.clone(),
        category: template.category.clone(),
        priority: template.priority.clone(),
        recurrence: template.recurrence,
        tags: template.tags.clone(),
        project_id: template.project_id.clone(),
        due_date: Some(today),
        done: false,
        parent_task_id: Some(template.id.clone()),
        created_at: now,
        updated_at: now,
    }
}

fn period_elapsed(recurrence: Recurrence, from: NaiveDate, today: NaiveDate) -> bool {
    let days = (today - from).num_days();
    match recurrence {
        Recurrence::None => false,
        Recurrence::Daily | Recurrence::Workdays => days >= 0,
        Recurrence::Weekly => days >= 7,
        Recurrence::Biweekly => days >= 14,
        Recurrence::Monthly => months_between(from, today) >= 1,
        Recurrence::Bimonthly => months_between(from, today) >= 2,
        Recurrence::HalfYearly => months_between(from, today) >= 6,
        Recurrence::Yearly => months_between(from, today) >= 12,
    }
}

/// Whole calendar months from `from` to `to`.
///
/// A month only counts once `to` reaches the same day of month, so Jan 31 to
/// Feb 28 is zero months and Jan 31 to Mar 1 is one.
#[allow(clippy::cast_possible_wrap)]
fn months_between(from: NaiveDate, to: NaiveDate) -> i32 {
    let month_index = |date: NaiveDate| date.year() * 12 + date.month0() as i32;
    let mut months = month_index(to) - month_index(from);
    if to.day() < from.day() {
        months -= 1;
    }
    months
}
