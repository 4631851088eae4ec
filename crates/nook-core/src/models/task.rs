//! Task model, reduced to what recurrence generation needs

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{FieldValue, Record};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// How often a recurring task repeats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    #[default]
    None,
    Daily,
    /// Every Monday to Friday
    Workdays,
    Weekly,
    Biweekly,
    Monthly,
    Bimonthly,
    HalfYearly,
    Yearly,
}

impl Recurrence {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Daily => "daily",
            Self::Workdays => "workdays",
            Self::Weekly => "weekly",
            Self::Biweekly => "biweekly",
            Self::Monthly => "monthly",
            Self::Bimonthly => "bimonthly",
            Self::HalfYearly => "halfyearly",
            Self::Yearly => "yearly",
        }
    }

    pub const fn is_recurring(self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Recurrence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(Self::None),
            "daily" => Ok(Self::Daily),
            "workdays" | "weekdays" => Ok(Self::Workdays),
            "weekly" => Ok(Self::Weekly),
            "biweekly" => Ok(Self::Biweekly),
            "monthly" => Ok(Self::Monthly),
            "bimonthly" => Ok(Self::Bimonthly),
            "halfyearly" | "half-yearly" => Ok(Self::HalfYearly),
            "yearly" => Ok(Self::Yearly),
            other => Err(format!("unknown recurrence '{other}'")),
        }
    }
}

/// A task as seen by the recurrence generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub category: Option<String>,
    pub priority: Option<String>,
    pub recurrence: Recurrence,
    pub tags: Vec<String>,
    pub project_id: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub done: bool,
    /// Template this task was generated from
    pub parent_task_id: Option<String>,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
}

impl Task {
    /// Create a new open task with a time-sortable id
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: Uuid::now_v7().to_string(),
            title: title.into(),
            category: None,
            priority: None,
            recurrence: Recurrence::None,
            tags: Vec::new(),
            project_id: None,
            due_date: None,
            done: false,
            parent_task_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A template roots a recurrence chain: it recurs and has no parent.
    pub const fn is_template(&self) -> bool {
        self.recurrence.is_recurring() && self.parent_task_id.is_none()
    }

    /// Id of the template at the root of this task's chain.
    pub fn lineage_root(&self) -> &str {
        self.parent_task_id.as_deref().unwrap_or(&self.id)
    }

    /// Convert into a syncable record. Unset optionals become
    /// [`FieldValue::Missing`] and are dropped by the sanitizer.
    pub fn to_record(&self) -> Record {
        Record::new(self.id.clone(), self.updated_at)
            .with_field("title", self.title.as_str())
            .with_field("category", self.category.clone())
            .with_field("priority", self.priority.clone())
            .with_field("recurrence", self.recurrence.as_str())
            .with_field("tags", self.tags.clone())
            .with_field("projectId", self.project_id.clone())
            .with_field(
                "dueDate",
                self.due_date
                    .map(|date| date.format(DATE_FORMAT).to_string()),
            )
            .with_field("done", self.done)
            .with_field("parentTaskId", self.parent_task_id.clone())
            .with_field("createdAt", self.created_at)
    }

    /// Read a task out of a record, tolerating absent or malformed fields.
    pub fn from_record(record: &Record) -> Self {
        let text = |key: &str| {
            record
                .get(key)
                .and_then(FieldValue::as_str)
                .map(ToString::to_string)
        };

        let recurrence = text("recurrence")
            .map(|raw| {
                raw.parse().unwrap_or_else(|error| {
                    tracing::warn!("Task {} has {}; treating as one-off", record.id, error);
                    Recurrence::None
                })
            })
            .unwrap_or_default();

        let tags = record
            .get("tags")
            .and_then(FieldValue::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter_map(FieldValue::as_str)
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            id: record.id.clone(),
            title: text("title").unwrap_or_default(),
            category: text("category"),
            priority: text("priority"),
            recurrence,
            tags,
            project_id: text("projectId"),
            due_date: text("dueDate").and_then(|raw| parse_due_date(&raw)),
            done: record
                .get("done")
                .and_then(FieldValue::as_bool)
                .unwrap_or(false),
            parent_task_id: text("parentTaskId"),
            created_at: record
                .get("createdAt")
                .and_then(FieldValue::as_integer)
                .unwrap_or(record.updated_at),
            updated_at: record.updated_at,
        }
    }
}

/// Accepts a bare date or a full ISO-8601 timestamp and keeps the date part.
fn parse_due_date(raw: &str) -> Option<NaiveDate> {
    let date_part = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(date_part, DATE_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn recurrence_parses_known_values() {
        assert_eq!("daily".parse::<Recurrence>(), Ok(Recurrence::Daily));
        assert_eq!("Weekdays".parse::<Recurrence>(), Ok(Recurrence::Workdays));
        assert_eq!("".parse::<Recurrence>(), Ok(Recurrence::None));
        assert!("fortnightly".parse::<Recurrence>().is_err());
    }

    #[test]
    fn template_requires_recurrence_and_no_parent() {
        let mut task = Task::new("water plants");
        assert!(!task.is_template());

        task.recurrence = Recurrence::Weekly;
        assert!(task.is_template());

        task.parent_task_id = Some("root".to_string());
        assert!(!task.is_template());
        assert_eq!(task.lineage_root(), "root");
    }

    #[test]
    fn record_roundtrip_preserves_task() {
        let mut task = Task::new("review budget");
        task.category = Some("finance".to_string());
        task.recurrence = Recurrence::Monthly;
        task.tags = vec!["money".to_string(), "home".to_string()];
        task.due_date = NaiveDate::from_ymd_opt(2024, 1, 31);
        task.done = true;

        assert_eq!(Task::from_record(&task.to_record()), task);
    }

    #[test]
    fn unset_optionals_are_missing_in_record() {
        let record = Task::new("plain").to_record();
        assert_eq!(record.get("category"), Some(&FieldValue::Missing));
        assert_eq!(record.get("dueDate"), Some(&FieldValue::Missing));
    }

    #[test]
    fn due_date_accepts_iso_timestamps() {
        assert_eq!(
            parse_due_date("2024-03-01T09:30:00.000Z"),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert_eq!(parse_due_date("soon"), None);
    }
}
