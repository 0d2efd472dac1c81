use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::datetime::{next_created_at, parse_due_date};
use crate::error::QueryError;

pub type TaskId = Uuid;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// Numeric rank used for ordering: High=3, Medium=2, Low=1.
    pub fn rank(self) -> u8 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(QueryError::invalid("priority", s, "low, medium, high")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,

    pub text: String,

    #[serde(default)]
    pub completed: bool,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub priority: Priority,

    /// Raw due date as stored by the host. Kept verbatim so a malformed
    /// value survives a round trip; see [`Task::due`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,
}

impl Task {
    pub fn new(text: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text,
            completed: false,
            created_at,
            priority: Priority::default(),
            due_date: None,
            notes: None,
            tags: vec![],
        }
    }

    /// Parsed due date; `None` when absent or malformed.
    pub fn due(&self) -> Option<NaiveDate> {
        self.due_date.as_deref().and_then(parse_due_date)
    }
}

/// Create a record for insertion into `existing`.
///
/// The id is a fresh v4 UUID and `created_at` is strictly newer than every
/// existing record, so the createdAt tie-break stays total.
#[tracing::instrument(skip(existing, text), fields(existing_count = existing.len()))]
pub fn new_task(
    existing: &[Task],
    text: &str,
    priority: Priority,
    now: DateTime<Utc>,
) -> Result<Task, QueryError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(QueryError::EmptyText);
    }

    let newest = existing.iter().map(|t| t.created_at).max();
    let mut task = Task::new(text.to_string(), next_created_at(newest, now));
    task.priority = priority;
    Ok(task)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{Priority, Task, new_task};
    use crate::error::QueryError;

    #[test]
    fn priority_rank_orders_high_first() {
        assert!(Priority::High.rank() > Priority::Medium.rank());
        assert!(Priority::Medium.rank() > Priority::Low.rank());
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn new_task_rejects_blank_text() {
        let now = Utc.with_ymd_and_hms(2026, 2, 16, 5, 0, 0).unwrap();
        assert_eq!(
            new_task(&[], "   ", Priority::Low, now),
            Err(QueryError::EmptyText)
        );
    }

    #[test]
    fn new_task_keeps_created_at_unique() {
        let now = Utc.with_ymd_and_hms(2026, 2, 16, 5, 0, 0).unwrap();
        let first = new_task(&[], "first", Priority::Medium, now).unwrap();
        let second = new_task(&[first.clone()], "second", Priority::Medium, now).unwrap();

        assert!(second.created_at > first.created_at);
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn deserializes_host_json_with_defaults() {
        let raw = r#"{
            "id": "00000000-0000-0000-0000-000000000001",
            "text": "Buy groceries",
            "createdAt": 1700000000000,
            "dueDate": "not a date"
        }"#;
        let task: Task = serde_json::from_str(raw).unwrap();

        assert!(!task.completed);
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.due_date.as_deref(), Some("not a date"));
        assert_eq!(task.due(), None);
        assert!(task.tags.is_empty());
    }
}
