use std::fmt;
use std::str::FromStr;

use serde::{
  Deserialize,
  Serialize
};
use tracing::trace;

use crate::error::QueryError;
use crate::task::Task;

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
  #[default]
  All,
  Active,
  Completed
}

impl StatusFilter {
  pub fn matches(
    self,
    task: &Task
  ) -> bool {
    match self {
      | StatusFilter::All => true,
      | StatusFilter::Active => {
        !task.completed
      }
      | StatusFilter::Completed => {
        task.completed
      }
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      | StatusFilter::All => "all",
      | StatusFilter::Active => "active",
      | StatusFilter::Completed => {
        "completed"
      }
    }
  }
}

impl fmt::Display for StatusFilter {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for StatusFilter {
  type Err = QueryError;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "all" => Ok(StatusFilter::All),
      | "active" => {
        Ok(StatusFilter::Active)
      }
      | "completed" => {
        Ok(StatusFilter::Completed)
      }
      | _ => Err(QueryError::invalid(
        "status filter",
        s,
        "all, active, completed"
      ))
    }
  }
}

/// Case-insensitive substring search over text, notes and tags.
///
/// An empty or all-whitespace query matches every task.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
  needle: Option<String>
}

impl SearchQuery {
  pub fn new(raw: &str) -> Self {
    if raw.trim().is_empty() {
      return Self::default();
    }

    Self {
      needle: Some(fold_case(raw))
    }
  }

  pub fn is_empty(&self) -> bool {
    self.needle.is_none()
  }

  pub fn matches(
    &self,
    task: &Task
  ) -> bool {
    let Some(needle) =
      self.needle.as_deref()
    else {
      return true;
    };

    let contains = |field: &str| {
      fold_case(field).contains(needle)
    };

    contains(&task.text)
      || task
        .notes
        .as_deref()
        .is_some_and(contains)
      || task
        .tags
        .iter()
        .any(|tag| contains(tag))
  }
}

/// Lowercase one character at a time. `str::to_lowercase` maps a
/// word-final sigma differently, which would let a longer query match
/// where its own substring does not.
fn fold_case(s: &str) -> String {
  s.chars()
    .flat_map(char::to_lowercase)
    .collect()
}

/// Keep the tasks matching both the search and the status filter, in
/// their original order.
#[tracing::instrument(skip(
  tasks, search
), fields(
  total = tasks.len(),
  searching = !search.is_empty()
))]
pub fn filter_tasks<'a>(
  tasks: &'a [Task],
  search: &SearchQuery,
  status: StatusFilter
) -> Vec<&'a Task> {
  tasks
    .iter()
    .filter(|task| {
      let ok = search.matches(task)
        && status.matches(task);
      trace!(id = %task.id, ok, "filter evaluation");
      ok
    })
    .collect()
}
