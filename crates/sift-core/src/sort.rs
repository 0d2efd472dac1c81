use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{
  Deserialize,
  Serialize
};

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
#[serde(rename_all = "camelCase")]
pub enum SortKey {
  #[default]
  CreatedAt,
  DueDate,
  Priority,
  Text
}

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
pub enum SortDirection {
  Asc,
  #[default]
  Desc
}

impl SortKey {
  /// Direction in which the raw comparison for this key runs without
  /// negation.
  pub fn base_direction(
    self
  ) -> SortDirection {
    match self {
      | SortKey::CreatedAt
      | SortKey::Priority => {
        SortDirection::Desc
      }
      | SortKey::DueDate
      | SortKey::Text => {
        SortDirection::Asc
      }
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      | SortKey::CreatedAt => {
        "createdAt"
      }
      | SortKey::DueDate => "dueDate",
      | SortKey::Priority => {
        "priority"
      }
      | SortKey::Text => "text"
    }
  }
}

impl SortDirection {
  pub fn opposite(self) -> Self {
    match self {
      | SortDirection::Asc => {
        SortDirection::Desc
      }
      | SortDirection::Desc => {
        SortDirection::Asc
      }
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      | SortDirection::Asc => "asc",
      | SortDirection::Desc => "desc"
    }
  }
}

impl fmt::Display for SortKey {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl fmt::Display for SortDirection {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for SortKey {
  type Err = QueryError;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "createdat" | "created_at"
      | "created" => {
        Ok(SortKey::CreatedAt)
      }
      | "duedate" | "due_date"
      | "due" => Ok(SortKey::DueDate),
      | "priority" => {
        Ok(SortKey::Priority)
      }
      | "text" => Ok(SortKey::Text),
      | _ => Err(QueryError::invalid(
        "sort key",
        s,
        "createdAt, dueDate, priority, \
         text"
      ))
    }
  }
}

impl FromStr for SortDirection {
  type Err = QueryError;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "asc" | "ascending" => {
        Ok(SortDirection::Asc)
      }
      | "desc" | "descending" => {
        Ok(SortDirection::Desc)
      }
      | _ => Err(QueryError::invalid(
        "sort direction",
        s,
        "asc, desc"
      ))
    }
  }
}

/// Build a total order for `key` in `direction`.
///
/// The key's base comparison is negated as a whole when `direction` is
/// opposite to its base direction, so undated tasks sort last ascending
/// and first descending. Ties always fall back to newest-first by
/// `created_at`.
pub fn build_comparator(
  key: SortKey,
  direction: SortDirection
) -> impl Fn(&Task, &Task) -> Ordering {
  let negate =
    direction != key.base_direction();

  move |a: &Task, b: &Task| {
    compare_rows(
      key,
      negate,
      &SortRow::new(key, a),
      &SortRow::new(key, b)
    )
  }
}

/// Stably sort `tasks` in the order [`build_comparator`] defines,
/// parsing each due date once instead of on every comparison.
pub fn sort_tasks(
  tasks: &mut [&Task],
  key: SortKey,
  direction: SortDirection
) {
  let negate =
    direction != key.base_direction();

  let mut rows: Vec<SortRow<'_>> = tasks
    .iter()
    .map(|task| SortRow::new(key, *task))
    .collect();
  rows.sort_by(|a, b| {
    compare_rows(key, negate, a, b)
  });

  for (slot, row) in
    tasks.iter_mut().zip(rows)
  {
    *slot = row.task;
  }
}

struct SortRow<'a> {
  task: &'a Task,
  due:  Option<NaiveDate>
}

impl<'a> SortRow<'a> {
  fn new(
    key: SortKey,
    task: &'a Task
  ) -> Self {
    let due = match key {
      | SortKey::DueDate => task.due(),
      | _ => None
    };
    Self { task, due }
  }
}

fn compare_rows(
  key: SortKey,
  negate: bool,
  a: &SortRow<'_>,
  b: &SortRow<'_>
) -> Ordering {
  let base = compare_base(key, a, b);
  let primary = if negate {
    base.reverse()
  } else {
    base
  };

  primary.then_with(|| {
    newest_first(a.task, b.task)
  })
}

fn compare_base(
  key: SortKey,
  a: &SortRow<'_>,
  b: &SortRow<'_>
) -> Ordering {
  match key {
    | SortKey::CreatedAt => {
      newest_first(a.task, b.task)
    }
    | SortKey::Priority => {
      b.task
        .priority
        .rank()
        .cmp(&a.task.priority.rank())
    }
    | SortKey::Text => {
      compare_text(
        &a.task.text,
        &b.task.text
      )
    }
    | SortKey::DueDate => {
      match (a.due, b.due) {
        | (Some(x), Some(y)) => x.cmp(&y),
        | (Some(_), None) => {
          Ordering::Less
        }
        | (None, Some(_)) => {
          Ordering::Greater
        }
        | (None, None) => {
          Ordering::Equal
        }
      }
    }
  }
}

fn newest_first(
  a: &Task,
  b: &Task
) -> Ordering {
  b.created_at.cmp(&a.created_at)
}

/// Case-insensitive first; among case variants lowercase sorts first.
fn compare_text(
  a: &str,
  b: &str
) -> Ordering {
  a.to_lowercase()
    .cmp(&b.to_lowercase())
    .then_with(|| b.cmp(a))
}

#[cfg(test)]
mod tests {
  use chrono::{
    TimeZone,
    Utc
  };

  use super::{
    SortDirection,
    SortKey,
    build_comparator,
    compare_text,
    sort_tasks
  };
  use crate::error::QueryError;
  use crate::task::{
    Priority,
    Task
  };

  fn task(
    text: &str,
    secs: i64
  ) -> Task {
    Task::new(
      text.to_string(),
      Utc
        .timestamp_opt(secs, 0)
        .unwrap()
    )
  }

  fn sorted(
    mut tasks: Vec<Task>,
    key: SortKey,
    direction: SortDirection
  ) -> Vec<String> {
    let cmp =
      build_comparator(key, direction);
    tasks.sort_by(|a, b| cmp(a, b));
    tasks
      .into_iter()
      .map(|t| t.text)
      .collect()
  }

  #[test]
  fn undated_tasks_follow_direction() {
    let mut jan = task("jan", 1);
    jan.due_date =
      Some("2025-01-01".to_string());
    let none = task("none", 2);
    let mut jun = task("jun", 3);
    jun.due_date =
      Some("2025-06-01".to_string());
    let tasks = vec![jan, none, jun];

    assert_eq!(
      sorted(
        tasks.clone(),
        SortKey::DueDate,
        SortDirection::Asc
      ),
      vec!["jan", "jun", "none"]
    );
    assert_eq!(
      sorted(
        tasks,
        SortKey::DueDate,
        SortDirection::Desc
      ),
      vec!["none", "jun", "jan"]
    );
  }

  #[test]
  fn malformed_due_date_sorts_as_undated()
  {
    let mut bad = task("bad", 1);
    bad.due_date =
      Some("2025-13-45".to_string());
    let mut good = task("good", 2);
    good.due_date =
      Some("2030-01-01".to_string());

    assert_eq!(
      sorted(
        vec![bad, good],
        SortKey::DueDate,
        SortDirection::Asc
      ),
      vec!["good", "bad"]
    );
  }

  #[test]
  fn priority_high_first_when_descending()
  {
    let mut high = task("1", 1);
    high.priority = Priority::High;
    let mut low = task("2", 2);
    low.priority = Priority::Low;
    let tasks = vec![high, low];

    assert_eq!(
      sorted(
        tasks.clone(),
        SortKey::Priority,
        SortDirection::Desc
      ),
      vec!["1", "2"]
    );
    assert_eq!(
      sorted(
        tasks,
        SortKey::Priority,
        SortDirection::Asc
      ),
      vec!["2", "1"]
    );
  }

  #[test]
  fn ties_break_newest_first_in_both_directions()
   {
    let older = task("older", 10);
    let newer = task("newer", 20);
    let tasks = vec![older, newer];

    for direction in [
      SortDirection::Asc,
      SortDirection::Desc
    ] {
      assert_eq!(
        sorted(
          tasks.clone(),
          SortKey::Priority,
          direction
        ),
        vec!["newer", "older"]
      );
    }
  }

  #[test]
  fn created_at_defaults_to_newest_first()
  {
    let tasks = vec![
      task("a", 1),
      task("b", 3),
      task("c", 2),
    ];

    assert_eq!(
      sorted(
        tasks.clone(),
        SortKey::CreatedAt,
        SortDirection::Desc
      ),
      vec!["b", "c", "a"]
    );
    assert_eq!(
      sorted(
        tasks,
        SortKey::CreatedAt,
        SortDirection::Asc
      ),
      vec!["a", "c", "b"]
    );
  }

  #[test]
  fn text_ignores_case_before_raw_order()
  {
    let tasks = vec![
      task("banana", 1),
      task("Apple", 2),
      task("cherry", 3),
    ];
    assert_eq!(
      sorted(
        tasks,
        SortKey::Text,
        SortDirection::Asc
      ),
      vec!["Apple", "banana", "cherry"]
    );
    assert!(compare_text("a", "A").is_lt());
    assert!(
      compare_text("same", "same").is_eq()
    );
  }

  #[test]
  fn sort_tasks_agrees_with_comparator() {
    let mut jan = task("jan", 1);
    jan.due_date =
      Some("2025-01-01".to_string());
    let mut bad = task("bad", 2);
    bad.due_date =
      Some("someday".to_string());
    let mut jun = task("jun", 3);
    jun.due_date =
      Some("2025-06-01".to_string());
    jun.priority = Priority::High;
    let plain = task("plain", 4);
    let tasks = vec![jan, bad, jun, plain];

    for key in [
      SortKey::CreatedAt,
      SortKey::DueDate,
      SortKey::Priority,
      SortKey::Text
    ] {
      for direction in [
        SortDirection::Asc,
        SortDirection::Desc
      ] {
        let mut refs: Vec<&Task> =
          tasks.iter().collect();
        sort_tasks(
          &mut refs, key, direction
        );
        let texts: Vec<String> = refs
          .iter()
          .map(|t| t.text.clone())
          .collect();
        assert_eq!(
          texts,
          sorted(
            tasks.clone(),
            key,
            direction
          ),
          "{key} {direction}"
        );
      }
    }
  }

  #[test]
  fn parses_key_and_direction_spellings()
  {
    assert_eq!(
      "dueDate"
        .parse::<SortKey>()
        .unwrap(),
      SortKey::DueDate
    );
    assert_eq!(
      "created_at"
        .parse::<SortKey>()
        .unwrap(),
      SortKey::CreatedAt
    );
    assert_eq!(
      "DESCENDING"
        .parse::<SortDirection>()
        .unwrap(),
      SortDirection::Desc
    );
    assert!(matches!(
      "title".parse::<SortKey>(),
      Err(QueryError::InvalidInput {
        field: "sort key",
        ..
      })
    ));
    assert!(
      "up"
        .parse::<SortDirection>()
        .is_err()
    );
  }
}
