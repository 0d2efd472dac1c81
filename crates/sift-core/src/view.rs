use serde::{
  Deserialize,
  Serialize
};
use tracing::debug;

use crate::error::QueryError;
use crate::filter::{
  SearchQuery,
  StatusFilter,
  filter_tasks
};
use crate::sort::{
  SortDirection,
  SortKey,
  sort_tasks
};
use crate::task::{
  Task,
  TaskId
};

/// The five inputs a view is recomputed from, minus the collection.
#[derive(
  Debug,
  Clone,
  Default,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewRequest {
  pub search:    String,
  pub status:    StatusFilter,
  pub sort_key:  SortKey,
  pub direction: SortDirection
}

impl ViewRequest {
  /// Validate raw host strings once. The first unrecognized value fails
  /// the whole request.
  pub fn parse(
    search: &str,
    status: &str,
    sort_key: &str,
    direction: &str
  ) -> Result<Self, QueryError> {
    Ok(Self {
      search:    search.to_string(),
      status:    status.parse()?,
      sort_key:  sort_key.parse()?,
      direction: direction.parse()?
    })
  }

  pub fn apply<'a>(
    &self,
    tasks: &'a [Task]
  ) -> Vec<&'a Task> {
    query_view(
      tasks,
      &self.search,
      self.status,
      self.sort_key,
      self.direction
    )
  }
}

/// Filter then stably sort `tasks`, yielding the visible set in display
/// order.
#[tracing::instrument(skip(
  tasks, search
), fields(total = tasks.len()))]
pub fn query_view<'a>(
  tasks: &'a [Task],
  search: &str,
  status: StatusFilter,
  sort_key: SortKey,
  direction: SortDirection
) -> Vec<&'a Task> {
  let query = SearchQuery::new(search);
  let mut visible =
    filter_tasks(tasks, &query, status);

  sort_tasks(
    &mut visible,
    sort_key,
    direction
  );

  debug!(
    visible = visible.len(),
    "assembled view"
  );
  visible
}

pub fn visible_ids(
  visible: &[&Task]
) -> Vec<TaskId> {
  visible
    .iter()
    .map(|task| task.id)
    .collect()
}

/// Counts shown under the task list.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Serialize,
)]
pub struct ViewSummary {
  pub total:     usize,
  pub active:    usize,
  pub completed: usize,
  pub visible:   usize
}

impl ViewSummary {
  pub fn compute(
    tasks: &[Task],
    visible: &[&Task]
  ) -> Self {
    let completed = tasks
      .iter()
      .filter(|task| task.completed)
      .count();

    Self {
      total: tasks.len(),
      active: tasks.len() - completed,
      completed,
      visible: visible.len()
    }
  }
}
