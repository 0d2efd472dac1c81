use tracing::{
  debug,
  info
};

use crate::selection::Selection;
use crate::task::Task;

/// Result of a bulk mutation: the new collection, the (cleared) selection
/// and how many records were changed or removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkOutcome {
  pub tasks:     Vec<Task>,
  pub selection: Selection,
  pub affected:  usize
}

impl BulkOutcome {
  fn unchanged(tasks: Vec<Task>) -> Self {
    Self {
      tasks,
      selection: Selection::new(),
      affected: 0
    }
  }
}

/// Mark every selected task completed. Re-applying is a no-op.
#[tracing::instrument(skip(
  tasks, selection
), fields(
  total = tasks.len(),
  selected = selection.len()
))]
pub fn mark_selected_complete(
  mut tasks: Vec<Task>,
  selection: &Selection
) -> BulkOutcome {
  if selection.is_empty() {
    debug!("empty selection, nothing to complete");
    return BulkOutcome::unchanged(tasks);
  }

  let mut affected = 0;
  for task in tasks.iter_mut().filter(|task| {
    selection.contains(&task.id)
  }) {
    if !task.completed {
      task.completed = true;
      affected += 1;
    }
  }

  info!(affected, "marked selected tasks complete");
  BulkOutcome {
    tasks,
    selection: Selection::new(),
    affected
  }
}

/// Remove every selected task.
#[tracing::instrument(skip(
  tasks, selection
), fields(
  total = tasks.len(),
  selected = selection.len()
))]
pub fn delete_selected(
  mut tasks: Vec<Task>,
  selection: &Selection
) -> BulkOutcome {
  if selection.is_empty() {
    debug!("empty selection, nothing to delete");
    return BulkOutcome::unchanged(tasks);
  }

  let before = tasks.len();
  tasks.retain(|task| {
    !selection.contains(&task.id)
  });
  let affected = before - tasks.len();

  info!(affected, "deleted selected tasks");
  BulkOutcome {
    tasks,
    selection: Selection::new(),
    affected
  }
}
