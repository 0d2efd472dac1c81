use std::collections::BTreeSet;

use serde::{
  Deserialize,
  Serialize
};
use tracing::debug;

use crate::task::{
  Task,
  TaskId
};

/// Ids the user has checked. Owned by the host and threaded through each
/// call; only meaningful against the collection it was last pruned to.
#[derive(
  Debug,
  Clone,
  Default,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
#[serde(transparent)]
pub struct Selection {
  ids: BTreeSet<TaskId>
}

impl Selection {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn toggle(&mut self, id: TaskId) {
    if !self.ids.remove(&id) {
      self.ids.insert(id);
    }
  }

  /// Replace the selection with exactly the visible ids.
  pub fn select_all_visible(
    &mut self,
    visible: &[TaskId]
  ) {
    self.ids =
      visible.iter().copied().collect();
  }

  pub fn clear(&mut self) {
    self.ids.clear();
  }

  /// Drop ids that are not in `existing`. Returns how many were dropped.
  ///
  /// Must run after every change to the collection, before the next
  /// [`Selection::is_all_selected`].
  pub fn prune<I>(
    &mut self,
    existing: I
  ) -> usize
  where
    I: IntoIterator<Item = TaskId>
  {
    let existing: BTreeSet<TaskId> =
      existing.into_iter().collect();
    let before = self.ids.len();
    self
      .ids
      .retain(|id| existing.contains(id));

    let dropped =
      before - self.ids.len();
    if dropped > 0 {
      debug!(
        dropped,
        remaining = self.ids.len(),
        "pruned selection"
      );
    }
    dropped
  }

  pub fn prune_to(
    &mut self,
    tasks: &[Task]
  ) -> usize {
    self.prune(
      tasks.iter().map(|task| task.id)
    )
  }

  /// True iff the selection is exactly the visible set. An empty visible
  /// set is never "all selected".
  pub fn is_all_selected(
    &self,
    visible: &[TaskId]
  ) -> bool {
    if visible.is_empty() {
      return false;
    }

    let visible: BTreeSet<&TaskId> =
      visible.iter().collect();
    visible.len() == self.ids.len()
      && visible
        .iter()
        .all(|id| self.ids.contains(*id))
  }

  /// Header checkbox: clear when everything visible is selected,
  /// otherwise select the visible set.
  pub fn toggle_all_visible(
    &mut self,
    visible: &[TaskId]
  ) {
    if self.is_all_selected(visible) {
      self.clear();
    } else {
      self.select_all_visible(visible);
    }
  }

  pub fn contains(
    &self,
    id: &TaskId
  ) -> bool {
    self.ids.contains(id)
  }

  pub fn len(&self) -> usize {
    self.ids.len()
  }

  pub fn is_empty(&self) -> bool {
    self.ids.is_empty()
  }

  pub fn iter(
    &self
  ) -> impl Iterator<Item = &TaskId> {
    self.ids.iter()
  }
}

impl FromIterator<TaskId> for Selection {
  fn from_iter<I>(iter: I) -> Self
  where
    I: IntoIterator<Item = TaskId>
  {
    Self {
      ids: iter.into_iter().collect()
    }
  }
}
