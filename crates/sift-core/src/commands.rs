use anyhow::{
  Context,
  anyhow
};
use chrono::Utc;
use tracing::{
  debug,
  info,
  instrument,
  warn
};

use crate::bulk::{
  BulkOutcome,
  delete_selected,
  mark_selected_complete
};
use crate::cli::{
  AddArgs,
  Command,
  SelectArgs,
  ViewArgs
};
use crate::datastore::DataStore;
use crate::datetime::{
  format_due_date,
  parse_due_date
};
use crate::render::{
  Renderer,
  short_id
};
use crate::selection::Selection;
use crate::task::{
  Priority,
  Task,
  TaskId,
  new_task
};
use crate::view::{
  ViewRequest,
  ViewSummary,
  visible_ids
};

pub fn dispatch(
  store: &DataStore,
  renderer: &Renderer,
  defaults: &ViewRequest,
  command: Command
) -> anyhow::Result<()> {
  debug!(?command, "dispatching command");

  match command {
    | Command::List(args) => {
      cmd_list(
        store, renderer, defaults, &args
      )
    }
    | Command::Add(args) => {
      cmd_add(store, &args)
    }
    | Command::Done(args) => {
      cmd_bulk(
        store,
        defaults,
        &args,
        BulkAction::Complete
      )
    }
    | Command::Delete(args) => {
      cmd_bulk(
        store,
        defaults,
        &args,
        BulkAction::Delete
      )
    }
  }
}

#[instrument(skip(
  store, renderer, defaults, args
))]
fn cmd_list(
  store: &DataStore,
  renderer: &Renderer,
  defaults: &ViewRequest,
  args: &ViewArgs
) -> anyhow::Result<()> {
  info!("command list");

  let view = args.resolve(defaults)?;
  let tasks = store.load()?;
  let visible = view.apply(&tasks);

  renderer.print_task_table(&visible)?;
  renderer.print_summary(
    &ViewSummary::compute(
      &tasks, &visible
    )
  )
}

#[instrument(skip(store, args))]
fn cmd_add(
  store: &DataStore,
  args: &AddArgs
) -> anyhow::Result<()> {
  info!("command add");

  let priority = match &args.priority {
    | Some(raw) => raw.parse()?,
    | None => Priority::default()
  };

  let mut tasks = store.load()?;
  let mut task = new_task(
    &tasks,
    &args.text.join(" "),
    priority,
    Utc::now()
  )?;

  if let Some(raw) = &args.due {
    let date = parse_due_date(raw)
      .ok_or_else(|| {
        anyhow!(
          "invalid due date {raw:?}; \
           expected YYYY-MM-DD"
        )
      })?;
    task.due_date =
      Some(format_due_date(date));
  }
  task.notes = args
    .notes
    .clone()
    .filter(|n| !n.trim().is_empty());
  task.tags = args.tags.clone();

  let short = short_id(&task);
  tasks.push(task);
  store.save(&tasks)?;

  debug!(
    count = tasks.len(),
    "task added"
  );
  println!("Created task {short}.");
  Ok(())
}

#[derive(Debug, Clone, Copy)]
enum BulkAction {
  Complete,
  Delete
}

#[instrument(skip(
  store, defaults, args
))]
fn cmd_bulk(
  store: &DataStore,
  defaults: &ViewRequest,
  args: &SelectArgs,
  action: BulkAction
) -> anyhow::Result<()> {
  info!(?action, "command bulk");

  let tasks = store.load()?;
  let mut selection =
    if args.all_visible {
      let view =
        args.view.resolve(defaults)?;
      let ids =
        visible_ids(&view.apply(&tasks));
      let mut selection =
        Selection::new();
      selection.select_all_visible(&ids);
      selection
    } else {
      select_by_prefix(&tasks, &args.ids)?
    };

  let dropped =
    selection.prune_to(&tasks);
  if dropped > 0 {
    warn!(
      dropped,
      "selected ids no longer exist"
    );
  }

  let outcome: BulkOutcome =
    match action {
      | BulkAction::Complete => {
        mark_selected_complete(
          tasks, &selection
        )
      }
      | BulkAction::Delete => {
        delete_selected(
          tasks, &selection
        )
      }
    };

  if outcome.affected > 0 {
    store
      .save(&outcome.tasks)
      .context(
        "failed to save bulk change"
      )?;
  }

  let verb = match action {
    | BulkAction::Complete => {
      "Completed"
    }
    | BulkAction::Delete => "Deleted"
  };
  println!(
    "{verb} {} task(s).",
    outcome.affected
  );
  Ok(())
}

/// Resolve full ids or unique prefixes of the hyphen-free id. Unknown
/// ids are skipped; ambiguous prefixes are errors.
fn select_by_prefix(
  tasks: &[Task],
  raw_ids: &[String]
) -> anyhow::Result<Selection> {
  let mut ids: Vec<TaskId> = Vec::new();

  for raw in raw_ids {
    let needle = raw
      .trim()
      .to_ascii_lowercase()
      .replace('-', "");
    if needle.is_empty() {
      continue;
    }

    let matches: Vec<TaskId> = tasks
      .iter()
      .map(|task| task.id)
      .filter(|id| {
        id.simple()
          .to_string()
          .starts_with(&needle)
      })
      .collect();

    match matches.as_slice() {
      | [] => {
        warn!(id = %raw, "no task matches id; skipping");
      }
      | [id] => ids.push(*id),
      | _ => {
        return Err(anyhow!(
          "id prefix {raw:?} is \
           ambiguous ({} matches)",
          matches.len()
        ));
      }
    }
  }

  Ok(ids.into_iter().collect())
}
