pub mod bulk;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datastore;
pub mod datetime;
pub mod error;
pub mod filter;
pub mod render;
pub mod selection;
pub mod sort;
pub mod task;
pub mod view;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

pub use bulk::{
  BulkOutcome,
  delete_selected,
  mark_selected_complete
};
pub use error::QueryError;
pub use filter::StatusFilter;
pub use selection::Selection;
pub use sort::{
  SortDirection,
  SortKey,
  build_comparator,
  sort_tasks
};
pub use task::{
  Priority,
  Task,
  TaskId
};
pub use view::{
  ViewRequest,
  ViewSummary,
  query_view,
  visible_ids
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args);
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting sift CLI"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.siftrc.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );
  let defaults = cfg
    .view_defaults()
    .context(
      "invalid view defaults in \
       configuration"
    )?;

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  let store =
    datastore::DataStore::open(
      &data_dir
    )
    .with_context(|| {
      format!(
        "failed to open datastore at \
         {}",
        data_dir.display()
      )
    })?;

  let renderer =
    render::Renderer::new(&cfg)?;
  let command = cli.command.unwrap_or(
    cli::Command::List(
      cli::ViewArgs::default()
    )
  );

  commands::dispatch(
    &store,
    &renderer,
    &defaults,
    command
  )?;

  info!("done");
  Ok(())
}
