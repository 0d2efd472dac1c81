use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::error::QueryError;
use crate::view::ViewRequest;

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "sift",
    version,
    about = "Sift: search, sort and bulk-edit a task list",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "siftrc")]
    pub siftrc: Option<PathBuf>,

    #[arg(long = "data")]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Show the visible set for a search, status filter and sort order
    List(ViewArgs),
    /// Add a task
    Add(AddArgs),
    /// Mark tasks completed
    Done(SelectArgs),
    /// Delete tasks
    Delete(SelectArgs),
}

/// Raw view flags; validated against the configured defaults by
/// [`ViewArgs::resolve`].
#[derive(Args, Debug, Clone, Default)]
pub struct ViewArgs {
    #[arg(short = 's', long)]
    pub search: Option<String>,

    /// all, active or completed
    #[arg(long)]
    pub status: Option<String>,

    /// createdAt, dueDate, priority or text
    #[arg(long)]
    pub sort: Option<String>,

    /// asc or desc
    #[arg(long)]
    pub direction: Option<String>,
}

impl ViewArgs {
    pub fn resolve(&self, defaults: &ViewRequest) -> Result<ViewRequest, QueryError> {
        let mut view = defaults.clone();
        if let Some(search) = &self.search {
            view.search = search.clone();
        }
        if let Some(status) = &self.status {
            view.status = status.parse()?;
        }
        if let Some(sort) = &self.sort {
            view.sort_key = sort.parse()?;
        }
        if let Some(direction) = &self.direction {
            view.direction = direction.parse()?;
        }
        Ok(view)
    }
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    #[arg(required = true, num_args = 1..)]
    pub text: Vec<String>,

    /// low, medium or high
    #[arg(short = 'p', long)]
    pub priority: Option<String>,

    /// Due date as YYYY-MM-DD
    #[arg(long)]
    pub due: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,

    #[arg(short = 't', long = "tag", action = ArgAction::Append)]
    pub tags: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct SelectArgs {
    /// Task ids or unique id prefixes
    #[arg(required_unless_present = "all_visible")]
    pub ids: Vec<String>,

    /// Select every task in the view described by the view flags
    #[arg(long, conflicts_with = "ids")]
    pub all_visible: bool,

    #[command(flatten)]
    pub view: ViewArgs,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

/// Pull positional `rc.KEY=VALUE` / `rc.KEY:VALUE` overrides out of the
/// argument list before clap sees it.
#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> PreprocessedArgs {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut iter = raw.iter().cloned();
    if let Some(bin) = iter.next() {
        cleaned.push(bin);
    }

    for arg in iter {
        let s = arg.to_string_lossy();
        if let Some(rest) = s.strip_prefix("rc.") {
            let parsed = rest
                .split_once('=')
                .or_else(|| rest.split_once(':'))
                .map(|(k, v)| (format!("rc.{k}"), v.to_string()));

            if let Some((k, v)) = parsed {
                debug!(key = %k, value = %v, "captured positional rc override");
                overrides.push((k, v));
                continue;
            }
        }

        cleaned.push(arg);
    }

    PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;

    use clap::Parser;

    use super::{Command, GlobalCli, ViewArgs, preprocess_args};
    use crate::filter::StatusFilter;
    use crate::sort::{SortDirection, SortKey};
    use crate::view::ViewRequest;

    fn args(items: &[&str]) -> Vec<OsString> {
        items.iter().map(OsString::from).collect()
    }

    #[test]
    fn positional_rc_overrides_are_extracted() {
        let pre = preprocess_args(&args(&["sift", "rc.color=off", "list", "rc.default.sort:text"]));

        assert_eq!(pre.cleaned_args, args(&["sift", "list"]));
        assert_eq!(
            pre.rc_overrides,
            vec![
                ("rc.color".to_string(), "off".to_string()),
                ("rc.default.sort".to_string(), "text".to_string()),
            ]
        );
    }

    #[test]
    fn view_flags_override_defaults() {
        let flags = ViewArgs {
            search: Some("milk".to_string()),
            status: None,
            sort: Some("due".to_string()),
            direction: Some("asc".to_string()),
        };
        let view = flags.resolve(&ViewRequest::default()).unwrap();

        assert_eq!(view.search, "milk");
        assert_eq!(view.status, StatusFilter::All);
        assert_eq!(view.sort_key, SortKey::DueDate);
        assert_eq!(view.direction, SortDirection::Asc);
    }

    #[test]
    fn bad_view_flag_is_an_error() {
        let flags = ViewArgs {
            status: Some("pending".to_string()),
            ..ViewArgs::default()
        };
        assert!(flags.resolve(&ViewRequest::default()).is_err());
    }

    #[test]
    fn done_accepts_all_visible_without_ids() {
        let cli = GlobalCli::try_parse_from(["sift", "done", "--all-visible", "--status", "active"])
            .unwrap();
        let Some(Command::Done(select)) = cli.command else {
            panic!("expected done command");
        };
        assert!(select.all_visible);
        assert!(select.ids.is_empty());
        assert_eq!(select.view.status.as_deref(), Some("active"));

        assert!(GlobalCli::try_parse_from(["sift", "delete"]).is_err());
    }
}
