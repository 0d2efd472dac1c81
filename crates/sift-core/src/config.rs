use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use tracing::{
  debug,
  info,
  trace,
  warn
};

use crate::error::QueryError;
use crate::view::ViewRequest;

const SIFTRC_ENV_VAR: &str = "SIFTRC";

#[derive(Debug, Clone)]
pub struct Config {
  map: HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    let mut map = HashMap::new();
    map.insert(
      "data.location".to_string(),
      "~/.sift".to_string()
    );
    map.insert(
      "default.status".to_string(),
      "all".to_string()
    );
    map.insert(
      "default.sort".to_string(),
      "createdAt".to_string()
    );
    map.insert(
      "default.direction".to_string(),
      "desc".to_string()
    );
    map.insert(
      "color".to_string(),
      "on".to_string()
    );

    Self {
      map,
      loaded_files: vec![]
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    siftrc_override
  ))]
  pub fn load(
    siftrc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    let siftrc = resolve_siftrc_path(
      siftrc_override
    )?;
    if let Some(path) = siftrc {
      info!(siftrc = %path.display(), "loading siftrc");
      cfg.load_file(&path, &mut Vec::new())?;
    } else {
      warn!(
        "no siftrc found; using \
         defaults"
      );
    }

    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      self.map.insert(key, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  /// Boolean setting; `None` when unset, an error for values that are
  /// neither truthy nor falsy.
  pub fn get_bool(
    &self,
    key: &str
  ) -> anyhow::Result<Option<bool>> {
    let Some(raw) = self.map.get(key)
    else {
      return Ok(None);
    };

    parse_bool(raw)
      .map(Some)
      .ok_or_else(|| {
        anyhow!(
          "invalid boolean for {key}: \
           {raw}"
        )
      })
  }

  /// The view used when the command line does not say otherwise.
  /// Unrecognized values are errors, not silently replaced.
  pub fn view_defaults(
    &self
  ) -> Result<ViewRequest, QueryError> {
    let mut view = ViewRequest::default();

    if let Some(raw) =
      self.map.get("default.status")
    {
      view.status = raw.parse()?;
    }
    if let Some(raw) =
      self.map.get("default.sort")
    {
      view.sort_key = raw.parse()?;
    }
    if let Some(raw) =
      self.map.get("default.direction")
    {
      view.direction = raw.parse()?;
    }

    trace!(?view, "resolved view defaults");
    Ok(view)
  }

  /// `loading` holds the canonical paths of the files currently being
  /// read, outermost first.
  #[tracing::instrument(skip(
    self, loading
  ))]
  fn load_file(
    &mut self,
    path: &Path,
    loading: &mut Vec<PathBuf>
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;

    let canonical = fs::canonicalize(
      &path
    )
    .with_context(|| {
      format!(
        "failed to resolve {}",
        path.display()
      )
    })?;
    if loading.contains(&canonical) {
      return Err(anyhow!(
        "include cycle at {}",
        path.display()
      ));
    }

    self
      .loaded_files
      .push(path.clone());

    let base_dir = path
      .parent()
      .map(|p| p.to_path_buf())
      .unwrap_or_else(|| {
        PathBuf::from(".")
      });

    loading.push(canonical);
    let result = self.load_lines(
      &path, &base_dir, &text, loading
    );
    loading.pop();
    result
  }

  fn load_lines(
    &mut self,
    path: &Path,
    base_dir: &Path,
    text: &str,
    loading: &mut Vec<PathBuf>
  ) -> anyhow::Result<()> {
    for (line_num, raw_line) in
      text.lines().enumerate()
    {
      let mut line = raw_line.trim();
      if let Some((before, _)) =
        line.split_once('#')
      {
        line = before.trim();
      }

      if line.is_empty() {
        continue;
      }

      if let Some(include_rest) =
        line.strip_prefix("include ")
      {
        let include_path =
          resolve_include_path(
            base_dir,
            include_rest.trim()
          )?;
        debug!(
            file = %path.display(),
            include = %include_path.display(),
            line = line_num + 1,
            "processing include"
        );

        if include_path.exists() {
          self.load_file(
            &include_path,
            loading
          )?;
        } else {
          warn!(include = %include_path.display(), "include file does not exist; skipping");
        }
        continue;
      }

      let (k, v) = line
        .split_once('=')
        .ok_or_else(|| {
          anyhow!(
            "invalid config line \
             {}:{}: {}",
            path.display(),
            line_num + 1,
            raw_line
          )
        })?;

      let key = k.trim().to_string();
      let value = v.trim().to_string();
      trace!(key = %key, value = %value, "loaded config key");
      self.map.insert(key, value);
    }

    Ok(())
  }
}

#[tracing::instrument(skip(
  cfg,
  override_dir
))]
pub fn resolve_data_dir(
  cfg: &Config,
  override_dir: Option<&Path>
) -> anyhow::Result<PathBuf> {
  let dir = if let Some(path) =
    override_dir
  {
    path.to_path_buf()
  } else if let Some(cfg_value) =
    cfg.get("data.location")
  {
    expand_tilde(Path::new(&cfg_value))
  } else {
    default_data_dir()?
  };

  Ok(dir)
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_siftrc_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(siftrc_env) =
    std::env::var(SIFTRC_ENV_VAR)
  {
    if siftrc_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      siftrc_env
    )));
  }

  let Some(home) = dirs::home_dir()
  else {
    warn!(
      "cannot determine home \
       directory; skipping ~/.siftrc"
    );
    return Ok(None);
  };
  let candidate = home.join(".siftrc");
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn default_data_dir()
-> anyhow::Result<PathBuf> {
  let home = dirs::home_dir()
    .ok_or_else(|| {
      anyhow!(
        "cannot determine home \
         directory"
      )
    })?;
  Ok(home.join(".sift"))
}

fn resolve_include_path(
  base_dir: &Path,
  include: &str
) -> anyhow::Result<PathBuf> {
  if include.trim().is_empty() {
    return Err(anyhow!(
      "include path cannot be empty"
    ));
  }

  let raw = PathBuf::from(include);
  let expanded = expand_tilde(&raw);
  if expanded.is_absolute() {
    Ok(expanded)
  } else {
    Ok(base_dir.join(expanded))
  }
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

fn parse_bool(s: &str) -> Option<bool> {
  match s
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "1" | "y" | "yes" | "on"
    | "true" => Some(true),
    | "0" | "n" | "no" | "off"
    | "false" => Some(false),
    | _ => None
  }
}

#[cfg(test)]
mod tests {
  use std::fs;

  use tempfile::tempdir;

  use super::Config;
  use crate::error::QueryError;
  use crate::filter::StatusFilter;
  use crate::sort::{
    SortDirection,
    SortKey
  };

  #[test]
  fn loads_file_with_comments_and_includes()
  {
    let dir = tempdir().unwrap();
    let extra = dir.path().join("extra.rc");
    fs::write(
      &extra,
      "default.direction = asc\n"
    )
    .unwrap();

    let main = dir.path().join("siftrc");
    fs::write(
      &main,
      "# view defaults\n\
       default.sort = dueDate  # soonest first\n\
       include extra.rc\n\
       color = off\n"
    )
    .unwrap();

    let cfg =
      Config::load(Some(main.as_path())).unwrap();
    assert_eq!(cfg.loaded_files.len(), 2);
    assert_eq!(
      cfg.get_bool("color").unwrap(),
      Some(false)
    );

    let view = cfg.view_defaults().unwrap();
    assert_eq!(
      view.sort_key,
      SortKey::DueDate
    );
    assert_eq!(
      view.direction,
      SortDirection::Asc
    );
    assert_eq!(
      view.status,
      StatusFilter::All
    );
  }

  #[test]
  fn overrides_win_and_are_validated() {
    let mut cfg = Config::default();
    cfg.apply_overrides([(
      "rc.default.status".to_string(),
      "completed".to_string()
    )]);
    assert_eq!(
      cfg.view_defaults().unwrap().status,
      StatusFilter::Completed
    );

    cfg.apply_overrides([(
      "default.sort".to_string(),
      "urgency".to_string()
    )]);
    assert!(matches!(
      cfg.view_defaults(),
      Err(QueryError::InvalidInput {
        field: "sort key",
        ..
      })
    ));
  }

  #[test]
  fn rejects_lines_without_equals() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("siftrc");
    fs::write(&path, "nonsense\n")
      .unwrap();
    assert!(Config::load(Some(path.as_path())).is_err());
  }

  #[test]
  fn bool_settings_reject_unknown_values()
  {
    let mut cfg = Config::default();
    assert_eq!(
      cfg.get_bool("color").unwrap(),
      Some(true)
    );
    assert_eq!(
      cfg.get_bool("missing").unwrap(),
      None
    );

    cfg.apply_overrides([(
      "color".to_string(),
      "N".to_string()
    )]);
    assert_eq!(
      cfg.get_bool("color").unwrap(),
      Some(false)
    );

    cfg.apply_overrides([(
      "color".to_string(),
      "sometimes".to_string()
    )]);
    assert!(cfg.get_bool("color").is_err());
  }

  #[test]
  fn self_include_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("loop.rc");
    fs::write(
      &path,
      "color = off\ninclude loop.rc\n"
    )
    .unwrap();

    let err =
      Config::load(Some(path.as_path()))
        .unwrap_err();
    assert!(
      format!("{err:#}")
        .contains("include cycle")
    );
  }

  #[test]
  fn include_cycle_through_two_files_is_an_error()
   {
    let dir = tempdir().unwrap();
    fs::write(
      dir.path().join("a.rc"),
      "include b.rc\n"
    )
    .unwrap();
    fs::write(
      dir.path().join("b.rc"),
      "include ./a.rc\n"
    )
    .unwrap();

    let err = Config::load(Some(
      dir.path().join("a.rc").as_path()
    ))
    .unwrap_err();
    assert!(
      format!("{err:#}")
        .contains("include cycle")
    );
  }

  #[test]
  fn repeated_non_cyclic_include_is_allowed()
   {
    let dir = tempdir().unwrap();
    fs::write(
      dir.path().join("shared.rc"),
      "default.status = active\n"
    )
    .unwrap();
    let main = dir.path().join("siftrc");
    fs::write(
      &main,
      "include shared.rc\n\
       include shared.rc\n"
    )
    .unwrap();

    let cfg =
      Config::load(Some(main.as_path()))
        .unwrap();
    assert_eq!(cfg.loaded_files.len(), 3);
    assert_eq!(
      cfg.view_defaults().unwrap().status,
      StatusFilter::Active
    );
  }
}
