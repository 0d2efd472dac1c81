use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::task::Task;

/// Snapshot sink for the canonical collection. The engine never touches
/// it; the CLI loads before a command and saves after a mutation.
#[derive(Debug)]
pub struct DataStore {
    pub tasks_path: PathBuf,
}

impl DataStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let tasks_path = data_dir.join("tasks.json");
        if !tasks_path.exists() {
            fs::write(&tasks_path, "[]\n")
                .with_context(|| format!("failed to create {}", tasks_path.display()))?;
        }

        info!(
            data_dir = %data_dir.display(),
            tasks = %tasks_path.display(),
            "opened datastore"
        );

        Ok(Self { tasks_path })
    }

    #[tracing::instrument(skip(self))]
    pub fn load(&self) -> anyhow::Result<Vec<Task>> {
        let text = fs::read_to_string(&self.tasks_path)
            .with_context(|| format!("failed to read {}", self.tasks_path.display()))?;
        if text.trim().is_empty() {
            return Ok(vec![]);
        }

        let tasks: Vec<Task> = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse {}", self.tasks_path.display()))?;
        ensure_unique_ids(&tasks)?;

        debug!(count = tasks.len(), "loaded tasks");
        Ok(tasks)
    }

    #[tracing::instrument(skip(self, tasks), fields(count = tasks.len()))]
    pub fn save(&self, tasks: &[Task]) -> anyhow::Result<()> {
        save_json_atomic(&self.tasks_path, tasks).context("failed to save tasks.json")
    }
}

fn ensure_unique_ids(tasks: &[Task]) -> anyhow::Result<()> {
    let mut seen = std::collections::BTreeSet::new();
    for task in tasks {
        if !seen.insert(task.id) {
            return Err(anyhow!("duplicate task id in snapshot: {}", task.id));
        }
    }
    Ok(())
}

fn save_json_atomic(path: &Path, tasks: &[Task]) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow!("path has no parent: {}", path.display()))?;

    let mut tmp = NamedTempFile::new_in(parent)
        .with_context(|| format!("failed to create temp file in {}", parent.display()))?;

    serde_json::to_writer_pretty(&mut tmp, tasks)?;
    tmp.write_all(b"\n")?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;

    tmp.persist(path)
        .map_err(|e| anyhow!("failed to persist {}: {}", path.display(), e))?;

    debug!(path = %path.display(), count = tasks.len(), "saved snapshot");
    Ok(())
}
