use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::task::{Category, Task};

pub const TASKS_SLOT: &str = "tasks.json";
pub const ACTIVE_TAB_SLOT: &str = "active_tab";

/// Local persistent slots. The task slot always holds the whole list.
#[derive(Debug)]
pub struct DataStore {
    pub data_dir: PathBuf,
    pub tasks_path: PathBuf,
    pub active_tab_path: PathBuf,
}

impl DataStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let tasks_path = data_dir.join(TASKS_SLOT);
        let active_tab_path = data_dir.join(ACTIVE_TAB_SLOT);

        info!(
            data_dir = %data_dir.display(),
            tasks = %tasks_path.display(),
            active_tab = %active_tab_path.display(),
            "opened datastore"
        );

        Ok(Self {
            data_dir,
            tasks_path,
            active_tab_path,
        })
    }

    /// `None` means the slot was never written, or holds only whitespace
    /// (an interrupted first write).
    #[tracing::instrument(skip(self))]
    pub fn load_tasks(&self) -> anyhow::Result<Option<Vec<Task>>> {
        let Some(raw) = read_slot(&self.tasks_path)? else {
            debug!("no persisted task list");
            return Ok(None);
        };
        if raw.trim().is_empty() {
            warn!(path = %self.tasks_path.display(), "task slot is blank; treating as unset");
            return Ok(None);
        }

        let tasks: Vec<Task> = serde_json::from_str(&raw)
            .with_context(|| format!("failed parsing {}", self.tasks_path.display()))?;
        debug!(count = tasks.len(), "loaded persisted task list");
        Ok(Some(tasks))
    }

    #[tracing::instrument(skip(self, tasks), fields(count = tasks.len()))]
    pub fn save_tasks(&self, tasks: &[Task]) -> anyhow::Result<()> {
        let serialized = serde_json::to_string(tasks)?;
        write_slot_atomic(&self.tasks_path, &serialized).context("failed to save tasks.json")
    }

    #[tracing::instrument(skip(self))]
    pub fn get_active_tab(&self) -> anyhow::Result<Option<Category>> {
        let Some(raw) = read_slot(&self.active_tab_path)? else {
            return Ok(None);
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        match trimmed.parse::<Category>() {
            Ok(category) => Ok(Some(category)),
            Err(err) => {
                warn!(value = %trimmed, error = %err, "ignoring unreadable active tab");
                Ok(None)
            }
        }
    }

    #[tracing::instrument(skip(self))]
    pub fn set_active_tab(&self, category: Category) -> anyhow::Result<()> {
        write_slot_atomic(&self.active_tab_path, category.label())
            .context("failed to save active tab")
    }
}

fn read_slot(path: &Path) -> anyhow::Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(raw) => Ok(Some(raw)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err).with_context(|| format!("failed reading {}", path.display())),
    }
}

#[tracing::instrument(skip(path, payload))]
fn write_slot_atomic(path: &Path, payload: &str) -> anyhow::Result<()> {
    debug!(file = %path.display(), bytes = payload.len(), "writing slot atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(payload.as_bytes())?;
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::task::Stage;

    #[test]
    fn missing_slots_read_as_none() {
        let temp = tempdir().expect("tempdir");
        let store = DataStore::open(temp.path()).expect("open datastore");
        assert_eq!(store.load_tasks().expect("load"), None);
        assert_eq!(store.get_active_tab().expect("tab"), None);
    }

    #[test]
    fn empty_list_is_still_a_persisted_slot() {
        let temp = tempdir().expect("tempdir");
        let store = DataStore::open(temp.path()).expect("open datastore");
        store.save_tasks(&[]).expect("save");
        assert_eq!(store.load_tasks().expect("load"), Some(vec![]));
    }

    #[test]
    fn slot_is_overwritten_wholesale() {
        let temp = tempdir().expect("tempdir");
        let store = DataStore::open(temp.path()).expect("open datastore");
        store
            .save_tasks(&[
                Task::new(1, "A", Category::Work, Stage::New),
                Task::new(2, "B", Category::Work, Stage::New),
            ])
            .expect("save");
        store
            .save_tasks(&[Task::new(2, "B", Category::Work, Stage::Ongoing)])
            .expect("save");

        let raw = fs::read_to_string(&store.tasks_path).expect("read");
        assert_eq!(
            raw,
            r#"[{"id":2,"task":"B","category":"Work","stage":"Ongoing"}]"#
        );
    }

    #[test]
    fn blank_slot_reads_as_unset() {
        let temp = tempdir().expect("tempdir");
        let store = DataStore::open(temp.path()).expect("open datastore");
        fs::write(&store.tasks_path, "").expect("write");
        assert_eq!(store.load_tasks().expect("load"), None);
        fs::write(&store.tasks_path, " \n\t").expect("write");
        assert_eq!(store.load_tasks().expect("load"), None);
    }

    #[test]
    fn open_creates_missing_data_dir() {
        let temp = tempdir().expect("tempdir");
        let nested = temp.path().join("a").join("b");
        let store = DataStore::open(&nested).expect("open datastore");
        assert!(nested.is_dir());
        store.save_tasks(&[]).expect("save");
        assert!(nested.join(TASKS_SLOT).is_file());
    }

    #[test]
    fn corrupt_slot_names_the_file() {
        let temp = tempdir().expect("tempdir");
        let store = DataStore::open(temp.path()).expect("open datastore");
        fs::write(&store.tasks_path, "{not json").expect("write");
        let err = store.load_tasks().expect_err("corrupt slot");
        assert!(format!("{err:#}").contains(TASKS_SLOT));
    }

    #[test]
    fn active_tab_round_trip_and_garbage() {
        let temp = tempdir().expect("tempdir");
        let store = DataStore::open(temp.path()).expect("open datastore");
        store.set_active_tab(Category::Personal).expect("set");
        assert_eq!(store.get_active_tab().expect("get"), Some(Category::Personal));

        fs::write(&store.active_tab_path, "Garden").expect("write");
        assert_eq!(store.get_active_tab().expect("get"), None);
    }
}
