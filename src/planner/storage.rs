use super::task::Task;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const APP_DIR: &str = "taskflow";
const TASKS_FILE: &str = "tasks.json";

/// Where the task list lives between runs.
pub trait TaskRepository {
    /// The saved list, or an empty one when nothing was saved yet.
    fn load(&self) -> Result<Vec<Task>>;

    fn save(&self, tasks: &[Task]) -> Result<()>;
}

/// The persisted document: one ordered list under the `tasks` slot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskList {
    pub tasks: Vec<Task>,
}

// A bare array is what older exports hold; read it as the slot's contents.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredList {
    Slot(TaskList),
    Bare(Vec<Task>),
}

pub fn default_data_path() -> PathBuf {
    let mut dir = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    dir.push(APP_DIR);
    dir.push(TASKS_FILE);
    dir
}

#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Moves an unreadable file out of the way so the next save does not
    /// overwrite it. Returns the new location.
    pub fn quarantine(&self) -> Result<PathBuf> {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".corrupt");
        let target = self.path.with_file_name(name);
        fs::rename(&self.path, &target)?;
        warn!(from = %self.path.display(), to = %target.display(), "Moved unreadable task file aside");
        Ok(target)
    }
}

impl TaskRepository for JsonFileStorage {
    fn load(&self) -> Result<Vec<Task>> {
        if !self.path.exists() {
            info!(path = %self.path.display(), "No task file yet, starting empty");
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let tasks = match serde_json::from_str::<StoredList>(&content)? {
            StoredList::Slot(list) => list.tasks,
            StoredList::Bare(tasks) => tasks,
        };

        info!(path = %self.path.display(), count = tasks.len(), "Loaded tasks");
        Ok(tasks)
    }

    fn save(&self, tasks: &[Task]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let list = TaskList {
            tasks: tasks.to_vec(),
        };
        let json = serde_json::to_string_pretty(&list)?;

        // write-then-rename so a crash never leaves a half-written list
        let mut tmp_name = self.path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".tmp");
        let tmp = self.path.with_file_name(tmp_name);
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;

        info!(path = %self.path.display(), count = tasks.len(), "Saved tasks");
        Ok(())
    }
}

/// Keeps the list in memory only. Used for `--ephemeral` runs and tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    tasks: RefCell<Vec<Task>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TaskRepository for MemoryStorage {
    fn load(&self) -> Result<Vec<Task>> {
        Ok(self.tasks.borrow().clone())
    }

    fn save(&self, tasks: &[Task]) -> Result<()> {
        *self.tasks.borrow_mut() = tasks.to_vec();
        Ok(())
    }
}
