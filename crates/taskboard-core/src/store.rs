use tracing::{debug, warn};

use crate::remote::RemoteOp;
use crate::task::{Category, Stage, Task};

/// The in-memory task list. Every mutation returns the remote operation it
/// implies, or `None` when nothing changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskStore {
    tasks: Vec<Task>,
}

impl TaskStore {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    pub fn from_remote<I>(todos: I) -> Self
    where
        I: IntoIterator<Item = crate::task::RemoteTodo>,
    {
        Self {
            tasks: todos.into_iter().map(Task::from).collect(),
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: u64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn in_category(&self, category: Category) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(move |t| t.category == category)
    }

    #[tracing::instrument(skip(self, text))]
    pub fn add(&mut self, text: &str, category: Category, stage: Stage) -> Option<RemoteOp> {
        let text = text.trim();
        if text.is_empty() {
            debug!("ignoring add with empty text");
            return None;
        }

        // Ids are count based and can repeat an imported id.
        let id = self.tasks.len() as u64 + 1;
        if self.get(id).is_some() {
            warn!(id, "new task id collides with an existing task");
        }

        let task = Task::new(id, text, category, stage);
        self.tasks.push(task.clone());
        debug!(id, count = self.tasks.len(), "task added");
        Some(RemoteOp::Create(task))
    }

    #[tracing::instrument(skip(self))]
    pub fn remove(&mut self, id: u64) -> Option<RemoteOp> {
        let Some(idx) = self.tasks.iter().position(|t| t.id == id) else {
            debug!(id, "remove: no such task");
            return None;
        };
        self.tasks.remove(idx);
        Some(RemoteOp::Delete(id))
    }

    #[tracing::instrument(skip(self, new_text))]
    pub fn edit(&mut self, id: u64, new_text: &str) -> Option<RemoteOp> {
        let new_text = new_text.trim();
        if new_text.is_empty() {
            debug!(id, "ignoring edit with empty text");
            return None;
        }
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            debug!(id, "edit: no such task");
            return None;
        };
        task.task = new_text.to_string();
        Some(RemoteOp::Update(task.clone()))
    }

    #[tracing::instrument(skip(self))]
    pub fn set_stage(&mut self, id: u64, stage: Stage) -> Option<RemoteOp> {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            debug!(id, "set_stage: no such task");
            return None;
        };
        task.stage = stage;
        Some(RemoteOp::Update(task.clone()))
    }
}
