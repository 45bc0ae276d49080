//! Ordered in-memory task list.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// A single task. Fields never change after creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Store-assigned id, strictly increasing.
    pub id: u64,
    /// Trimmed, non-empty title.
    pub title: String,
}

#[derive(Debug, Default)]
struct TaskState {
    tasks: Vec<Task>,
    /// Highest id ever issued. Survives deletes so ids are never reused.
    last_id: u64,
}

/// Thread-safe in-memory task list.
///
/// Cloning shares the same underlying list. Every operation holds the lock for
/// its whole duration, so each call is atomic with respect to the others.
#[derive(Clone, Debug, Default)]
pub struct TaskStore {
    state: Arc<Mutex<TaskState>>,
}

impl TaskStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a task. The caller is expected to have trimmed and validated `title`.
    #[instrument(skip(self, title))]
    pub fn add(&self, title: impl Into<String>) -> Task {
        let mut state = self.state.lock();
        state.last_id += 1;
        let task = Task {
            id: state.last_id,
            title: title.into(),
        };
        state.tasks.push(task.clone());
        debug!(task_id = task.id, "task added");
        task
    }

    /// Remove the task with `id`. Returns whether anything was removed.
    #[instrument(skip(self))]
    pub fn delete(&self, id: u64) -> bool {
        let mut state = self.state.lock();
        let Some(pos) = state.tasks.iter().position(|t| t.id == id) else {
            debug!("delete of unknown task ignored");
            return false;
        };
        let _removed = state.tasks.remove(pos);
        debug!("task deleted");
        true
    }

    /// Snapshot of all tasks, oldest first.
    pub fn all(&self) -> Vec<Task> {
        self.state.lock().tasks.clone()
    }

    /// Tasks whose title contains `query`, ignoring case. Order is preserved and
    /// an empty query matches everything.
    pub fn filter(&self, query: &str) -> Vec<Task> {
        let needle = query.to_lowercase();
        self.all()
            .into_iter()
            .filter(|t| t.title.to_lowercase().contains(&needle))
            .collect()
    }

    /// Look up a single task.
    pub fn get(&self, id: u64) -> Option<Task> {
        self.state.lock().tasks.iter().find(|t| t.id == id).cloned()
    }

    /// Number of tasks currently present.
    pub fn len(&self) -> usize {
        self.state.lock().tasks.len()
    }

    /// Whether the store holds no tasks.
    pub fn is_empty(&self) -> bool {
        self.state.lock().tasks.is_empty()
    }
}
