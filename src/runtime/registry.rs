//! Live task registry.
//!
//! Insertion-ordered set of every non-destroyed task of a runtime. Queries
//! are linear scans; the driver iterates in registration order.

use indexmap::IndexMap;

use super::state::{StateMask, TaskId};
use super::task::Task;

/// Registry of live tasks.
#[derive(Debug, Default)]
pub struct Registry {
    tasks: IndexMap<TaskId, Task>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task. Re-registering an ID keeps its original position.
    pub fn register(
        &mut self,
        task: Task,
    ) {
        self.tasks.entry(task.id()).or_insert(task);
    }

    /// Remove a task, preserving the order of the rest.
    pub fn unregister(
        &mut self,
        id: TaskId,
    ) -> Option<Task> {
        self.tasks.shift_remove(&id)
    }

    #[inline]
    pub fn get(
        &self,
        id: TaskId,
    ) -> Option<&Task> {
        self.tasks.get(&id)
    }

    #[inline]
    pub fn contains(
        &self,
        id: TaskId,
    ) -> bool {
        self.tasks.contains_key(&id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Registered IDs in registration order.
    pub fn ids(&self) -> Vec<TaskId> {
        self.tasks.keys().copied().collect()
    }

    /// Handles of every registered task, in registration order.
    pub fn snapshot(&self) -> Vec<Task> {
        self.tasks.values().cloned().collect()
    }

    /// Tasks whose current state is in `mask`.
    pub fn query(
        &self,
        mask: StateMask,
    ) -> Vec<Task> {
        self.tasks
            .values()
            .filter(|task| mask.contains(task.state()))
            .cloned()
            .collect()
    }

    /// Unowned tasks whose current state is in `mask`.
    pub fn unowned(
        &self,
        mask: StateMask,
    ) -> Vec<Task> {
        self.tasks
            .values()
            .filter(|task| task.owner().is_none() && mask.contains(task.state()))
            .cloned()
            .collect()
    }
}
