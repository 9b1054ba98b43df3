//! Owner binding.
//!
//! Owners are opaque identities supplied by the host object model. The
//! binding keeps the reverse index owner -> tasks plus the forward index
//! task -> owner, and drops an owner's entry as soon as its task set is
//! empty. Lifecycle effects of the host signals (stopping or detaching the
//! bound tasks) are applied by the runtime on top of this index.

use std::fmt;

use indexmap::{IndexMap, IndexSet};

use super::error::{TaskError, TaskResult};
use super::state::TaskId;

/// Opaque identity of an external owner context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OwnerId(pub u64);

impl OwnerId {
    /// Create a new owner ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the underlying value
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "Owner({})", self.0)
    }
}

/// Bidirectional owner index.
#[derive(Debug, Default)]
pub struct OwnerBinding {
    by_owner: IndexMap<OwnerId, IndexSet<TaskId>>,
    by_task: IndexMap<TaskId, OwnerId>,
}

impl OwnerBinding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `task` to `owner`, returning the previous owner if it was rebound.
    pub fn bind(
        &mut self,
        task: TaskId,
        owner: OwnerId,
    ) -> Option<OwnerId> {
        let previous = self.by_task.insert(task, owner);
        if let Some(previous) = previous {
            if previous != owner {
                self.detach(previous, task);
            }
        }
        self.by_owner.entry(owner).or_default().insert(task);
        previous.filter(|prev| *prev != owner)
    }

    /// Unbind `task`, returning the owner it was bound to.
    pub fn unbind(
        &mut self,
        task: TaskId,
    ) -> TaskResult<OwnerId> {
        let owner = self
            .by_task
            .shift_remove(&task)
            .ok_or(TaskError::UnboundTask(task))?;
        self.detach(owner, task);
        Ok(owner)
    }

    /// Drop the owner entry entirely, returning the tasks that were bound to it.
    pub fn remove_owner(
        &mut self,
        owner: OwnerId,
    ) -> TaskResult<Vec<TaskId>> {
        let tasks = self
            .by_owner
            .shift_remove(&owner)
            .ok_or(TaskError::UnknownOwner(owner))?;
        for task in &tasks {
            self.by_task.shift_remove(task);
        }
        Ok(tasks.into_iter().collect())
    }

    /// Tasks bound to `owner`, in binding order.
    pub fn tasks_of(
        &self,
        owner: OwnerId,
    ) -> TaskResult<Vec<TaskId>> {
        self.by_owner
            .get(&owner)
            .map(|tasks| tasks.iter().copied().collect())
            .ok_or(TaskError::UnknownOwner(owner))
    }

    #[inline]
    pub fn owner_of(
        &self,
        task: TaskId,
    ) -> Option<OwnerId> {
        self.by_task.get(&task).copied()
    }

    #[inline]
    pub fn contains_owner(
        &self,
        owner: OwnerId,
    ) -> bool {
        self.by_owner.contains_key(&owner)
    }

    #[inline]
    pub fn is_bound(
        &self,
        task: TaskId,
    ) -> bool {
        self.by_task.contains_key(&task)
    }

    /// Tracked owners, in first-binding order.
    pub fn owners(&self) -> impl Iterator<Item = OwnerId> + '_ {
        self.by_owner.keys().copied()
    }

    /// Number of tracked owners.
    #[inline]
    pub fn owner_count(&self) -> usize {
        self.by_owner.len()
    }

    fn detach(
        &mut self,
        owner: OwnerId,
        task: TaskId,
    ) {
        if let Some(tasks) = self.by_owner.get_mut(&owner) {
            tasks.shift_remove(&task);
            if tasks.is_empty() {
                self.by_owner.shift_remove(&owner);
            }
        }
    }
}
