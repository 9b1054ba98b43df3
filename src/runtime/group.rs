//! Task groups.
//!
//! A [`TaskGroup`] is an ordered view over task handles. It owns no
//! scheduling logic: every control call is applied to each member in
//! insertion order, per-member outcomes are collected into a
//! [`GroupReport`], and the group event fires once afterwards. A panicking
//! listener is logged and the remaining listeners still run.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::error;

use super::error::{TaskError, TaskResult};
use super::owner::OwnerId;
use super::state::{ControlStatus, StateMask, TaskId, TaskState};
use super::task::{panic_message, Task};
use super::wait::WaitCombinator;

/// Callback invoked on a group event.
pub type GroupListener = Arc<dyn Fn(&TaskGroup) + Send + Sync>;

/// Events fired once per group control call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupEvent {
    Reset,
    Run,
    Stopped,
    Destroyed,
}

/// Per-member outcomes of a group control call.
#[derive(Debug, Default)]
pub struct GroupReport {
    pub statuses: Vec<(TaskId, TaskResult<ControlStatus>)>,
}

impl GroupReport {
    /// Whether no member reported an error.
    pub fn is_ok(&self) -> bool {
        self.statuses.iter().all(|(_, status)| status.is_ok())
    }

    /// Members that reported an error.
    pub fn errors(&self) -> impl Iterator<Item = (TaskId, &TaskError)> + '_ {
        self.statuses
            .iter()
            .filter_map(|(id, status)| status.as_ref().err().map(|err| (*id, err)))
    }

    /// Number of members whose state changed.
    pub fn applied(&self) -> usize {
        self.statuses
            .iter()
            .filter(|(_, status)| matches!(status, Ok(status) if status.is_applied()))
            .count()
    }
}

/// Ordered, duplicate-permitting collection of tasks with batch control.
#[derive(Clone, Default)]
pub struct TaskGroup {
    tasks: Vec<Task>,
    listeners: Vec<(GroupEvent, GroupListener)>,
}

impl TaskGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a member.
    pub fn push(
        &mut self,
        task: Task,
    ) {
        self.tasks.push(task);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    #[inline]
    pub fn get(
        &self,
        index: usize,
    ) -> Option<&Task> {
        self.tasks.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Task> {
        self.tasks.iter()
    }

    /// The shared owner, if every member is bound to the same one.
    pub fn owner(&self) -> Option<OwnerId> {
        let first = self.tasks.first()?.owner()?;
        self.tasks
            .iter()
            .skip(1)
            .all(|task| task.owner() == Some(first))
            .then_some(first)
    }

    fn all_in(
        &self,
        state: TaskState,
    ) -> bool {
        self.tasks.iter().all(|task| task.state() == state)
    }

    pub fn is_reset(&self) -> bool {
        self.all_in(TaskState::Reset)
    }

    pub fn is_running(&self) -> bool {
        self.all_in(TaskState::Running)
    }

    pub fn is_stopped(&self) -> bool {
        self.all_in(TaskState::Stopped)
    }

    pub fn is_completed(&self) -> bool {
        self.all_in(TaskState::Completed)
    }

    pub fn is_destroyed(&self) -> bool {
        self.all_in(TaskState::Destroyed)
    }

    /// Whether every member auto-destroys.
    pub fn auto_destroy(&self) -> bool {
        self.tasks.iter().all(Task::auto_destroy)
    }

    pub fn set_auto_destroy(
        &self,
        auto_destroy: bool,
    ) -> &Self {
        for task in &self.tasks {
            task.set_auto_destroy(auto_destroy);
        }
        self
    }

    /// Unowned members whose state is in `mask`.
    pub fn unowned(
        &self,
        mask: StateMask,
    ) -> Vec<Task> {
        self.tasks
            .iter()
            .filter(|task| task.owner().is_none() && mask.contains(task.state()))
            .cloned()
            .collect()
    }

    /// Bind every member to `owner`.
    pub fn set_owner(
        &self,
        owner: OwnerId,
    ) -> Vec<(TaskId, TaskResult<Option<OwnerId>>)> {
        self.tasks
            .iter()
            .map(|task| (task.id(), task.set_owner(owner)))
            .collect()
    }

    /// Unbind every member.
    pub fn make_unowned(&self) -> Vec<(TaskId, TaskResult<OwnerId>)> {
        self.tasks
            .iter()
            .map(|task| (task.id(), task.make_unowned()))
            .collect()
    }

    fn apply(
        &self,
        event: GroupEvent,
        op: impl Fn(&Task) -> TaskResult<ControlStatus>,
    ) -> GroupReport {
        let statuses = self.tasks.iter().map(|task| (task.id(), op(task))).collect();
        self.fire(event);
        GroupReport { statuses }
    }

    pub fn reset(&self) -> GroupReport {
        self.apply(GroupEvent::Reset, Task::reset)
    }

    pub fn run(&self) -> GroupReport {
        self.apply(GroupEvent::Run, Task::run)
    }

    pub fn stop(&self) -> GroupReport {
        self.apply(GroupEvent::Stopped, Task::stop)
    }

    /// Destroy every member. The group itself stays usable as a (dead) view.
    pub fn destroy(&self) -> GroupReport {
        self.apply(GroupEvent::Destroyed, Task::destroy)
    }

    /// Reset, then run. Both group events fire; the report holds reset outcomes first.
    pub fn rerun(&self) -> GroupReport {
        let mut report = self.reset();
        report.statuses.extend(self.run().statuses);
        report
    }

    /// Subscribe to `event`.
    pub fn on<F>(
        &mut self,
        event: GroupEvent,
        listener: F,
    ) -> &mut Self
    where
        F: Fn(&TaskGroup) + Send + Sync + 'static,
    {
        self.listeners.push((event, Arc::new(listener)));
        self
    }

    pub fn on_reset<F: Fn(&TaskGroup) + Send + Sync + 'static>(
        &mut self,
        listener: F,
    ) -> &mut Self {
        self.on(GroupEvent::Reset, listener)
    }

    pub fn on_run<F: Fn(&TaskGroup) + Send + Sync + 'static>(
        &mut self,
        listener: F,
    ) -> &mut Self {
        self.on(GroupEvent::Run, listener)
    }

    pub fn on_stopped<F: Fn(&TaskGroup) + Send + Sync + 'static>(
        &mut self,
        listener: F,
    ) -> &mut Self {
        self.on(GroupEvent::Stopped, listener)
    }

    pub fn on_destroyed<F: Fn(&TaskGroup) + Send + Sync + 'static>(
        &mut self,
        listener: F,
    ) -> &mut Self {
        self.on(GroupEvent::Destroyed, listener)
    }

    fn fire(
        &self,
        event: GroupEvent,
    ) {
        for (_, listener) in self.listeners.iter().filter(|(on, _)| *on == event) {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| listener(self))) {
                error!(
                    "group of {} {:?} listener panicked: {}",
                    self.tasks.len(),
                    event,
                    panic_message(payload.as_ref())
                );
            }
        }
    }

    fn wait_all(
        &self,
        target: TaskState,
    ) -> WaitCombinator {
        WaitCombinator::all(self.tasks.iter().map(|task| task.wait_for(target)))
    }

    /// Pending until every member is completed (or destroyed).
    pub fn wait_for_completed(&self) -> WaitCombinator {
        self.wait_all(TaskState::Completed)
    }

    pub fn wait_for_stopped(&self) -> WaitCombinator {
        self.wait_all(TaskState::Stopped)
    }

    pub fn wait_for_run(&self) -> WaitCombinator {
        self.wait_all(TaskState::Running)
    }

    pub fn wait_for_reset(&self) -> WaitCombinator {
        self.wait_all(TaskState::Reset)
    }

    pub fn wait_for_destroyed(&self) -> WaitCombinator {
        self.wait_all(TaskState::Destroyed)
    }
}

impl FromIterator<Task> for TaskGroup {
    fn from_iter<I: IntoIterator<Item = Task>>(iter: I) -> Self {
        Self {
            tasks: iter.into_iter().collect(),
            listeners: Vec::new(),
        }
    }
}

impl Extend<Task> for TaskGroup {
    fn extend<I: IntoIterator<Item = Task>>(
        &mut self,
        iter: I,
    ) {
        self.tasks.extend(iter);
    }
}

impl<'a> IntoIterator for &'a TaskGroup {
    type Item = &'a Task;
    type IntoIter = std::slice::Iter<'a, Task>;

    fn into_iter(self) -> Self::IntoIter {
        self.tasks.iter()
    }
}

impl fmt::Debug for TaskGroup {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("TaskGroup")
            .field("tasks", &self.tasks)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
