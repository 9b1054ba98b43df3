//! Wait combinators.
//!
//! [`WaitCombinator`] aggregates step sources under all/any semantics. Every
//! member is polled on every round, whatever the others report, because
//! polling advances nested routines; skipping a member would let it fall
//! behind the tick count.

use std::fmt;

use super::error::{TaskError, TaskResult};
use super::state::TaskState;
use super::step::StepSource;
use super::task::Task;

/// Aggregation mode of a [`WaitCombinator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitMode {
    /// Pending until every member is done.
    All,
    /// Pending until at least one member is done. Empty never finishes.
    Any,
}

/// Step source derived from an ordered set of members.
pub struct WaitCombinator {
    mode: WaitMode,
    members: Vec<Box<dyn StepSource>>,
}

impl WaitCombinator {
    /// Empty combinator; add members with [`WaitCombinator::with`].
    pub fn new(mode: WaitMode) -> Self {
        Self {
            mode,
            members: Vec::new(),
        }
    }

    /// Wait for every member.
    pub fn all<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: StepSource + 'static,
    {
        Self::from_members(WaitMode::All, members)
    }

    /// Wait for the first member to finish.
    pub fn any<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: StepSource + 'static,
    {
        Self::from_members(WaitMode::Any, members)
    }

    fn from_members<I, S>(
        mode: WaitMode,
        members: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: StepSource + 'static,
    {
        Self {
            mode,
            members: members
                .into_iter()
                .map(|member| Box::new(member) as Box<dyn StepSource>)
                .collect(),
        }
    }

    /// Append a member of any source type.
    pub fn with<S: StepSource + 'static>(
        mut self,
        member: S,
    ) -> Self {
        self.members.push(Box::new(member));
        self
    }

    /// Append a member of any source type.
    pub fn push<S: StepSource + 'static>(
        &mut self,
        member: S,
    ) {
        self.members.push(Box::new(member));
    }

    #[inline]
    pub fn mode(&self) -> WaitMode {
        self.mode
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl StepSource for WaitCombinator {
    fn poll(&mut self) -> TaskResult<bool> {
        let mut pending = 0;
        let mut fault = None;

        for (index, member) in self.members.iter_mut().enumerate() {
            match member.poll() {
                Ok(true) => pending += 1,
                Ok(false) => {}
                Err(source) => {
                    if fault.is_none() {
                        fault = Some(TaskError::CombinatorMemberFaulted {
                            index,
                            source: Box::new(source),
                        });
                    }
                }
            }
        }

        if let Some(fault) = fault {
            return Err(fault);
        }

        Ok(match self.mode {
            WaitMode::All => pending > 0,
            WaitMode::Any => pending == self.members.len(),
        })
    }
}

impl fmt::Debug for WaitCombinator {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("WaitCombinator")
            .field("mode", &self.mode)
            .field("members", &self.members.len())
            .finish()
    }
}

/// Pending until a task enters the target state.
///
/// Destroyed is terminal for every target, so waiters never hang on a task
/// that is gone.
#[derive(Debug, Clone)]
pub struct TaskWait {
    task: Task,
    target: TaskState,
}

impl TaskWait {
    pub fn new(
        task: Task,
        target: TaskState,
    ) -> Self {
        Self { task, target }
    }

    #[inline]
    pub fn task(&self) -> &Task {
        &self.task
    }

    #[inline]
    pub fn target(&self) -> TaskState {
        self.target
    }
}

impl StepSource for TaskWait {
    fn poll(&mut self) -> TaskResult<bool> {
        let state = self.task.state();
        Ok(state != self.target && state != TaskState::Destroyed)
    }
}

/// All-mode combinator over the completion of `tasks`.
pub fn all_of<'a, I>(tasks: I) -> WaitCombinator
where
    I: IntoIterator<Item = &'a Task>,
{
    WaitCombinator::all(tasks.into_iter().map(Task::wait_for_completed))
}

/// Any-mode combinator over the completion of `tasks`.
pub fn any_of<'a, I>(tasks: I) -> WaitCombinator
where
    I: IntoIterator<Item = &'a Task>,
{
    WaitCombinator::any(tasks.into_iter().map(Task::wait_for_completed))
}
