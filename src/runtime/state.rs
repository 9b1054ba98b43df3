//! Task identity, lifecycle states and state masks.
//!
//! A task stores exactly one [`TaskState`]. [`StateMask`] exists only for
//! querying several states at once (registry and owner lookups).

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Unique task identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub usize);

impl TaskId {
    /// Get the inner value.
    #[inline]
    pub fn inner(&self) -> usize {
        self.0
    }
}

impl From<usize> for TaskId {
    fn from(val: usize) -> Self {
        Self(val)
    }
}

impl From<TaskId> for usize {
    fn from(val: TaskId) -> Self {
        val.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "Task({})", self.0)
    }
}

/// Generator for task IDs, one per runtime.
#[derive(Debug, Default)]
pub struct TaskIdGenerator {
    next_id: usize,
}

impl TaskIdGenerator {
    /// Create a new task ID generator.
    #[inline]
    pub fn new() -> Self {
        Self { next_id: 0 }
    }

    /// Generate the next task ID.
    #[inline]
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> TaskId {
        let id = self.next_id;
        self.next_id += 1;
        TaskId(id)
    }
}

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Created or explicitly reset; the routine starts from the beginning on the next run.
    Reset,
    /// Advanced by the driver on every tick.
    Running,
    /// Paused; progress is kept.
    Stopped,
    /// The routine is exhausted (or faulted).
    Completed,
    /// Terminal. The task is gone from every index.
    Destroyed,
}

impl TaskState {
    /// All states, in declaration order.
    pub const ALL: [TaskState; 5] = [
        TaskState::Reset,
        TaskState::Running,
        TaskState::Stopped,
        TaskState::Completed,
        TaskState::Destroyed,
    ];

    /// Single-state mask.
    #[inline]
    pub fn mask(self) -> StateMask {
        match self {
            TaskState::Reset => StateMask::RESET,
            TaskState::Running => StateMask::RUNNING,
            TaskState::Stopped => StateMask::STOPPED,
            TaskState::Completed => StateMask::COMPLETED,
            TaskState::Destroyed => StateMask::DESTROYED,
        }
    }

    /// Get a short lowercase label.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Reset => "reset",
            TaskState::Running => "running",
            TaskState::Stopped => "stopped",
            TaskState::Completed => "completed",
            TaskState::Destroyed => "destroyed",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A set of task states used for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StateMask(u8);

impl StateMask {
    pub const NONE: StateMask = StateMask(0);
    pub const RESET: StateMask = StateMask(1 << 0);
    pub const RUNNING: StateMask = StateMask(1 << 1);
    pub const STOPPED: StateMask = StateMask(1 << 2);
    pub const COMPLETED: StateMask = StateMask(1 << 3);
    pub const DESTROYED: StateMask = StateMask(1 << 4);
    /// Every state a registered task can be in.
    pub const LIVE: StateMask = StateMask(0b0_1111);
    pub const ALL: StateMask = StateMask(0b1_1111);

    /// Raw bits.
    #[inline]
    pub fn bits(self) -> u8 {
        self.0
    }

    /// Check whether `state` is part of this mask.
    #[inline]
    pub fn contains(
        self,
        state: TaskState,
    ) -> bool {
        self.0 & state.mask().0 != 0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// States included in this mask, in declaration order.
    pub fn states(self) -> impl Iterator<Item = TaskState> {
        TaskState::ALL
            .into_iter()
            .filter(move |state| self.contains(*state))
    }
}

impl From<TaskState> for StateMask {
    fn from(state: TaskState) -> Self {
        state.mask()
    }
}

impl BitOr for StateMask {
    type Output = StateMask;

    fn bitor(
        self,
        rhs: StateMask,
    ) -> StateMask {
        StateMask(self.0 | rhs.0)
    }
}

impl BitOr<TaskState> for StateMask {
    type Output = StateMask;

    fn bitor(
        self,
        rhs: TaskState,
    ) -> StateMask {
        self | rhs.mask()
    }
}

impl BitOr for TaskState {
    type Output = StateMask;

    fn bitor(
        self,
        rhs: TaskState,
    ) -> StateMask {
        self.mask() | rhs.mask()
    }
}

impl BitOrAssign for StateMask {
    fn bitor_assign(
        &mut self,
        rhs: StateMask,
    ) {
        self.0 |= rhs.0;
    }
}

/// Outcome of a control call that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlStatus {
    /// The task moved between states.
    Applied {
        /// State before the call.
        from: TaskState,
        /// State after the call.
        to: TaskState,
    },
    /// The task already was in the requested state.
    AlreadyInState(TaskState),
    /// `run` on a completed task. Use `reset`/`rerun` to start over.
    AlreadyCompleted,
    /// The call has no meaning in the current state (e.g. stopping a reset task).
    Unchanged(TaskState),
}

impl ControlStatus {
    /// Whether the call changed the task's state.
    #[inline]
    pub fn is_applied(&self) -> bool {
        matches!(self, ControlStatus::Applied { .. })
    }
}
