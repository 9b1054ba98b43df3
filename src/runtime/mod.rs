//! Runtime system
//!
//! This module contains the cooperative task runtime: tasks and their
//! lifecycle, step sources and wait combinators, owner bindings, the live
//! registry, task groups and the tick driver.
//!
//! # Architecture
//!
//! - [`Task`](task::Task) - handle to one routine and its state machine
//! - [`StepSource`](step::StepSource) / [`Routine`](step::Routine) - pollable work and resumable step sequences
//! - [`WaitCombinator`](wait::WaitCombinator) - all/any aggregation of step sources
//! - [`OwnerBinding`](owner::OwnerBinding) - owner -> tasks index
//! - [`Registry`](registry::Registry) - insertion-ordered set of live tasks
//! - [`TaskGroup`](group::TaskGroup) - batch control over several tasks
//! - [`Runtime`](scheduler::Runtime) - scheduling context and tick driver

pub mod error;
pub mod group;
pub mod owner;
pub mod registry;
pub mod scheduler;
pub mod state;
pub mod step;
pub mod task;
pub mod wait;

pub use error::{TaskError, TaskResult};
pub use group::{GroupEvent, GroupListener, GroupReport, TaskGroup};
pub use owner::{OwnerBinding, OwnerId};
pub use registry::Registry;
pub use scheduler::{Runtime, TaskBuilder, TickReport};
pub use state::{ControlStatus, StateMask, TaskId, TaskIdGenerator, TaskState};
pub use step::{Routine, RoutineFactory, RoutineSource, Step, StepSource, SyncValue};
pub use task::{Advance, Listener, Task, TaskEvent};
pub use wait::{TaskWait, WaitCombinator, WaitMode};

#[cfg(test)]
mod tests;
