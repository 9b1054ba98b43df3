//! Steprun
//!
//! A cooperative, tick-driven routine runtime. Routines are step sequences
//! that can be started, stopped, reset, composed and destroyed; their
//! lifetime may be bound to an external owner whose deactivation stops them
//! and whose removal detaches them.
//!
//! # Example
//!
//! ```
//! use steprun::{routine, Runtime, TaskState};
//!
//! let runtime = Runtime::default();
//! let task = runtime.create(|| routine::values([1, 2, 3]));
//!
//! task.run().unwrap();
//! for _ in 0..3 {
//!     runtime.tick();
//! }
//!
//! assert_eq!(task.state(), TaskState::Completed);
//! assert_eq!(*task.last_result_as::<i32>().unwrap(), 3);
//! ```

#![doc(html_root_url = "https://docs.rs/steprun")]
#![warn(rust_2018_idioms)]

pub mod runtime;
pub mod util;

pub use runtime::{
    Advance, ControlStatus, GroupEvent, GroupReport, OwnerId, Routine, RoutineFactory, Runtime,
    StateMask, Step, StepSource, SyncValue, Task, TaskBuilder, TaskError, TaskEvent, TaskGroup,
    TaskId, TaskResult, TaskState, TaskWait, TickReport, WaitCombinator, WaitMode,
};
pub use util::config::RuntimeConfig;

/// Routine constructors and host-independent suspension primitives.
pub mod routine {
    pub use crate::runtime::step::{
        empty, from_fn, from_iter, ticks, until, values, while_, FnRoutine, IterRoutine,
        RoutineSource, WaitTicks, WaitUntil, WaitWhile,
    };
    pub use crate::runtime::wait::{all_of, any_of};
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = "Steprun";

/// Create a task on the global runtime.
pub fn create<F: RoutineFactory + 'static>(factory: F) -> Task {
    Runtime::global().create(factory)
}

/// Create and run a task on the global runtime.
pub fn start<F: RoutineFactory + 'static>(factory: F) -> TaskResult<Task> {
    Runtime::global().start(factory)
}

/// Advance the global runtime by one tick.
pub fn tick() -> TickReport {
    Runtime::global().tick()
}

/// Forward a host deactivation signal to the global runtime.
pub fn owner_deactivated(owner: OwnerId) -> TaskResult<Vec<TaskId>> {
    Runtime::global().owner_deactivated(owner)
}

/// Forward a host removal signal to the global runtime.
pub fn owner_removed(owner: OwnerId) -> TaskResult<Vec<TaskId>> {
    Runtime::global().owner_removed(owner)
}
