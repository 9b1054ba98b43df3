//! Runtime errors

use thiserror::Error;

use super::owner::OwnerId;
use super::state::{TaskId, TaskState};

/// Result alias for task operations.
pub type TaskResult<T> = Result<T, TaskError>;

/// Errors reported by tasks, owners and step sources.
///
/// None of these are fatal to the runtime; the caller decides how to recover.
#[derive(Debug, Clone, Error)]
pub enum TaskError {
    #[error("{task}: cannot {op} while {state}")]
    InvalidState {
        /// Task the call was made on
        task: TaskId,
        /// State the task was in
        state: TaskState,
        /// Rejected operation
        op: &'static str,
    },

    #[error("Owner not tracked: {0}")]
    UnknownOwner(OwnerId),

    #[error("Task has no owner binding: {0}")]
    UnboundTask(TaskId),

    #[error("Wait member #{index} faulted: {source}")]
    CombinatorMemberFaulted {
        /// Position of the member inside the combinator
        index: usize,
        /// The member's own error
        #[source]
        source: Box<TaskError>,
    },

    #[error("{task} routine faulted: {message}")]
    RoutineFault {
        /// Faulted task
        task: TaskId,
        /// Rendered cause
        message: String,
    },

    #[error("Step source faulted: {0}")]
    SourceFault(String),
}

impl TaskError {
    /// Build a fault from inside a routine or step source.
    pub fn fault(message: impl Into<String>) -> Self {
        TaskError::SourceFault(message.into())
    }
}
