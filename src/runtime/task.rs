//! Task handles and the per-task lifecycle state machine.
//!
//! A [`Task`] is a cheap, cloneable handle. All state lives behind a single
//! mutex that is never held while user code runs: routines are resumed,
//! nested sources are polled and listeners are invoked with the lock
//! released, so a routine or a listener may freely control its own task or
//! any other task.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, error, warn};

use super::error::{TaskError, TaskResult};
use super::owner::OwnerId;
use super::scheduler::RuntimeShared;
use super::state::{ControlStatus, TaskId, TaskState};
use super::step::{RoutineFactory, RoutineSource, StepSource, SyncValue};
use super::wait::TaskWait;

/// Callback invoked on a task lifecycle event.
pub type Listener = Arc<dyn Fn(&Task) + Send + Sync>;

/// Lifecycle events a listener can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskEvent {
    Reset,
    Run,
    Stopped,
    Completed,
    Destroyed,
}

/// Result of advancing a task by one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Not running, or already being advanced further up the stack.
    Skipped,
    /// Stepped (or is blocked on a nested source) and still has work.
    Pending,
    /// Reached Completed during this advancement.
    Completed,
}

struct TaskCore {
    name: String,
    state: TaskState,
    owner: Option<OwnerId>,
    auto_destroy: bool,
    last_result: Option<SyncValue>,
    fault: Option<TaskError>,
    /// `None` while the routine is being resumed and after destroy.
    cursor: Option<RoutineSource>,
    /// Bumped by reset and destroy; an in-flight advance holding an older
    /// cursor discards it.
    epoch: u64,
    listeners: Vec<(TaskEvent, Listener)>,
}

pub(crate) struct TaskShared {
    id: TaskId,
    factory: Box<dyn RoutineFactory>,
    runtime: Weak<RuntimeShared>,
    trace_steps: bool,
    core: Mutex<TaskCore>,
}

/// Handle to a single routine and its lifecycle.
#[derive(Clone)]
pub struct Task {
    shared: Arc<TaskShared>,
}

impl Task {
    pub(crate) fn new(
        id: TaskId,
        name: String,
        factory: Box<dyn RoutineFactory>,
        runtime: Weak<RuntimeShared>,
        owner: Option<OwnerId>,
        auto_destroy: bool,
        trace_steps: bool,
    ) -> Self {
        let cursor = RoutineSource::from_boxed(factory.make());
        Self {
            shared: Arc::new(TaskShared {
                id,
                factory,
                runtime,
                trace_steps,
                core: Mutex::new(TaskCore {
                    name,
                    state: TaskState::Reset,
                    owner,
                    auto_destroy,
                    last_result: None,
                    fault: None,
                    cursor: Some(cursor),
                    epoch: 0,
                    listeners: Vec::new(),
                }),
            }),
        }
    }

    #[inline]
    fn core(&self) -> MutexGuard<'_, TaskCore> {
        self.shared.core.lock()
    }

    fn invalid(
        &self,
        state: TaskState,
        op: &'static str,
    ) -> TaskError {
        TaskError::InvalidState {
            task: self.id(),
            state,
            op,
        }
    }

    /// Get the task ID.
    #[inline]
    pub fn id(&self) -> TaskId {
        self.shared.id
    }

    /// Get the task name.
    pub fn name(&self) -> String {
        self.core().name.clone()
    }

    /// Rename the task.
    pub fn set_name(
        &self,
        name: impl Into<String>,
    ) -> &Self {
        self.core().name = name.into();
        self
    }

    /// Get the current state.
    #[inline]
    pub fn state(&self) -> TaskState {
        self.core().state
    }

    #[inline]
    pub fn is_reset(&self) -> bool {
        self.state() == TaskState::Reset
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.state() == TaskState::Running
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.state() == TaskState::Stopped
    }

    #[inline]
    pub fn is_completed(&self) -> bool {
        self.state() == TaskState::Completed
    }

    #[inline]
    pub fn is_destroyed(&self) -> bool {
        self.state() == TaskState::Destroyed
    }

    /// Bound owner, if any.
    #[inline]
    pub fn owner(&self) -> Option<OwnerId> {
        self.core().owner
    }

    #[inline]
    pub fn auto_destroy(&self) -> bool {
        self.core().auto_destroy
    }

    /// Destroy the task as soon as it completes.
    pub fn set_auto_destroy(
        &self,
        auto_destroy: bool,
    ) -> &Self {
        self.core().auto_destroy = auto_destroy;
        self
    }

    /// Most recent value yielded by the routine.
    pub fn last_result(&self) -> Option<SyncValue> {
        self.core().last_result.clone()
    }

    /// Most recent value, downcast to `T`.
    pub fn last_result_as<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.last_result().and_then(|value| value.downcast::<T>().ok())
    }

    /// Fault recorded when the routine failed. Such a task is Completed.
    pub fn fault(&self) -> Option<TaskError> {
        self.core().fault.clone()
    }

    /// Start or resume the routine.
    ///
    /// The first advancement happens synchronously. Running a completed task
    /// is a no-op reported as [`ControlStatus::AlreadyCompleted`]; reset it
    /// (or use [`Task::rerun`]) to start over.
    pub fn run(&self) -> TaskResult<ControlStatus> {
        let from = {
            let mut core = self.core();
            match core.state {
                TaskState::Reset | TaskState::Stopped => {
                    let from = core.state;
                    core.state = TaskState::Running;
                    from
                }
                TaskState::Running => return Ok(ControlStatus::AlreadyInState(TaskState::Running)),
                TaskState::Completed => return Ok(ControlStatus::AlreadyCompleted),
                TaskState::Destroyed => return Err(self.invalid(TaskState::Destroyed, "run")),
            }
        };

        self.trace_transition(from, TaskState::Running);
        self.fire(TaskEvent::Run);
        self.advance()?;

        Ok(ControlStatus::Applied {
            from,
            to: TaskState::Running,
        })
    }

    /// Pause the routine, keeping its progress.
    pub fn stop(&self) -> TaskResult<ControlStatus> {
        {
            let mut core = self.core();
            match core.state {
                TaskState::Running => core.state = TaskState::Stopped,
                TaskState::Stopped => return Ok(ControlStatus::AlreadyInState(TaskState::Stopped)),
                TaskState::Destroyed => return Err(self.invalid(TaskState::Destroyed, "stop")),
                state => return Ok(ControlStatus::Unchanged(state)),
            }
        }

        self.trace_transition(TaskState::Running, TaskState::Stopped);
        self.fire(TaskEvent::Stopped);

        Ok(ControlStatus::Applied {
            from: TaskState::Running,
            to: TaskState::Stopped,
        })
    }

    /// Discard progress and the last result; the next run starts from the first step.
    ///
    /// A task that is already Reset is re-armed from its factory as well, but
    /// reports [`ControlStatus::AlreadyInState`] and fires no event.
    pub fn reset(&self) -> TaskResult<ControlStatus> {
        if self.state() == TaskState::Destroyed {
            return Err(self.invalid(TaskState::Destroyed, "reset"));
        }

        // The factory is user code; build the fresh routine outside the lock.
        let fresh = RoutineSource::from_boxed(self.shared.factory.make());
        let (from, stale) = {
            let mut core = self.core();
            if core.state == TaskState::Destroyed {
                return Err(self.invalid(TaskState::Destroyed, "reset"));
            }
            let from = core.state;
            core.state = TaskState::Reset;
            core.epoch += 1;
            core.last_result = None;
            core.fault = None;
            (from, core.cursor.replace(fresh))
        };
        drop(stale);

        if from == TaskState::Reset {
            return Ok(ControlStatus::AlreadyInState(TaskState::Reset));
        }

        self.trace_transition(from, TaskState::Reset);
        self.fire(TaskEvent::Reset);

        Ok(ControlStatus::Applied {
            from,
            to: TaskState::Reset,
        })
    }

    /// Reset, then run.
    pub fn rerun(&self) -> TaskResult<ControlStatus> {
        self.reset()?;
        self.run()
    }

    /// Destroy the task. Idempotent.
    ///
    /// The task leaves the registry and the owner index before any listener
    /// is notified; a panicking listener does not prevent that.
    pub fn destroy(&self) -> TaskResult<ControlStatus> {
        let (from, cursor) = {
            let mut core = self.core();
            if core.state == TaskState::Destroyed {
                return Ok(ControlStatus::AlreadyInState(TaskState::Destroyed));
            }
            let from = core.state;
            core.state = TaskState::Destroyed;
            core.epoch += 1;
            core.owner = None;
            (from, core.cursor.take())
        };
        drop(cursor);

        if let Some(runtime) = self.shared.runtime.upgrade() {
            runtime.forget(self.id());
        }

        self.trace_transition(from, TaskState::Destroyed);
        self.fire(TaskEvent::Destroyed);

        // Listeners commonly capture task handles; release them.
        let listeners = std::mem::take(&mut self.core().listeners);
        drop(listeners);

        Ok(ControlStatus::Applied {
            from,
            to: TaskState::Destroyed,
        })
    }

    /// Bind to `owner`, returning the previous owner if the task was rebound.
    pub fn set_owner(
        &self,
        owner: OwnerId,
    ) -> TaskResult<Option<OwnerId>> {
        let previous = {
            let mut core = self.core();
            if core.state == TaskState::Destroyed {
                return Err(self.invalid(TaskState::Destroyed, "set owner"));
            }
            core.owner.replace(owner)
        };

        if let Some(runtime) = self.shared.runtime.upgrade() {
            runtime.bind(self.id(), owner);
        }

        Ok(previous.filter(|prev| *prev != owner))
    }

    /// Drop the owner binding, returning the former owner.
    pub fn make_unowned(&self) -> TaskResult<OwnerId> {
        let previous = {
            let mut core = self.core();
            if core.state == TaskState::Destroyed {
                return Err(self.invalid(TaskState::Destroyed, "make unowned"));
            }
            core.owner.take()
        }
        .ok_or(TaskError::UnboundTask(self.id()))?;

        if let Some(runtime) = self.shared.runtime.upgrade() {
            runtime.unbind(self.id());
        }

        Ok(previous)
    }

    /// Clear the owner field after the owner index already dropped the task.
    pub(crate) fn detach_owner(&self) {
        self.core().owner = None;
    }

    /// Subscribe to `event`. Listeners run in registration order.
    pub fn on<F>(
        &self,
        event: TaskEvent,
        listener: F,
    ) -> &Self
    where
        F: Fn(&Task) + Send + Sync + 'static,
    {
        let mut core = self.core();
        if core.state != TaskState::Destroyed {
            core.listeners.push((event, Arc::new(listener)));
        }
        self
    }

    pub fn on_reset<F: Fn(&Task) + Send + Sync + 'static>(
        &self,
        listener: F,
    ) -> &Self {
        self.on(TaskEvent::Reset, listener)
    }

    pub fn on_run<F: Fn(&Task) + Send + Sync + 'static>(
        &self,
        listener: F,
    ) -> &Self {
        self.on(TaskEvent::Run, listener)
    }

    pub fn on_stopped<F: Fn(&Task) + Send + Sync + 'static>(
        &self,
        listener: F,
    ) -> &Self {
        self.on(TaskEvent::Stopped, listener)
    }

    pub fn on_completed<F: Fn(&Task) + Send + Sync + 'static>(
        &self,
        listener: F,
    ) -> &Self {
        self.on(TaskEvent::Completed, listener)
    }

    pub fn on_destroyed<F: Fn(&Task) + Send + Sync + 'static>(
        &self,
        listener: F,
    ) -> &Self {
        self.on(TaskEvent::Destroyed, listener)
    }

    /// Source pending until the task enters `target` (or is destroyed).
    pub fn wait_for(
        &self,
        target: TaskState,
    ) -> TaskWait {
        TaskWait::new(self.clone(), target)
    }

    pub fn wait_for_completed(&self) -> TaskWait {
        self.wait_for(TaskState::Completed)
    }

    pub fn wait_for_stopped(&self) -> TaskWait {
        self.wait_for(TaskState::Stopped)
    }

    pub fn wait_for_run(&self) -> TaskWait {
        self.wait_for(TaskState::Running)
    }

    pub fn wait_for_reset(&self) -> TaskWait {
        self.wait_for(TaskState::Reset)
    }

    pub fn wait_for_destroyed(&self) -> TaskWait {
        self.wait_for(TaskState::Destroyed)
    }

    /// Advance the routine by one unit. Called by the driver once per tick.
    ///
    /// A routine error or panic completes the task with a fault, which is
    /// also returned here.
    pub fn advance(&self) -> TaskResult<Advance> {
        let (mut cursor, epoch) = {
            let mut core = self.core();
            if core.state != TaskState::Running {
                return Ok(Advance::Skipped);
            }
            match core.cursor.take() {
                Some(cursor) => (cursor, core.epoch),
                None => return Ok(Advance::Skipped),
            }
        };

        let polled = match panic::catch_unwind(AssertUnwindSafe(|| cursor.poll())) {
            Ok(polled) => polled,
            Err(payload) => Err(TaskError::fault(panic_message(payload.as_ref()))),
        };

        let mut core = self.core();
        if core.epoch != epoch {
            // Reset or destroyed from inside the routine.
            drop(core);
            drop(cursor);
            return Ok(Advance::Skipped);
        }

        core.last_result = cursor.current_value();
        core.cursor = Some(cursor);

        let fault = match polled {
            Ok(true) => {
                if self.shared.trace_steps {
                    debug!("{} stepped", core.name);
                }
                return Ok(Advance::Pending);
            }
            Ok(false) if core.state != TaskState::Running => return Ok(Advance::Skipped),
            Ok(false) => None,
            Err(err) => {
                let fault = TaskError::RoutineFault {
                    task: self.id(),
                    message: err.to_string(),
                };
                if core.state != TaskState::Running {
                    // Stopped from inside the routine: the fault is recorded, the state kept.
                    core.fault = Some(fault.clone());
                    let name = core.name.clone();
                    drop(core);
                    warn!("{} faulted while stopped: {}", name, fault);
                    return Err(fault);
                }
                Some(fault)
            }
        };

        let from = core.state;
        core.state = TaskState::Completed;
        if fault.is_some() {
            core.fault = fault.clone();
        }
        let auto_destroy = core.auto_destroy;
        let name = core.name.clone();
        drop(core);

        match &fault {
            Some(fault) => warn!("{} completed with fault: {}", name, fault),
            None => debug!("{} {} -> {}", name, from, TaskState::Completed),
        }
        self.fire(TaskEvent::Completed);

        if auto_destroy {
            self.destroy()?;
        }

        match fault {
            Some(fault) => Err(fault),
            None => Ok(Advance::Completed),
        }
    }

    fn fire(
        &self,
        event: TaskEvent,
    ) {
        let listeners: Vec<Listener> = self
            .core()
            .listeners
            .iter()
            .filter(|(on, _)| *on == event)
            .map(|(_, listener)| listener.clone())
            .collect();

        for listener in listeners {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| listener(self))) {
                error!(
                    "{} {:?} listener panicked: {}",
                    self.id(),
                    event,
                    panic_message(payload.as_ref())
                );
            }
        }
    }

    fn trace_transition(
        &self,
        from: TaskState,
        to: TaskState,
    ) {
        debug!("{} {} -> {}", self.name(), from, to);
    }
}

impl StepSource for Task {
    /// Pending until the task is completed or destroyed.
    fn poll(&mut self) -> TaskResult<bool> {
        Ok(!matches!(
            self.state(),
            TaskState::Completed | TaskState::Destroyed
        ))
    }

    fn current_value(&self) -> Option<SyncValue> {
        self.last_result()
    }
}

impl PartialEq for Task {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for Task {}

impl fmt::Debug for Task {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let core = self.core();
        f.debug_struct("Task")
            .field("id", &self.shared.id)
            .field("name", &core.name)
            .field("state", &core.state)
            .field("owner", &core.owner)
            .field("auto_destroy", &core.auto_destroy)
            .finish()
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic".to_string()
    }
}
