//! Tick-driven runtime.
//!
//! A [`Runtime`] owns the registry, the owner index and the ID generator of
//! one scheduling thread. The host loop calls [`Runtime::tick`] once per
//! frame; every task that is still running when its turn comes is advanced
//! by one unit, in registration order.
//!
//! [`Runtime::global`] is the process-wide instance, created on first use
//! and never torn down. Independent runtimes can be created with
//! [`Runtime::new`], e.g. one per test case.

use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::{Mutex, MutexGuard};
use tracing::debug;

use super::error::{TaskError, TaskResult};
use super::owner::{OwnerBinding, OwnerId};
use super::registry::Registry;
use super::state::{StateMask, TaskId, TaskIdGenerator};
use super::step::RoutineFactory;
use super::task::{Advance, Task};
use crate::util::config::RuntimeConfig;

static GLOBAL: Lazy<Runtime> = Lazy::new(|| Runtime::new(RuntimeConfig::default()));

/// Outcome of one driver tick.
#[derive(Debug, Default)]
pub struct TickReport {
    /// 1-based tick number.
    pub tick: u64,
    /// Tasks that were advanced.
    pub advanced: usize,
    /// Tasks that reached Completed during this tick (faulted ones included).
    /// A task that stopped itself before faulting stays Stopped and is not listed.
    pub completed: Vec<TaskId>,
    /// Routine faults raised during this tick.
    pub faults: Vec<TaskError>,
}

impl TickReport {
    #[inline]
    pub fn is_clean(&self) -> bool {
        self.faults.is_empty()
    }
}

struct RuntimeCore {
    ids: TaskIdGenerator,
    registry: Registry,
    owners: OwnerBinding,
    ticks: u64,
}

pub(crate) struct RuntimeShared {
    config: RuntimeConfig,
    core: Mutex<RuntimeCore>,
}

impl RuntimeShared {
    #[inline]
    fn core(&self) -> MutexGuard<'_, RuntimeCore> {
        self.core.lock()
    }

    /// Drop every index entry of a destroyed task.
    pub(crate) fn forget(
        &self,
        id: TaskId,
    ) {
        let removed = {
            let mut core = self.core();
            let _ = core.owners.unbind(id);
            core.registry.unregister(id)
        };
        drop(removed);
    }

    pub(crate) fn bind(
        &self,
        id: TaskId,
        owner: OwnerId,
    ) {
        let mut core = self.core();
        if core.registry.contains(id) {
            core.owners.bind(id, owner);
        }
    }

    pub(crate) fn unbind(
        &self,
        id: TaskId,
    ) {
        let _ = self.core().owners.unbind(id);
    }
}

/// Handle to a scheduling context.
#[derive(Clone)]
pub struct Runtime {
    shared: Arc<RuntimeShared>,
}

impl Runtime {
    /// Create an independent runtime.
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            shared: Arc::new(RuntimeShared {
                config,
                core: Mutex::new(RuntimeCore {
                    ids: TaskIdGenerator::new(),
                    registry: Registry::new(),
                    owners: OwnerBinding::new(),
                    ticks: 0,
                }),
            }),
        }
    }

    /// The process-wide runtime.
    pub fn global() -> &'static Runtime {
        &GLOBAL
    }

    #[inline]
    pub fn config(&self) -> &RuntimeConfig {
        &self.shared.config
    }

    /// Start configuring a new task.
    pub fn builder(&self) -> TaskBuilder<'_> {
        TaskBuilder::new(self)
    }

    /// Create a task in the Reset state. It is registered but not polled until run.
    pub fn create<F: RoutineFactory + 'static>(
        &self,
        factory: F,
    ) -> Task {
        self.builder().spawn(factory)
    }

    /// Create a task and run it immediately.
    pub fn start<F: RoutineFactory + 'static>(
        &self,
        factory: F,
    ) -> TaskResult<Task> {
        self.builder().start(factory)
    }

    fn spawn_task(
        &self,
        factory: Box<dyn RoutineFactory>,
        name: Option<String>,
        owner: Option<OwnerId>,
        auto_destroy: Option<bool>,
    ) -> Task {
        let config = &self.shared.config;
        let id = self.shared.core().ids.next();
        let name = name.unwrap_or_else(|| format!("{}({})", config.name_prefix, id.inner()));

        let task = Task::new(
            id,
            name,
            factory,
            Arc::downgrade(&self.shared),
            owner,
            auto_destroy.unwrap_or(config.default_auto_destroy),
            config.trace_steps,
        );

        {
            let mut core = self.shared.core();
            core.registry.register(task.clone());
            if let Some(owner) = owner {
                core.owners.bind(id, owner);
            }
        }

        debug!("{} created", task.name());
        task
    }

    /// Advance every running task by one unit, in registration order.
    ///
    /// The registry is snapshotted first; tasks created during the tick are
    /// first advanced on the next one, and tasks stopped or destroyed by an
    /// earlier task in the same tick are skipped.
    pub fn tick(&self) -> TickReport {
        let (tick, tasks) = {
            let mut core = self.shared.core();
            core.ticks += 1;
            (core.ticks, core.registry.snapshot())
        };

        let mut report = TickReport {
            tick,
            ..TickReport::default()
        };

        for task in tasks {
            match task.advance() {
                Ok(Advance::Skipped) => {}
                Ok(Advance::Pending) => report.advanced += 1,
                Ok(Advance::Completed) => {
                    report.advanced += 1;
                    report.completed.push(task.id());
                }
                Err(fault) => {
                    report.advanced += 1;
                    if !task.is_stopped() {
                        report.completed.push(task.id());
                    }
                    report.faults.push(fault);
                }
            }
        }

        report
    }

    /// Number of ticks driven so far.
    pub fn ticks(&self) -> u64 {
        self.shared.core().ticks
    }

    /// Number of live tasks.
    pub fn len(&self) -> usize {
        self.shared.core().registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.core().registry.is_empty()
    }

    /// Look up a live task.
    pub fn get(
        &self,
        id: TaskId,
    ) -> Option<Task> {
        self.shared.core().registry.get(id).cloned()
    }

    pub fn contains(
        &self,
        id: TaskId,
    ) -> bool {
        self.shared.core().registry.contains(id)
    }

    /// Live tasks whose state is in `mask`, in registration order.
    pub fn tasks(
        &self,
        mask: StateMask,
    ) -> Vec<Task> {
        self.shared.core().registry.query(mask)
    }

    /// Live unowned tasks whose state is in `mask`.
    pub fn unowned(
        &self,
        mask: StateMask,
    ) -> Vec<Task> {
        self.shared.core().registry.unowned(mask)
    }

    /// Tasks bound to `owner` whose state is in `mask`, in binding order.
    pub fn tasks_of(
        &self,
        owner: OwnerId,
        mask: StateMask,
    ) -> TaskResult<Vec<Task>> {
        Ok(self
            .bound_tasks(owner)?
            .into_iter()
            .filter(|task| mask.contains(task.state()))
            .collect())
    }

    /// Owners with at least one bound task.
    pub fn owners(&self) -> Vec<OwnerId> {
        self.shared.core().owners.owners().collect()
    }

    /// The host deactivated `owner`: stop every running task bound to it.
    ///
    /// Progress is kept and nothing is resumed on reactivation. Returns the
    /// tasks that were stopped.
    pub fn owner_deactivated(
        &self,
        owner: OwnerId,
    ) -> TaskResult<Vec<TaskId>> {
        let mut stopped = Vec::new();
        for task in self.bound_tasks(owner)? {
            if let Ok(status) = task.stop() {
                if status.is_applied() {
                    stopped.push(task.id());
                }
            }
        }

        debug!("{} deactivated, {} task(s) stopped", owner, stopped.len());
        Ok(stopped)
    }

    /// The host removed `owner`: its tasks become unowned, nothing is destroyed.
    ///
    /// Returns the detached tasks.
    pub fn owner_removed(
        &self,
        owner: OwnerId,
    ) -> TaskResult<Vec<TaskId>> {
        let (ids, tasks) = {
            let mut core = self.shared.core();
            let ids = core.owners.remove_owner(owner)?;
            let tasks: Vec<Task> = ids
                .iter()
                .filter_map(|id| core.registry.get(*id).cloned())
                .collect();
            (ids, tasks)
        };

        for task in &tasks {
            task.detach_owner();
        }

        debug!("{} removed, {} task(s) detached", owner, ids.len());
        Ok(ids)
    }

    /// Destroy every live task. Returns how many were destroyed.
    ///
    /// Test harnesses sharing the global runtime call this between cases.
    pub fn clear(&self) -> usize {
        let tasks = self.shared.core().registry.snapshot();
        tasks
            .iter()
            .filter(|task| matches!(task.destroy(), Ok(status) if status.is_applied()))
            .count()
    }

    fn bound_tasks(
        &self,
        owner: OwnerId,
    ) -> TaskResult<Vec<Task>> {
        let core = self.shared.core();
        let ids = core.owners.tasks_of(owner)?;
        Ok(ids
            .into_iter()
            .filter_map(|id| core.registry.get(id).cloned())
            .collect())
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        let core = self.shared.core();
        f.debug_struct("Runtime")
            .field("tasks", &core.registry.len())
            .field("owners", &core.owners.owner_count())
            .field("ticks", &core.ticks)
            .finish()
    }
}

/// Task builder for constructing tasks with various options.
#[derive(Debug)]
pub struct TaskBuilder<'rt> {
    runtime: &'rt Runtime,
    name: Option<String>,
    owner: Option<OwnerId>,
    auto_destroy: Option<bool>,
}

impl<'rt> TaskBuilder<'rt> {
    fn new(runtime: &'rt Runtime) -> Self {
        Self {
            runtime,
            name: None,
            owner: None,
            auto_destroy: None,
        }
    }

    /// Set the task name.
    #[inline]
    pub fn name(
        mut self,
        name: impl Into<String>,
    ) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Bind the task to an owner from the start.
    #[inline]
    pub fn owner(
        mut self,
        owner: OwnerId,
    ) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Override the runtime's default auto-destroy flag.
    #[inline]
    pub fn auto_destroy(
        mut self,
        auto_destroy: bool,
    ) -> Self {
        self.auto_destroy = Some(auto_destroy);
        self
    }

    /// Create the task in the Reset state.
    pub fn spawn<F: RoutineFactory + 'static>(
        self,
        factory: F,
    ) -> Task {
        self.runtime
            .spawn_task(Box::new(factory), self.name, self.owner, self.auto_destroy)
    }

    /// Create the task and run it.
    pub fn start<F: RoutineFactory + 'static>(
        self,
        factory: F,
    ) -> TaskResult<Task> {
        let task = self.spawn(factory);
        task.run()?;
        Ok(task)
    }
}

#[cfg(test)]
mod tests;
