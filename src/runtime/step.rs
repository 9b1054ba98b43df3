//! Step sources and routines.
//!
//! A [`StepSource`] is anything that can be polled for "is there more pending
//! work". A [`Routine`] is a resumable step sequence: each resume yields a
//! plain value, a nested source to wait on, or nothing when exhausted.
//! [`RoutineSource`] turns a routine into a step source, which is how tasks
//! and wait combinators drive raw routines.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::error::TaskResult;

/// Type alias for values produced by routines
pub type SyncValue = Arc<dyn Any + Send + Sync>;

/// Something that can be polled for pending work.
///
/// Polling may have side effects (advancing nested routines), so callers poll
/// exactly once per tick.
pub trait StepSource: Send {
    /// Poll once. `Ok(true)` while work remains.
    fn poll(&mut self) -> TaskResult<bool>;

    /// Most recent value produced by value-producing sources.
    fn current_value(&self) -> Option<SyncValue> {
        None
    }
}

impl<S: StepSource + ?Sized> StepSource for Box<S> {
    fn poll(&mut self) -> TaskResult<bool> {
        (**self).poll()
    }

    fn current_value(&self) -> Option<SyncValue> {
        (**self).current_value()
    }
}

/// One unit yielded by a routine.
pub enum Step {
    /// A plain value; stored as the task's last result.
    Value(SyncValue),
    /// A nested source; the routine is blocked until it reports no pending work.
    Wait(Box<dyn StepSource>),
}

impl Step {
    /// Yield a plain value.
    pub fn value<T: Any + Send + Sync>(value: T) -> Self {
        Step::Value(Arc::new(value))
    }

    /// Yield a nested source to wait on.
    pub fn wait<S: StepSource + 'static>(source: S) -> Self {
        Step::Wait(Box::new(source))
    }
}

impl fmt::Debug for Step {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Step::Value(_) => f.write_str("Step::Value(..)"),
            Step::Wait(_) => f.write_str("Step::Wait(..)"),
        }
    }
}

/// A resumable step sequence.
pub trait Routine: Send {
    /// Advance by one step. `Ok(None)` once the sequence is exhausted.
    fn resume(&mut self) -> TaskResult<Option<Step>>;
}

impl<R: Routine + ?Sized> Routine for Box<R> {
    fn resume(&mut self) -> TaskResult<Option<Step>> {
        (**self).resume()
    }
}

/// Builds fresh routine instances. Reset re-arms a task through its factory.
pub trait RoutineFactory: Send + Sync {
    /// Create a routine positioned at its first step.
    fn make(&self) -> Box<dyn Routine>;
}

impl<F, R> RoutineFactory for F
where
    F: Fn() -> R + Send + Sync,
    R: Routine + 'static,
{
    fn make(&self) -> Box<dyn Routine> {
        Box::new(self())
    }
}

/// Routine over an iterator of steps.
#[derive(Debug)]
pub struct IterRoutine<I> {
    iter: I,
}

impl<I> Routine for IterRoutine<I>
where
    I: Iterator<Item = Step> + Send,
{
    fn resume(&mut self) -> TaskResult<Option<Step>> {
        Ok(self.iter.next())
    }
}

/// Routine over a closure.
pub struct FnRoutine<F> {
    f: F,
}

impl<F> Routine for FnRoutine<F>
where
    F: FnMut() -> TaskResult<Option<Step>> + Send,
{
    fn resume(&mut self) -> TaskResult<Option<Step>> {
        (self.f)()
    }
}

/// Routine yielding the given steps in order.
pub fn from_iter<I>(steps: I) -> IterRoutine<I::IntoIter>
where
    I: IntoIterator<Item = Step>,
    I::IntoIter: Send,
{
    IterRoutine {
        iter: steps.into_iter(),
    }
}

/// Routine driven by a closure; return `Ok(None)` to finish.
pub fn from_fn<F>(f: F) -> FnRoutine<F>
where
    F: FnMut() -> TaskResult<Option<Step>> + Send,
{
    FnRoutine { f }
}

/// Routine yielding each item as a plain value.
pub fn values<T, I>(items: I) -> impl Routine
where
    T: Any + Send + Sync,
    I: IntoIterator<Item = T>,
    I::IntoIter: Send,
{
    from_iter(items.into_iter().map(Step::value))
}

/// Routine with no steps. Completes on its first advancement.
pub fn empty() -> impl Routine {
    from_iter(std::iter::empty())
}

/// Drives a routine as a step source.
///
/// A yielded nested source is first polled on the following poll; once it
/// reports no pending work the routine resumes within that same poll.
pub struct RoutineSource {
    routine: Box<dyn Routine>,
    waiting: Option<Box<dyn StepSource>>,
    last: Option<SyncValue>,
    done: bool,
}

impl RoutineSource {
    /// Wrap a routine.
    pub fn new<R: Routine + 'static>(routine: R) -> Self {
        Self::from_boxed(Box::new(routine))
    }

    pub(crate) fn from_boxed(routine: Box<dyn Routine>) -> Self {
        Self {
            routine,
            waiting: None,
            last: None,
            done: false,
        }
    }

    /// Whether the routine has been exhausted.
    #[inline]
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Whether a nested source is being awaited.
    #[inline]
    pub fn is_waiting(&self) -> bool {
        self.waiting.is_some()
    }
}

impl StepSource for RoutineSource {
    fn poll(&mut self) -> TaskResult<bool> {
        if self.done {
            return Ok(false);
        }

        if let Some(waiting) = self.waiting.as_mut() {
            if waiting.poll()? {
                return Ok(true);
            }
            self.waiting = None;
        }

        match self.routine.resume()? {
            Some(Step::Value(value)) => {
                self.last = Some(value);
                Ok(true)
            }
            Some(Step::Wait(source)) => {
                self.waiting = Some(source);
                Ok(true)
            }
            None => {
                self.done = true;
                Ok(false)
            }
        }
    }

    fn current_value(&self) -> Option<SyncValue> {
        self.last.clone()
    }
}

impl fmt::Debug for RoutineSource {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("RoutineSource")
            .field("waiting", &self.waiting.is_some())
            .field("done", &self.done)
            .finish()
    }
}

/// Pending for exactly `n` polls.
#[derive(Debug, Clone, Copy)]
pub struct WaitTicks {
    remaining: usize,
}

impl StepSource for WaitTicks {
    fn poll(&mut self) -> TaskResult<bool> {
        if self.remaining == 0 {
            return Ok(false);
        }
        self.remaining -= 1;
        Ok(true)
    }
}

/// Pending until the predicate returns `true`.
pub struct WaitUntil<F> {
    predicate: F,
}

impl<F: FnMut() -> bool + Send> StepSource for WaitUntil<F> {
    fn poll(&mut self) -> TaskResult<bool> {
        Ok(!(self.predicate)())
    }
}

/// Pending while the predicate returns `true`.
pub struct WaitWhile<F> {
    predicate: F,
}

impl<F: FnMut() -> bool + Send> StepSource for WaitWhile<F> {
    fn poll(&mut self) -> TaskResult<bool> {
        Ok((self.predicate)())
    }
}

/// Wait for `n` polls.
pub fn ticks(n: usize) -> WaitTicks {
    WaitTicks { remaining: n }
}

/// Wait until `predicate` holds.
pub fn until<F: FnMut() -> bool + Send>(predicate: F) -> WaitUntil<F> {
    WaitUntil { predicate }
}

/// Wait while `predicate` holds.
pub fn while_<F: FnMut() -> bool + Send>(predicate: F) -> WaitWhile<F> {
    WaitWhile { predicate }
}
