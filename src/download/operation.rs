use std::fmt;

use log::debug;

use crate::error::LoadError;
use crate::resource::CacheKey;

/// Lifecycle of an in-flight download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    Pending,
    Succeeded,
    Failed,
}

impl OperationState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, OperationState::Pending)
    }
}

type ProgressFn = Box<dyn Fn(f32) + Send>;
type ResultFn<T> = Box<dyn FnOnce(Result<T, LoadError>) + Send>;

/// A caller waiting on a download: a progress callback and a result callback.
///
/// The result callback is `FnOnce`, so a waiter can be completed at most once.
/// Both callbacks run while the coordinator's registry lock is held and must
/// not call back into the coordinator.
pub struct Waiter<T> {
    on_progress: ProgressFn,
    on_result: ResultFn<T>,
}

impl<T> Waiter<T> {
    pub fn new(
        on_progress: impl Fn(f32) + Send + 'static,
        on_result: impl FnOnce(Result<T, LoadError>) + Send + 'static,
    ) -> Self {
        Self {
            on_progress: Box::new(on_progress),
            on_result: Box::new(on_result),
        }
    }

    /// A waiter that only cares about the outcome.
    pub fn on_result(on_result: impl FnOnce(Result<T, LoadError>) + Send + 'static) -> Self {
        Self::new(|_| {}, on_result)
    }

    fn progress(&self, fraction: f32) {
        (self.on_progress)(fraction)
    }

    fn complete(self, outcome: Result<T, LoadError>) {
        (self.on_result)(outcome)
    }
}

impl<T> fmt::Debug for Waiter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Waiter").finish_non_exhaustive()
    }
}

/// One outstanding fetch and everyone waiting on it.
pub(super) struct InFlightOperation<T> {
    key: CacheKey,
    state: OperationState,
    progress: f32,
    waiters: Vec<Waiter<T>>,
}

impl<T: Clone> InFlightOperation<T> {
    pub(super) fn new(key: CacheKey, first: Waiter<T>) -> Self {
        Self {
            key,
            state: OperationState::Pending,
            progress: 0.0,
            waiters: vec![first],
        }
    }

    pub(super) fn join(&mut self, waiter: Waiter<T>) {
        self.waiters.push(waiter);
    }

    pub(super) fn waiter_count(&self) -> usize {
        self.waiters.len()
    }

    pub(super) fn progress(&self) -> f32 {
        self.progress
    }

    /// Record a progress tick and fan it out to the current waiters.
    pub(super) fn report(&mut self, fraction: f32) {
        self.progress = fraction;
        for waiter in &self.waiters {
            waiter.progress(fraction);
        }
    }

    /// Take the single terminal transition and deliver the outcome to every
    /// waiter. Consumes the operation, so it cannot be finished twice.
    pub(super) fn finish(mut self, outcome: Result<T, LoadError>) -> OperationState {
        self.state = match outcome {
            Ok(_) => OperationState::Succeeded,
            Err(_) => OperationState::Failed,
        };
        debug!(
            "{} -> {:?}, notifying {} waiter(s)",
            self.key,
            self.state,
            self.waiters.len()
        );

        for waiter in self.waiters.drain(..) {
            waiter.complete(outcome.clone());
        }
        self.state
    }
}
