use std::{
    future::Future,
    pin::Pin,
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
    task::{Context, Poll, Waker},
    time::Duration,
};

use crate::errors::WorkResult;

pub(crate) struct WorkState<T> {
    result: Option<WorkResult<T>>,
    waker: Option<Waker>,
}

pub(crate) struct SharedWorkState<T> {
    state: Mutex<WorkState<T>>,
    completed: Condvar,
}

/// The result side of a work item submitted to a `WorkerPool`. Resolves to the value
/// returned by the work, or to a `WorkError` if the work panicked or never ran.
///
/// Use `wait()` from synchronous code, or `.await` the handle from async code.
pub struct WorkHandle<T> {
    shared: Arc<SharedWorkState<T>>,
}

impl<T> SharedWorkState<T> {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(WorkState {
                result: None,
                waker: None,
            }),
            completed: Condvar::new(),
        }
    }

    fn lock(self: &Self) -> MutexGuard<'_, WorkState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores the outcome of the work item and wakes anything waiting on the handle
    pub(crate) fn complete(self: &Self, result: WorkResult<T>) {
        let waker = {
            let mut state = self.lock();
            state.result = Some(result);
            state.waker.take()
        };
        self.completed.notify_all();
        if let Some(waker) = waker {
            waker.wake();
        }
    }
}

impl<T> WorkHandle<T> {
    pub(crate) fn new(shared: &Arc<SharedWorkState<T>>) -> Self {
        Self {
            shared: shared.clone(),
        }
    }

    /// Returns true once the work item has finished, successfully or not
    pub fn is_complete(self: &Self) -> bool {
        self.shared.lock().result.is_some()
    }

    /// Blocks the calling thread until the work item has finished
    pub fn wait(self: Self) -> WorkResult<T> {
        let mut state = self.shared.lock();
        loop {
            if let Some(result) = state.result.take() {
                return result;
            }
            state = self
                .shared
                .completed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Blocks for at most `timeout`. Gives the handle back if the work is still pending
    pub fn wait_timeout(self: Self, timeout: Duration) -> Result<WorkResult<T>, Self> {
        let result = {
            let state = self.shared.lock();
            let (mut state, _) = self
                .shared
                .completed
                .wait_timeout_while(state, timeout, |state| state.result.is_none())
                .unwrap_or_else(PoisonError::into_inner);
            state.result.take()
        };
        match result {
            Some(result) => Ok(result),
            None => Err(self),
        }
    }
}

impl<T> Future for WorkHandle<T> {
    type Output = WorkResult<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.shared.lock();
        match state.result.take() {
            Some(result) => Poll::Ready(result),
            None => {
                state.waker = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}
