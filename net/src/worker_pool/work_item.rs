use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use log::warn;

use super::work_handle::{SharedWorkState, WorkHandle};
use crate::errors::{WorkError, WorkResult};

/// A unit of deferred work as it sits in the pool's queue
pub(crate) type WorkItem = Box<dyn FnOnce() + Send + 'static>;

/// Completes the handle with `WorkError::Abandoned` if the work item is dropped without running
struct Completion<T> {
    shared: Option<Arc<SharedWorkState<T>>>,
}

impl<T> Completion<T> {
    fn complete(mut self: Self, result: WorkResult<T>) {
        if let Some(shared) = self.shared.take() {
            shared.complete(result);
        }
    }
}

impl<T> Drop for Completion<T> {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            shared.complete(Err(WorkError::Abandoned));
        }
    }
}

/// Wraps a closure into a work item for the queue and the handle that receives its result.
/// A panic inside the closure is captured into the handle so that it never unwinds the worker.
pub(crate) fn package<F, T>(work: F) -> (WorkItem, WorkHandle<T>)
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let shared = Arc::new(SharedWorkState::new());
    let handle = WorkHandle::new(&shared);
    let completion = Completion {
        shared: Some(shared),
    };

    let item: WorkItem = Box::new(move || {
        let result = panic::catch_unwind(AssertUnwindSafe(work)).map_err(|payload| {
            let msg = panic_message(payload.as_ref());
            warn!("WorkerPool: Work item panicked: {msg}");
            WorkError::Panicked { msg }
        });
        completion.complete(result);
    });

    (item, handle)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        String::from(*msg)
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        String::from("unknown panic payload")
    }
}
