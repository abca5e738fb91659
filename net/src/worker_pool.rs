/*
A fixed set of worker threads draining a shared FIFO queue. The queue and the shutdown
flag live behind a single mutex, and a condition variable wakes idle workers on submit
and on shutdown.
*/
use std::{
    collections::VecDeque,
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
    thread::{self, JoinHandle, ThreadId},
};

use log::{info, warn};

use crate::errors::{PoolError, PoolResult};
use work_handle::WorkHandle;
use work_item::WorkItem;
use worker_thread::WorkerThread;

pub mod work_handle;
mod work_item;
mod worker_thread;

const DEFAULT_POOL_NAME: &str = "worker-pool";

pub(crate) struct PoolState {
    queue: VecDeque<WorkItem>,
    shutdown: bool,

    /// Set once every worker has been joined
    stopped: bool,
}

pub(crate) struct PoolShared {
    state: Mutex<PoolState>,
    condition: Condvar,
}

impl PoolShared {
    fn lock(self: &Self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(self: &Self, guard: MutexGuard<'a, PoolState>) -> MutexGuard<'a, PoolState> {
        self.condition
            .wait(guard)
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Executes submitted closures concurrently on a bounded number of threads.
///
/// Threads are created once, when the pool is constructed, and never resized. Each submitted
/// closure runs exactly once on one of the workers. Work is dequeued in submission order, but
/// because several workers drain the queue at the same time, completion order is not defined.
///
/// Shutting down (explicitly or by dropping the pool) stops new submissions, runs everything
/// that is already queued, then joins the worker threads.
pub struct WorkerPool {
    name: String,
    worker_count: usize,
    shared: Arc<PoolShared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    worker_ids: Vec<ThreadId>,
}

impl WorkerPool {
    pub fn new(worker_count: usize) -> PoolResult<Self> {
        Self::named(DEFAULT_POOL_NAME, worker_count)
    }

    /// Constructs a pool whose threads are named `<name>-<index>`
    pub fn named(name: &str, worker_count: usize) -> PoolResult<Self> {
        if worker_count == 0 {
            return Err(PoolError::InvalidSize);
        }

        let mut pool = Self {
            name: String::from(name),
            worker_count,
            shared: Arc::new(PoolShared {
                state: Mutex::new(PoolState {
                    queue: VecDeque::new(),
                    shutdown: false,
                    stopped: false,
                }),
                condition: Condvar::new(),
            }),
            workers: Mutex::new(Vec::with_capacity(worker_count)),
            worker_ids: Vec::with_capacity(worker_count),
        };

        for index in 0..worker_count {
            let thread_name = format!("{name}-{index}");
            let worker = WorkerThread::new(thread_name.clone(), &pool.shared);
            // Dropping the pool on error joins the workers spawned so far
            let handle = thread::Builder::new()
                .name(thread_name)
                .spawn(move || worker.run())
                .map_err(|e| PoolError::Spawn { msg: e.to_string() })?;
            pool.worker_ids.push(handle.thread().id());
            pool.lock_workers().push(handle);
        }

        info!("WorkerPool {}: Started {worker_count} workers", pool.name);
        Ok(pool)
    }

    /// Queues `work` for execution and returns a handle that resolves to its return value.
    /// Fails with `PoolError::Closed` once shutdown has started, in which case `work` is
    /// dropped without running.
    pub fn submit<F, T>(self: &Self, work: F) -> PoolResult<WorkHandle<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (item, handle) = work_item::package(work);
        {
            let mut state = self.shared.lock();
            if state.shutdown {
                return Err(PoolError::Closed);
            }
            state.queue.push_back(item);
        }
        self.shared.condition.notify_one();
        Ok(handle)
    }

    /// Stops accepting work, waits for queued work to finish and joins every worker.
    /// Every caller blocks until the workers have exited, except a caller running on one
    /// of the pool's own workers. Calling this more than once is harmless.
    pub fn shutdown(self: &Self) {
        let first_caller = {
            let mut state = self.shared.lock();
            let first_caller = !state.shutdown;
            if first_caller {
                info!(
                    "WorkerPool {}: Shutting down with {} queued items",
                    self.name,
                    state.queue.len()
                );
            }
            state.shutdown = true;
            first_caller
        };
        self.shared.condition.notify_all();

        let current = thread::current().id();
        if !first_caller {
            // The first caller joins the workers, everyone else waits for it
            if !self.worker_ids.contains(&current) {
                let mut state = self.shared.lock();
                while !state.stopped {
                    state = self.shared.wait(state);
                }
            }
            return;
        }

        let workers: Vec<JoinHandle<()>> = self.lock_workers().drain(..).collect();
        for worker in workers {
            if worker.thread().id() == current {
                // Shutdown from inside a work item; this thread exits once the queue is drained
                continue;
            }
            if worker.join().is_err() {
                warn!("WorkerPool {}: A worker thread panicked", self.name);
            }
        }

        self.shared.lock().stopped = true;
        self.shared.condition.notify_all();
        info!("WorkerPool {}: Stopped", self.name);
    }

    pub fn name(self: &Self) -> &str {
        &self.name
    }

    pub fn worker_count(self: &Self) -> usize {
        self.worker_count
    }

    /// Number of work items waiting for a free worker
    pub fn pending_count(self: &Self) -> usize {
        self.shared.lock().queue.len()
    }

    pub fn is_shut_down(self: &Self) -> bool {
        self.shared.lock().shutdown
    }

    fn lock_workers(self: &Self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.workers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
