use std::sync::Arc;

use log::info;

#[cfg(debug_assertions)]
use log::debug;

use super::{work_item::WorkItem, PoolShared};

/// One of the long-lived threads of a worker pool. Construct with new() then call run()
/// in the thread spawn closure.
pub(super) struct WorkerThread {
    name: String,
    shared: Arc<PoolShared>,
}

impl WorkerThread {
    pub(super) fn new(name: String, shared: &Arc<PoolShared>) -> Self {
        Self {
            name,
            shared: shared.clone(),
        }
    }

    /// Executes work items until the pool is shut down and its queue is empty
    pub(super) fn run(self: Self) {
        info!("WorkerThread {}: Started", self.name);
        while let Some(item) = self.next_item() {
            #[cfg(debug_assertions)]
            debug!("WorkerThread {}: Executing work item", self.name);
            item();
        }
        info!("WorkerThread {}: Stopped", self.name);
    }

    /// Blocks until there is work at the head of the queue. Returns None only when
    /// shutdown was signalled and nothing is left to drain.
    fn next_item(self: &Self) -> Option<WorkItem> {
        let mut state = self.shared.lock();
        loop {
            if let Some(item) = state.queue.pop_front() {
                return Some(item);
            }
            if state.shutdown {
                return None;
            }
            state = self.shared.wait(state);
        }
    }
}
