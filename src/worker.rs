//! Worker threads that drain the task queue.

use crate::error::{Error, ErrorKind, Result};
use crate::queue::TaskQueue;
use crate::state::State;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, trace};

/// Callback invoked as a worker thread starts or stops.
pub(crate) type ThreadCallback = Arc<dyn Fn() + Send + Sync>;

/// A single pool thread. Exclusively owned by the pool.
pub(crate) struct Worker {
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Spawns the backing thread, which loops on the queue until the
    /// queue is empty and stopped.
    pub(crate) fn start(
        queue: Arc<TaskQueue>,
        name: String,
        on_start: Option<ThreadCallback>,
        on_stop: Option<ThreadCallback>,
    ) -> Result<Self> {
        let handle = thread::Builder::new()
            .name(name)
            .spawn(move || {
                if let Some(callback) = &on_start {
                    callback();
                }
                run(&queue);
                if let Some(callback) = &on_stop {
                    callback();
                }
            })
            .map_err(|e| Error::new(ErrorKind::ThreadSpawn).with_source(e))?;
        Ok(Self {
            handle: Some(handle),
        })
    }

    /// Waits for the backing thread to exit.
    pub(crate) fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// The worker loop: claim, run or skip, complete, notify, release.
fn run(queue: &TaskQueue) {
    while let Some(mut task) = queue.blocking_pop() {
        match task.try_update(State::Assigned) {
            State::Assigned => {
                trace!("running task");
                if catch_unwind(AssertUnwindSafe(|| task.run())).is_err() {
                    error!("task panicked; completing it anyway");
                }
            }
            // Lost the claim to a producer-side cancel.
            State::Cancelled => trace!("skipping cancelled task"),
            other => unreachable!("claim attempt left task in {other} state"),
        }

        let done = task.try_update(State::Completed);
        assert_eq!(done, State::Completed, "task failed to reach terminal state");
        queue.notify_of_completion();
        // The task drops here, on the worker thread, after the
        // completion notification.
        drop(task);
    }
    debug!("worker exiting: queue empty and stopped");
}
