//! The thread pool: submission, introspection, drain, and shutdown.

use crate::config::PoolConfig;
use crate::error::Result;
use crate::queue::TaskQueue;
use crate::state::TaskState;
use crate::task::Task;
use crate::worker::Worker;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A fixed-size pool of worker threads fed by a single FIFO queue.
///
/// The pool size is determined at construction (see
/// [`PoolConfig`](crate::PoolConfig)) and never changes. Dropping the
/// pool stops the queue, waits for workers to drain everything already
/// queued, and joins them.
///
/// # Example
///
/// ```
/// use taskpool::{State, Task, Threadpool};
///
/// let pool = Threadpool::with_size(2).unwrap();
/// let handle = pool.post(Task::from_fn(|| {
///     // blocking work
/// }));
/// pool.blocking_drain();
/// assert_eq!(handle.state(), State::Completed);
/// ```
pub struct Threadpool {
    queue: Arc<TaskQueue>,
    workers: Vec<Worker>,
}

impl Threadpool {
    /// Creates a pool sized by the default policy (environment variable,
    /// then host CPU count, then 4).
    pub fn new() -> Result<Self> {
        Self::with_config(PoolConfig::new())
    }

    /// Creates a pool with an explicit number of workers.
    pub fn with_size(size: usize) -> Result<Self> {
        Self::with_config(PoolConfig::new().size(size))
    }

    /// Creates a pool from a full configuration.
    ///
    /// If a worker thread cannot be spawned, workers already started are
    /// stopped and joined before the error is returned.
    pub fn with_config(config: PoolConfig) -> Result<Self> {
        let size = config.resolved_size()?;
        let queue = Arc::new(TaskQueue::new());
        let mut workers = Vec::with_capacity(size);
        for index in 0..size {
            let name = format!("{}-{index}", config.prefix());
            let started = Worker::start(
                Arc::clone(&queue),
                name,
                config.on_thread_start.clone(),
                config.on_thread_stop.clone(),
            );
            match started {
                Ok(worker) => workers.push(worker),
                Err(err) => {
                    queue.stop();
                    for worker in &mut workers {
                        worker.join();
                    }
                    return Err(err);
                }
            }
        }
        debug!(workers = size, "thread pool started");
        Ok(Self { queue, workers })
    }

    /// Submits a task, returning its shared state as a cancellation
    /// handle.
    ///
    /// Post never fails from the caller's side. If the queue has already
    /// stopped the task is silently dropped and the returned handle
    /// stays in [`State::Initial`](crate::State::Initial); callers that
    /// need to detect this check [`TaskState::state`]. A post that loses
    /// an exact race with the stop is also dropped, with the handle
    /// driven to [`State::Completed`](crate::State::Completed) without
    /// the task running.
    pub fn post(&self, mut task: Task) -> Arc<TaskState> {
        let state = Arc::new(TaskState::new());
        task.bind_state(Arc::clone(&state));
        debug!(kind = ?task.details().kind, "task posted");
        if !self.queue.push(task) {
            debug!("post after stop: task dropped");
        }
        state
    }

    /// Number of queued (not yet claimed) tasks.
    #[must_use]
    pub fn queue_length(&self) -> usize {
        self.queue.len()
    }

    /// Number of worker threads.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Blocks until every posted task, queued or in flight, has
    /// completed.
    pub fn blocking_drain(&self) {
        self.queue.blocking_drain();
    }

    /// The underlying queue.
    #[must_use]
    pub fn queue(&self) -> &Arc<TaskQueue> {
        &self.queue
    }
}

impl Drop for Threadpool {
    fn drop(&mut self) {
        // Refuse new pushes; workers pop until the queue is empty, then
        // observe the stop and exit.
        self.queue.stop();
        for worker in &mut self.workers {
            worker.join();
        }
        debug!("thread pool shut down");
    }
}

impl fmt::Debug for Threadpool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Threadpool")
            .field("workers", &self.workers.len())
            .field("queued", &self.queue.len())
            .field("outstanding", &self.queue.outstanding())
            .finish()
    }
}
