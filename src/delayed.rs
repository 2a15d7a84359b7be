//! Delayed task submission.
//!
//! A [`DelayedTaskScheduler`] owns one dedicated timer thread that holds
//! tasks until their deadline, then posts them to the pool as ordinary
//! background work. Stopping the scheduler discards tasks that are not
//! yet due; tasks already handed to the pool are unaffected.

use crate::error::{Error, ErrorKind, Result};
use crate::pool::Threadpool;
use crate::task::Task;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// A task waiting for its deadline.
struct DelayedEntry {
    due: Instant,
    /// Insertion order, so equal deadlines fire FIFO.
    seq: u64,
    task: Task,
}

impl PartialEq for DelayedEntry {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for DelayedEntry {}

impl PartialOrd for DelayedEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DelayedEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so the BinaryHeap surfaces the earliest deadline.
        (other.due, other.seq).cmp(&(self.due, self.seq))
    }
}

#[derive(Default)]
struct SchedulerInner {
    pending: BinaryHeap<DelayedEntry>,
    next_seq: u64,
    stopped: bool,
}

struct Shared {
    inner: Mutex<SchedulerInner>,
    wakeup: Condvar,
}

/// Schedules tasks for submission to a pool after a delay.
pub struct DelayedTaskScheduler {
    shared: Arc<Shared>,
    thread: Option<JoinHandle<()>>,
}

impl DelayedTaskScheduler {
    /// Starts the scheduler thread over the given pool.
    pub fn start(pool: Arc<Threadpool>) -> Result<Self> {
        let shared = Arc::new(Shared {
            inner: Mutex::new(SchedulerInner::default()),
            wakeup: Condvar::new(),
        });
        let thread_shared = Arc::clone(&shared);
        let thread = thread::Builder::new()
            .name("taskpool-delayed".to_string())
            .spawn(move || run(&thread_shared, &pool))
            .map_err(|e| Error::new(ErrorKind::ThreadSpawn).with_source(e))?;
        Ok(Self {
            shared,
            thread: Some(thread),
        })
    }

    /// Schedules `task` to be posted after `delay`.
    ///
    /// Returns false, dropping the task, if the scheduler has stopped.
    /// The task is posted through the pool's normal submission path, so
    /// its cancellation handle is created at posting time and is not
    /// reachable from here.
    pub fn post_delayed(&self, task: Task, delay: Duration) -> bool {
        let mut inner = self.shared.inner.lock().unwrap();
        if inner.stopped {
            debug!("delayed post rejected: scheduler stopped");
            return false;
        }
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.pending.push(DelayedEntry {
            due: Instant::now() + delay,
            seq,
            task,
        });
        trace!(pending = inner.pending.len(), delay = ?delay, "task delayed");
        self.shared.wakeup.notify_one();
        true
    }

    /// Number of tasks still waiting for their deadline.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared.inner.lock().unwrap().pending.len()
    }

    /// Stops the scheduler, discarding tasks that are not yet due, and
    /// joins the timer thread.
    pub fn stop(&mut self) {
        {
            let mut inner = self.shared.inner.lock().unwrap();
            if inner.stopped {
                return;
            }
            inner.stopped = true;
            let discarded = inner.pending.len();
            inner.pending.clear();
            debug!(discarded, "delayed task scheduler stopped");
            self.shared.wakeup.notify_all();
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for DelayedTaskScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(shared: &Shared, pool: &Threadpool) {
    let mut inner = shared.inner.lock().unwrap();
    loop {
        if inner.stopped {
            break;
        }

        let now = Instant::now();
        let mut due = Vec::new();
        while inner.pending.peek().is_some_and(|entry| entry.due <= now) {
            due.push(inner.pending.pop().unwrap().task);
        }

        if !due.is_empty() {
            // Post outside the scheduler's critical section.
            drop(inner);
            for task in due {
                let _ = pool.post(task);
            }
            inner = shared.inner.lock().unwrap();
            continue;
        }

        let next_due = inner.pending.peek().map(|entry| entry.due);
        inner = match next_due {
            Some(deadline) => {
                let timeout = deadline.saturating_duration_since(now);
                shared.wakeup.wait_timeout(inner, timeout).unwrap().0
            }
            None => shared.wakeup.wait(inner).unwrap(),
        };
    }
}
