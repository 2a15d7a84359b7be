//! The blocking FIFO task queue.
//!
//! The queue is the single rendezvous point between producers and
//! workers. One mutex guards the pending tasks, the outstanding-task
//! counter, and the stopped flag; two condition variables (one to wake
//! blocked consumers, one to announce drained-to-zero) are always
//! signalled while that mutex is held.
//!
//! # Invariants
//!
//! - Queue order is strictly FIFO by push time.
//! - `outstanding` counts queued plus in-flight tasks; it is incremented
//!   in the same critical section that enqueues and decremented only
//!   after a task has reached its terminal state, so a producer that
//!   pushes and then drains is guaranteed to see that task through.
//! - After [`stop`](TaskQueue::stop), pushes fail and every blocked
//!   consumer wakes; already-queued tasks still drain.
//! - Task state transitions never happen while the queue mutex is held
//!   (and the reverse holds elsewhere), so the two locks cannot deadlock.

use crate::state::State;
use crate::task::Task;
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use tracing::{debug, trace};

/// FIFO queue with blocking pop, drain-to-quiescence, and stop semantics.
#[derive(Debug, Default)]
pub struct TaskQueue {
    inner: Mutex<Inner>,
    task_available: Condvar,
    tasks_drained: Condvar,
}

#[derive(Debug, Default)]
struct Inner {
    tasks: VecDeque<Task>,
    outstanding: usize,
    stopped: bool,
}

impl TaskQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues a task and wakes one consumer.
    ///
    /// Returns false if the queue has stopped; the task is dropped and
    /// its state left untouched. Otherwise the task is transitioned to
    /// [`State::Queued`]; a producer may have cancelled it in the window
    /// between construction and push, in which case the transition
    /// observes `Cancelled`. Cancelled tasks are enqueued regardless:
    /// they are cheap to skip at pop time, and enqueueing them keeps the
    /// completion accounting uniform.
    ///
    /// A push that loses an exact race with [`stop`](Self::stop) is also
    /// rejected, after the queueing transition has already happened; the
    /// task is then driven straight to its terminal state before being
    /// dropped, so its handle never dangles in a non-terminal state.
    ///
    /// The task must have been bound to a [`TaskState`](crate::TaskState)
    /// before it is pushed.
    pub fn push(&self, task: Task) -> bool {
        {
            let inner = self.inner.lock().unwrap();
            if inner.stopped {
                debug!("push rejected: queue stopped");
                return false;
            }
        }

        // State transition outside the queue's critical section.
        let state = task.try_update(State::Queued);
        debug_assert!(
            matches!(state, State::Queued | State::Cancelled),
            "unexpected state {state} after queueing transition",
        );

        let mut inner = self.inner.lock().unwrap();
        // Stop may have won the race between the two critical sections.
        // By now every worker may already have observed empty-and-stopped
        // and exited, so enqueueing would orphan the task and hang any
        // later drain. Reject, and complete the task's state machine so
        // the producer's handle still reaches a terminal state.
        if inner.stopped {
            drop(inner);
            debug!("push rejected: queue stopped during push");
            task.try_update(State::Cancelled);
            task.try_update(State::Completed);
            return false;
        }
        inner.tasks.push_back(task);
        inner.outstanding += 1;
        trace!(
            queued = inner.tasks.len(),
            outstanding = inner.outstanding,
            "task queued"
        );
        self.task_available.notify_one();
        true
    }

    /// Removes and returns the head task without blocking.
    ///
    /// Does not touch the outstanding count: a popped task remains
    /// outstanding until its completion is notified.
    #[must_use]
    pub fn pop(&self) -> Option<Task> {
        self.inner.lock().unwrap().tasks.pop_front()
    }

    /// Blocks until a task is available or the queue stops.
    ///
    /// Returns `None` only when the queue is both empty and stopped. A
    /// stopped queue keeps handing out tasks while any remain, so
    /// consumers drain it completely before exiting.
    #[must_use]
    pub fn blocking_pop(&self) -> Option<Task> {
        let mut inner = self.inner.lock().unwrap();
        while inner.tasks.is_empty() && !inner.stopped {
            inner = self.task_available.wait(inner).unwrap();
        }
        inner.tasks.pop_front()
    }

    /// Records that a previously popped task has completed.
    ///
    /// When the outstanding count reaches zero, every waiter in
    /// [`blocking_drain`](Self::blocking_drain) is woken.
    pub fn notify_of_completion(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.outstanding = inner
            .outstanding
            .checked_sub(1)
            .expect("completion notified with no outstanding tasks");
        if inner.outstanding == 0 {
            trace!("all outstanding tasks completed");
            self.tasks_drained.notify_all();
        }
    }

    /// Blocks until every outstanding task, queued or in flight, has
    /// completed.
    pub fn blocking_drain(&self) {
        let mut inner = self.inner.lock().unwrap();
        while inner.outstanding > 0 {
            inner = self.tasks_drained.wait(inner).unwrap();
        }
        debug!("queue fully drained");
    }

    /// Permanently refuses new pushes and wakes every blocked consumer.
    ///
    /// Stopping during a drain is permitted: already-queued tasks still
    /// run to completion.
    pub fn stop(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.stopped = true;
        debug!(queued = inner.tasks.len(), "queue stopped");
        self.task_available.notify_all();
    }

    /// Number of queued (not yet claimed) tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().tasks.len()
    }

    /// Returns true if no tasks are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of outstanding tasks (queued plus in flight).
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.inner.lock().unwrap().outstanding
    }

    /// Returns true if the queue has been stopped.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.inner.lock().unwrap().stopped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TaskState;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn bound_task() -> (Task, Arc<TaskState>) {
        let mut task = Task::from_fn(|| {});
        let state = Arc::new(TaskState::new());
        task.bind_state(Arc::clone(&state));
        (task, state)
    }

    #[test]
    fn push_pop_is_fifo() {
        let queue = TaskQueue::new();
        let (first, first_state) = bound_task();
        let (second, second_state) = bound_task();
        assert!(queue.push(first));
        assert!(queue.push(second));
        assert_eq!(queue.len(), 2);

        let head = queue.pop().unwrap();
        assert_eq!(head.try_update(State::Assigned), State::Assigned);
        assert_eq!(first_state.state(), State::Assigned);
        assert_eq!(second_state.state(), State::Queued);
    }

    #[test]
    fn pop_does_not_decrement_outstanding() {
        let queue = TaskQueue::new();
        let (task, _state) = bound_task();
        assert!(queue.push(task));
        let _popped = queue.pop().unwrap();
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.outstanding(), 1);
        queue.notify_of_completion();
        assert_eq!(queue.outstanding(), 0);
    }

    #[test]
    fn push_after_stop_fails_without_side_effects() {
        let queue = TaskQueue::new();
        queue.stop();
        let (task, state) = bound_task();
        assert!(!queue.push(task));
        assert_eq!(queue.outstanding(), 0);
        assert_eq!(queue.len(), 0);
        assert_eq!(state.state(), State::Initial);
    }

    #[test]
    fn cancelled_task_is_enqueued_anyway() {
        let queue = TaskQueue::new();
        let (task, state) = bound_task();
        assert!(state.cancel());
        assert!(queue.push(task));
        assert_eq!(queue.len(), 1);
        assert_eq!(state.state(), State::Cancelled);
    }

    #[test]
    fn blocking_pop_returns_none_on_empty_stopped() {
        let queue = TaskQueue::new();
        queue.stop();
        assert!(queue.blocking_pop().is_none());
    }

    #[test]
    fn blocking_pop_drains_stopped_queue() {
        let queue = TaskQueue::new();
        let (task, _state) = bound_task();
        assert!(queue.push(task));
        queue.stop();
        assert!(queue.blocking_pop().is_some());
        assert!(queue.blocking_pop().is_none());
    }

    #[test]
    fn stop_wakes_blocked_consumers() {
        let queue = Arc::new(TaskQueue::new());
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.blocking_pop())
        };
        thread::sleep(Duration::from_millis(20));
        queue.stop();
        assert!(consumer.join().unwrap().is_none());
    }

    #[test]
    fn blocking_pop_wakes_on_push() {
        let queue = Arc::new(TaskQueue::new());
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.blocking_pop())
        };
        thread::sleep(Duration::from_millis(20));
        let (task, _state) = bound_task();
        assert!(queue.push(task));
        assert!(consumer.join().unwrap().is_some());
    }

    #[test]
    fn drain_waits_for_completion_notice() {
        let queue = Arc::new(TaskQueue::new());
        let (task, _state) = bound_task();
        assert!(queue.push(task));

        let drainer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.blocking_drain())
        };
        thread::sleep(Duration::from_millis(20));
        assert!(!drainer.is_finished());

        let _popped = queue.pop().unwrap();
        queue.notify_of_completion();
        drainer.join().unwrap();
        assert_eq!(queue.outstanding(), 0);
    }

    #[test]
    fn drain_on_empty_queue_returns_immediately() {
        let queue = TaskQueue::new();
        queue.blocking_drain();
    }
}
