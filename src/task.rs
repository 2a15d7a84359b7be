//! Units of work and their metadata.

use crate::state::{State, TaskState};
use std::fmt;
use std::sync::Arc;

/// A piece of blocking work.
///
/// `run` is invoked at most once, only after the task has won its claim
/// (the `Queued → Assigned` transition), and on whichever worker thread
/// picked it up; implementations must not assume a particular thread.
pub trait Work: Send + 'static {
    /// Executes the work.
    fn run(&mut self);
}

/// Broad classification of a task's workload.
///
/// Carried for host runtimes; dispatch is FIFO regardless of kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Filesystem work.
    Fs,
    /// DNS resolution.
    Dns,
    /// User-submitted I/O.
    Io,
    /// User-submitted CPU-bound work.
    Cpu,
    /// Work posted on behalf of an embedded VM.
    V8,
    /// Unclassified work.
    Unknown,
}

/// Pass-through metadata attached to a task.
#[derive(Debug, Clone, Copy)]
pub struct TaskDetails {
    /// Workload classification hint.
    pub kind: TaskKind,
    /// Priority hint; −1 means unset. Accepted but not acted upon.
    pub priority: i32,
    /// Whether the producer considers the task cancelable.
    pub cancelable: bool,
}

impl Default for TaskDetails {
    fn default() -> Self {
        Self {
            kind: TaskKind::Unknown,
            priority: -1,
            cancelable: false,
        }
    }
}

/// One unit of work submitted to the pool.
///
/// A task is exclusively owned by the queue while queued, then by the
/// worker that claimed it. It is dropped on the worker thread right
/// after its completion has been notified, so drop-order side effects
/// (such as a host `done` callback) observe all worker-thread writes.
pub struct Task {
    state: Option<Arc<TaskState>>,
    details: TaskDetails,
    work: Box<dyn Work>,
}

/// Adapter so plain closures can be posted without a named type.
struct Closure(Option<Box<dyn FnOnce() + Send + 'static>>);

impl Work for Closure {
    fn run(&mut self) {
        if let Some(f) = self.0.take() {
            f();
        }
    }
}

impl Task {
    /// Creates a task around an arbitrary [`Work`] implementation.
    #[must_use]
    pub fn new(work: impl Work, details: TaskDetails) -> Self {
        Self {
            state: None,
            details,
            work: Box::new(work),
        }
    }

    /// Creates a task from a closure, with default details.
    #[must_use]
    pub fn from_fn(f: impl FnOnce() + Send + 'static) -> Self {
        Self::new(Closure(Some(Box::new(f))), TaskDetails::default())
    }

    /// Returns the task metadata.
    #[must_use]
    pub const fn details(&self) -> TaskDetails {
        self.details
    }

    /// Binds the shared state machine.
    ///
    /// Called exactly once, just before the task is enqueued; the pool
    /// does this inside [`Threadpool::post`](crate::Threadpool::post).
    /// Binding twice is a programming error.
    pub fn bind_state(&mut self, state: Arc<TaskState>) {
        assert!(self.state.is_none(), "task state bound twice");
        self.state = Some(state);
    }

    /// Forwards to the bound state's transition primitive.
    ///
    /// # Panics
    ///
    /// Panics if no state has been bound; only bound tasks may be
    /// enqueued.
    pub(crate) fn try_update(&self, new: State) -> State {
        self.state
            .as_ref()
            .expect("task state not bound")
            .try_update(new)
    }

    /// Runs the work. Called at most once, by the claiming worker.
    pub(crate) fn run(&mut self) {
        self.work.run();
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("details", &self.details)
            .field("bound", &self.state.is_some())
            .finish_non_exhaustive()
    }
}
