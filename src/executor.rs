//! Adapter that routes a host runtime's blocking work requests through
//! the pool.
//!
//! The host hands over a work request (its own type, implementing
//! [`WorkRequest`]) and the executor wraps it as a pool task whose run
//! invokes the request's work callback. When the task is destroyed on
//! the worker thread, after its completion has been counted, the
//! request's `done` callback fires; the host is responsible for
//! marshalling that signal back onto its own event loop.
//!
//! [`submit`](HostExecutor::submit) returns a [`Submission`]: the
//! equivalent of a reserved slot on the request, holding the task state
//! so the request can later be cancelled through
//! [`cancel`](HostExecutor::cancel).

use crate::pool::Threadpool;
use crate::state::{State, TaskState};
use crate::task::{Task, TaskDetails, TaskKind, Work};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// A host work request routed through the pool.
pub trait WorkRequest: Send + 'static {
    /// The blocking work callback. Runs on a worker thread; skipped if
    /// the request was cancelled before a worker claimed it.
    fn work(&mut self);

    /// Completion callback. Runs on the worker thread once the request's
    /// task has been counted complete, whether the work ran or was
    /// cancel-skipped.
    fn done(&mut self);
}

/// Work classification understood by the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkType {
    /// Filesystem work.
    Fs,
    /// DNS resolution.
    Dns,
    /// User-submitted I/O.
    UserIo,
    /// User-submitted CPU-bound work.
    UserCpu,
}

impl From<WorkType> for TaskKind {
    fn from(work_type: WorkType) -> Self {
        match work_type {
            WorkType::Fs => Self::Fs,
            WorkType::Dns => Self::Dns,
            WorkType::UserIo => Self::Io,
            WorkType::UserCpu => Self::Cpu,
        }
    }
}

/// Submission options supplied by the host.
///
/// Priority and cancelable are pass-through metadata; neither influences
/// scheduling.
#[derive(Debug, Clone, Copy)]
pub struct WorkOptions {
    /// Work classification.
    pub work_type: WorkType,
    /// Pass-through priority.
    pub priority: i32,
    /// Pass-through cancelable flag.
    pub cancelable: bool,
}

/// Handle returned by [`HostExecutor::submit`].
#[derive(Debug, Clone)]
pub struct Submission {
    state: Arc<TaskState>,
}

impl Submission {
    /// Current state of the submitted request's task.
    #[must_use]
    pub fn state(&self) -> State {
        self.state.state()
    }
}

/// Rejection status for [`HostExecutor::cancel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelRejected {
    /// The request has already completed and can no longer be cancelled.
    Busy,
}

impl fmt::Display for CancelRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy => f.write_str("request busy: already completed"),
        }
    }
}

impl std::error::Error for CancelRejected {}

/// Routes host work requests to a [`Threadpool`].
pub struct HostExecutor {
    pool: Arc<Threadpool>,
}

/// Pool task wrapping a host request.
struct HostTask<R: WorkRequest> {
    request: Option<R>,
}

impl<R: WorkRequest> Work for HostTask<R> {
    fn run(&mut self) {
        if let Some(request) = &mut self.request {
            request.work();
        }
    }
}

impl<R: WorkRequest> Drop for HostTask<R> {
    fn drop(&mut self) {
        if let Some(mut request) = self.request.take() {
            trace!("signalling host request completion");
            request.done();
        }
    }
}

impl HostExecutor {
    /// Creates an executor over the given pool.
    #[must_use]
    pub fn new(pool: Arc<Threadpool>) -> Self {
        Self { pool }
    }

    /// Wraps a request as a pool task and posts it.
    pub fn submit<R: WorkRequest>(&self, request: R, opts: Option<&WorkOptions>) -> Submission {
        let details = opts.map_or_else(TaskDetails::default, |opts| TaskDetails {
            kind: opts.work_type.into(),
            priority: opts.priority,
            cancelable: opts.cancelable,
        });
        debug!(kind = ?details.kind, "submitting host work request");
        let task = Task::new(
            HostTask {
                request: Some(request),
            },
            details,
        );
        let state = self.pool.post(task);
        Submission { state }
    }

    /// Attempts to cancel a submitted request.
    ///
    /// Returns `Ok` if the state moved into `Cancelled`. That includes a
    /// request whose work is already executing: the work still runs to
    /// completion but is reported cancelled. Once the request has
    /// completed, the cancel is rejected as busy.
    pub fn cancel(&self, submission: &Submission) -> std::result::Result<(), CancelRejected> {
        if submission.state.cancel() {
            Ok(())
        } else {
            Err(CancelRejected::Busy)
        }
    }
}

impl fmt::Debug for HostExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostExecutor")
            .field("pool", &self.pool)
            .finish()
    }
}
