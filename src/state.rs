//! The per-task lifecycle state machine.
//!
//! Every task posted to the pool carries a [`TaskState`]: a small,
//! mutex-protected state machine shared between the producer (which
//! keeps an `Arc` to it as a cancellation handle) and the pool (which
//! advances it through execution). Its lifetime is that of the longest
//! holder.
//!
//! # Transitions
//!
//! ```text
//! Initial ──► Queued ──► Assigned ──► Completed
//!    │           │           │            ▲
//!    └───────────┴───────────┴─► Cancelled┘
//! ```
//!
//! `Completed` is terminal. Any transition not drawn above is rejected
//! and leaves the state unchanged. [`TaskState::try_update`] is the
//! single primitive every other transition goes through, which is what
//! makes the cancellation race well-defined:
//!
//! - If a worker wins, its `Queued → Assigned` claim succeeds, the task
//!   runs, and a later cancel can no longer prevent execution.
//! - If the canceller wins, the worker's claim attempt observes
//!   `Cancelled`, skips the run, and still drives the task to
//!   `Completed` so the drain counter balances.

use std::fmt;
use std::sync::Mutex;
use tracing::trace;

/// A discrete point in the task lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// Constructed but not yet queued.
    Initial,
    /// In the queue, awaiting a worker.
    Queued,
    /// Claimed by a worker; the run is imminent or underway.
    Assigned,
    /// Cancellation took effect before the task completed.
    Cancelled,
    /// Terminal: the task ran to completion or was cancel-skipped.
    Completed,
}

impl State {
    /// Returns true for the terminal state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Static name, for tracing and diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Queued => "queued",
            Self::Assigned => "assigned",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }

    /// The transition relation.
    const fn can_become(self, new: Self) -> bool {
        match self {
            Self::Initial => matches!(new, Self::Queued | Self::Cancelled),
            Self::Queued => matches!(new, Self::Assigned | Self::Cancelled),
            Self::Assigned => matches!(new, Self::Completed | Self::Cancelled),
            Self::Cancelled => matches!(new, Self::Completed),
            Self::Completed => false,
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Shared, mutex-protected task state.
///
/// Doubles as the producer's cancellation handle: `Threadpool::post`
/// returns an `Arc<TaskState>` on which [`cancel`](Self::cancel) may be
/// called at any time.
#[derive(Debug)]
pub struct TaskState {
    current: Mutex<State>,
}

impl TaskState {
    /// Creates a state machine in [`State::Initial`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: Mutex::new(State::Initial),
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> State {
        *self.current.lock().unwrap()
    }

    /// Attempts to move the state machine to `new`.
    ///
    /// The write happens only if `(current, new)` is a valid transition;
    /// either way the resulting state is returned, so the caller can
    /// tell from a single atomic step whether it won or lost a race.
    pub fn try_update(&self, new: State) -> State {
        let mut current = self.current.lock().unwrap();
        if current.can_become(new) {
            trace!(from = %*current, to = %new, "task state transition");
            *current = new;
        } else {
            trace!(state = %*current, rejected = %new, "task state transition rejected");
        }
        *current
    }

    /// Requests cancellation.
    ///
    /// Returns true iff the state is `Cancelled` afterwards. Cancelling
    /// an already-cancelled task is idempotent and returns true again; a
    /// completed task cannot be cancelled and returns false. Cancellation
    /// is never forced: a task that is already executing runs to
    /// completion regardless.
    pub fn cancel(&self) -> bool {
        self.try_update(State::Cancelled) == State::Cancelled
    }
}

impl Default for TaskState {
    fn default() -> Self {
        Self::new()
    }
}
