//! Taskpool: a cancellable worker thread pool for blocking work.
//!
//! # Overview
//!
//! Taskpool executes opaque units of work from multiple producers on a
//! fixed set of long-lived worker threads. It is built around three
//! guarantees that every caller can rely on:
//!
//! - **Terminal reachability**: every task that enters the queue reaches
//!   its completed state exactly once, whether it ran or was cancelled.
//! - **Well-defined cancellation races**: a producer-side cancel and a
//!   worker-side claim are arbitrated by a single state-machine
//!   primitive; exactly one of {run-to-completion, run-skipped} happens
//!   per posted task.
//! - **Drain-to-quiescence**: [`Threadpool::blocking_drain`] returns only
//!   once every posted task, queued or in flight, has completed.
//!
//! Scheduling is strictly FIFO. Task metadata (type, priority,
//! cancelable) is carried for the benefit of host runtimes but never
//! consulted by the dispatcher.
//!
//! # Module Structure
//!
//! - [`state`]: the per-task lifecycle state machine and cancellation handle
//! - [`task`]: the unit of work and its metadata
//! - [`queue`]: the blocking FIFO queue with drain and stop semantics
//! - [`pool`]: the thread pool itself
//! - [`executor`]: adapter routing a host runtime's work requests through the pool
//! - [`delayed`]: timer thread for delayed task submission
//! - [`config`]: pool sizing policy and thread options
//! - [`error`]: error types
//! - [`test_utils`]: logging and assertion helpers shared by the test suite
//!
//! # Example
//!
//! ```
//! use taskpool::{Task, Threadpool};
//!
//! let pool = Threadpool::with_size(2).unwrap();
//! let handle = pool.post(Task::from_fn(|| {
//!     // blocking work
//! }));
//! pool.blocking_drain();
//! assert!(handle.state().is_terminal());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod delayed;
pub mod error;
pub mod executor;
pub mod pool;
pub mod queue;
pub mod state;
pub mod task;
pub mod test_utils;

mod worker;

pub use config::{PoolConfig, DEFAULT_POOL_SIZE, ENV_POOL_SIZE};
pub use delayed::DelayedTaskScheduler;
pub use error::{Error, ErrorKind, Result};
pub use executor::{CancelRejected, HostExecutor, Submission, WorkOptions, WorkRequest, WorkType};
pub use pool::Threadpool;
pub use queue::TaskQueue;
pub use state::{State, TaskState};
pub use task::{Task, TaskDetails, TaskKind, Work};
