#![allow(dead_code)]
//! Shared integration test utilities.
//!
//! Import with:
//! ```
//! mod common;
//! use common::*;
//! ```

pub use taskpool::test_utils::init_test_logging;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// A reusable gate a task can block on until the test releases it.
#[derive(Default)]
pub struct Gate {
    open: Mutex<bool>,
    cond: Condvar,
}

impl Gate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Blocks until the gate is opened, or at most `timeout`.
    pub fn wait(&self, timeout: Duration) {
        let mut open = self.open.lock().unwrap();
        while !*open {
            let (guard, result) = self.cond.wait_timeout(open, timeout).unwrap();
            open = guard;
            if result.timed_out() {
                break;
            }
        }
    }

    /// Opens the gate, releasing every waiter.
    pub fn open(&self) {
        let mut open = self.open.lock().unwrap();
        *open = true;
        self.cond.notify_all();
    }
}

/// Counter shared with tasks to observe how many actually ran.
#[derive(Default)]
pub struct RunCounter {
    ran: AtomicUsize,
}

impl RunCounter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record(&self) {
        self.ran.fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.ran.load(Ordering::SeqCst)
    }
}
