//! End-to-end pool behavior.
//!
//! Scenarios covered:
//!   - Basic throughput: many tasks from one producer all complete
//!   - Shutdown while the queue is full: drop drains everything
//!   - Push after stop is rejected without touching the counters
//!   - A size-1 pool serializes execution and starts tasks in push order
//!   - Queue length and worker count introspection

mod common;

use common::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use taskpool::{State, Task, TaskQueue, Threadpool};

fn init_test(name: &str) {
    init_test_logging();
    taskpool::test_phase!(name);
}

#[test]
fn hundred_tasks_all_complete() {
    init_test("hundred_tasks_all_complete");
    let pool = Threadpool::with_size(2).expect("pool");
    let counter = Arc::new(AtomicU32::new(0));

    let handles: Vec<_> = (0..100)
        .map(|_| {
            let c = Arc::clone(&counter);
            pool.post(Task::from_fn(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }))
        })
        .collect();

    pool.blocking_drain();

    let ran = counter.load(Ordering::SeqCst);
    taskpool::assert_with_log!(ran == 100, "all tasks ran", 100u32, ran);
    for handle in handles {
        assert_eq!(handle.state(), State::Completed);
    }
    taskpool::test_complete!("hundred_tasks_all_complete");
}

#[test]
fn dropping_the_pool_drains_queued_tasks() {
    init_test("dropping_the_pool_drains_queued_tasks");
    let counter = Arc::new(AtomicU32::new(0));
    {
        let pool = Threadpool::with_size(2).expect("pool");
        for _ in 0..50 {
            let c = Arc::clone(&counter);
            pool.post(Task::from_fn(move || {
                std::thread::sleep(Duration::from_millis(10));
                c.fetch_add(1, Ordering::SeqCst);
            }));
        }
        // Drop immediately; the destructor must wait for all 50.
    }
    let ran = counter.load(Ordering::SeqCst);
    taskpool::assert_with_log!(ran == 50, "destructor drained the queue", 50u32, ran);
    taskpool::test_complete!("dropping_the_pool_drains_queued_tasks");
}

#[test]
fn push_after_stop_is_rejected() {
    init_test("push_after_stop_is_rejected");
    let pool = Threadpool::with_size(2).expect("pool");
    pool.queue().stop();

    let queue = TaskQueue::new();
    queue.stop();
    let mut task = Task::from_fn(|| unreachable!("rejected task must not run"));
    task.bind_state(Arc::new(taskpool::TaskState::new()));
    assert!(!queue.push(task));
    assert_eq!(queue.outstanding(), 0);

    // Through the pool, the drop is silent and observable on the handle.
    let handle = pool.post(Task::from_fn(|| unreachable!("rejected task must not run")));
    assert_eq!(handle.state(), State::Initial);
    assert_eq!(pool.queue().outstanding(), 0);
    taskpool::test_complete!("push_after_stop_is_rejected");
}

#[test]
fn single_worker_starts_tasks_in_push_order() {
    init_test("single_worker_starts_tasks_in_push_order");
    let pool = Threadpool::with_size(1).expect("pool");
    let order = Arc::new(Mutex::new(Vec::new()));

    for index in 0..20 {
        let order = Arc::clone(&order);
        pool.post(Task::from_fn(move || {
            order.lock().unwrap().push(index);
        }));
    }
    pool.blocking_drain();

    let observed = order.lock().unwrap().clone();
    let expected: Vec<_> = (0..20).collect();
    taskpool::assert_with_log!(
        observed == expected,
        "FIFO start order on a single worker",
        expected,
        observed
    );
    taskpool::test_complete!("single_worker_starts_tasks_in_push_order");
}

#[test]
fn single_worker_serializes_execution() {
    init_test("single_worker_serializes_execution");
    let pool = Threadpool::with_size(1).expect("pool");
    let in_flight = Arc::new(AtomicU32::new(0));
    let overlap_seen = Arc::new(AtomicU32::new(0));

    for _ in 0..10 {
        let in_flight = Arc::clone(&in_flight);
        let overlap_seen = Arc::clone(&overlap_seen);
        pool.post(Task::from_fn(move || {
            if in_flight.fetch_add(1, Ordering::SeqCst) > 0 {
                overlap_seen.fetch_add(1, Ordering::SeqCst);
            }
            std::thread::sleep(Duration::from_millis(2));
            in_flight.fetch_sub(1, Ordering::SeqCst);
        }));
    }
    pool.blocking_drain();

    assert_eq!(overlap_seen.load(Ordering::SeqCst), 0);
    taskpool::test_complete!("single_worker_serializes_execution");
}

#[test]
fn introspection_counts() {
    init_test("introspection_counts");
    let pool = Threadpool::with_size(3).expect("pool");
    assert_eq!(pool.worker_count(), 3);
    assert_eq!(pool.queue_length(), 0);

    pool.blocking_drain();
    assert_eq!(pool.queue_length(), 0);
    taskpool::test_complete!("introspection_counts");
}

#[test]
fn drain_is_reusable_across_batches() {
    init_test("drain_is_reusable_across_batches");
    let pool = Threadpool::with_size(2).expect("pool");
    let counter = Arc::new(AtomicU32::new(0));

    for batch in 1..=3u32 {
        for _ in 0..10 {
            let c = Arc::clone(&counter);
            pool.post(Task::from_fn(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }));
        }
        pool.blocking_drain();
        assert_eq!(counter.load(Ordering::SeqCst), batch * 10);
        assert_eq!(pool.queue().outstanding(), 0);
    }
    taskpool::test_complete!("drain_is_reusable_across_batches");
}

#[test]
fn stop_racing_with_posts_leaves_no_orphans() {
    init_test("stop_racing_with_posts_leaves_no_orphans");
    // A push that loses the race with stop must be rejected, not
    // enqueued after the workers have exited. Every handle must end up
    // either untouched (rejected before queueing) or terminal; a handle
    // stuck in Queued means the task was orphaned.
    for _ in 0..25 {
        let pool = Threadpool::with_size(2).expect("pool");
        let queue = Arc::clone(pool.queue());

        let barrier = Arc::new(std::sync::Barrier::new(2));
        let b = Arc::clone(&barrier);
        let stopper = std::thread::spawn(move || {
            b.wait();
            queue.stop();
        });

        barrier.wait();
        let handles: Vec<_> = (0..50)
            .map(|_| pool.post(Task::from_fn(|| {})))
            .collect();
        stopper.join().expect("stopper panicked");
        drop(pool);

        for handle in handles {
            let state = handle.state();
            assert!(
                matches!(state, State::Initial | State::Completed),
                "task orphaned in {state} state"
            );
        }
    }
    taskpool::test_complete!("stop_racing_with_posts_leaves_no_orphans");
}

#[test]
fn multiple_producers_all_tasks_complete() {
    init_test("multiple_producers_all_tasks_complete");
    let pool = Arc::new(Threadpool::with_size(4).expect("pool"));
    let counter = Arc::new(AtomicU32::new(0));

    let producers: Vec<_> = (0..4)
        .map(|_| {
            let pool = Arc::clone(&pool);
            let counter = Arc::clone(&counter);
            std::thread::spawn(move || {
                for _ in 0..50 {
                    let c = Arc::clone(&counter);
                    pool.post(Task::from_fn(move || {
                        c.fetch_add(1, Ordering::SeqCst);
                    }));
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().expect("producer panicked");
    }

    pool.blocking_drain();
    let ran = counter.load(Ordering::SeqCst);
    taskpool::assert_with_log!(ran == 200, "all producer tasks ran", 200u32, ran);
    taskpool::test_complete!("multiple_producers_all_tasks_complete");
}
