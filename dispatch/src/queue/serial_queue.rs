// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! FIFO, non-overlapping execution on top of any [`WorkerPool`]. See
//! [`SerialQueueImpl`].

use super::queue_handle::{Queue, QueueImpl};
use crate::{backend::BackendType, operation::Operation, pool::WorkerPool,
            priority::QueuePriority};
use std::{collections::VecDeque,
          sync::{Arc, Mutex, Weak}};

/// Creates a serial queue draining into `pool`.
///
/// This is the one constructor for every serial flavor: user-created serial queues
/// drain into the default pool, the main queue drains into the single-threaded main
/// executor, and host backends pass their own [`WorkerPool`] proxy.
pub(crate) fn create_serial_queue(
    label: impl Into<String>,
    pool: Arc<dyn WorkerPool>,
    priority: QueuePriority,
    backend_type: BackendType,
) -> Queue {
    Queue::new(SerialQueueImpl::new(label.into(), pool, priority, backend_type))
}

/// Serial queue state machine.
///
/// Guarantee: operations submitted to the same serial queue execute in submission
/// order, exactly once, never two at a time, with a happens-before edge from the end of
/// each operation to the start of the next (both run under the same drain, or the drain
/// handoff goes through the queue lock).
///
/// # The `busy` Flag
///
/// `dispatch_async` appends under the lock and submits a **drain task** to the pool
/// only when the queue was not already busy. The drain pops and runs operations one at
/// a time - releasing the lock around each invocation - and clears `busy` in the same
/// critical section that observes the FIFO empty. That atomicity is what prevents a
/// racing `dispatch_async` from seeing `busy == true` *after* the drain has already
/// decided to stop, which would strand the new operation.
pub(crate) struct SerialQueueImpl {
    label: String,
    priority: QueuePriority,
    backend_type: BackendType,
    pool: Arc<dyn WorkerPool>,
    /// Back-reference to the owning [`Arc`], needed to move `self` into drain tasks.
    me: Weak<SerialQueueImpl>,
    state: Mutex<SerialQueueState>,
}

struct SerialQueueState {
    fifo: VecDeque<Operation>,
    busy: bool,
}

impl SerialQueueImpl {
    fn new(
        label: String,
        pool: Arc<dyn WorkerPool>,
        priority: QueuePriority,
        backend_type: BackendType,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            label,
            priority,
            backend_type,
            pool,
            me: me.clone(),
            state: Mutex::new(SerialQueueState {
                fifo: VecDeque::new(),
                busy: false,
            }),
        })
    }

    /// Pops and runs pending operations until the FIFO drains. The pending drain task
    /// holds a strong reference to the queue, so a queue with queued work stays alive
    /// even if every user handle is dropped.
    fn drain(&self) {
        loop {
            let op = {
                let mut state = self.state.lock().unwrap();
                match state.fifo.pop_front() {
                    Some(op) => op,
                    None => {
                        // Emptiness check and busy-clear are one critical section.
                        state.busy = false;
                        return;
                    }
                }
            };
            op.invoke_caught();
        }
    }
}

impl QueueImpl for SerialQueueImpl {
    fn dispatch_async_operation(&self, op: Operation) {
        let submit_drain = {
            let mut state = self.state.lock().unwrap();
            state.fifo.push_back(op);
            if state.busy {
                false
            } else {
                state.busy = true;
                true
            }
        };

        if submit_drain {
            let Some(me) = self.me.upgrade() else { return };
            self.pool
                .execute(Operation::new(move || me.drain()), self.priority);
        }
    }

    fn label(&self) -> &str { &self.label }

    fn priority(&self) -> QueuePriority { self.priority }

    fn backend_type(&self) -> BackendType { self.backend_type }
}

#[cfg(test)]
mod tests {
    use super::create_serial_queue;
    use crate::{backend::BackendType, pool::NaivePool, priority::QueuePriority};
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex,
                    atomic::{AtomicUsize, Ordering}};
    use std::time::{Duration, Instant};

    fn wait_until(probe: impl Fn() -> bool, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if probe() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        probe()
    }

    #[test]
    fn test_operations_run_in_submission_order() {
        let pool = NaivePool::new();
        let queue = create_serial_queue(
            "test-serial",
            Arc::new(pool.clone()),
            QueuePriority::Default,
            BackendType::Naive,
        );

        let observed = Arc::new(Mutex::new(Vec::new()));
        for index in 0..100 {
            let observed = observed.clone();
            queue.dispatch_async(move || observed.lock().unwrap().push(index));
        }

        assert!(wait_until(
            || observed.lock().unwrap().len() == 100,
            Duration::from_secs(5)
        ));
        let observed = observed.lock().unwrap();
        assert_eq!(*observed, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_operations_never_overlap() {
        let pool = NaivePool::new();
        let queue = create_serial_queue(
            "test-overlap",
            Arc::new(pool.clone()),
            QueuePriority::Default,
            BackendType::Naive,
        );

        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_in_flight = Arc::new(AtomicUsize::new(0));
        let completed = Arc::new(AtomicUsize::new(0));

        for _ in 0..50 {
            let in_flight = in_flight.clone();
            let max_in_flight = max_in_flight.clone();
            let completed = completed.clone();
            queue.dispatch_async(move || {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_in_flight.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_micros(200));
                in_flight.fetch_sub(1, Ordering::SeqCst);
                completed.fetch_add(1, Ordering::SeqCst);
            });
        }

        assert!(wait_until(
            || completed.load(Ordering::SeqCst) == 50,
            Duration::from_secs(5)
        ));
        assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_queue_goes_idle_and_wakes_again() {
        let pool = NaivePool::new();
        let queue = create_serial_queue(
            "test-idle",
            Arc::new(pool.clone()),
            QueuePriority::Default,
            BackendType::Naive,
        );

        let counter = Arc::new(AtomicUsize::new(0));

        let counter_first = counter.clone();
        queue.dispatch_async(move || {
            counter_first.fetch_add(1, Ordering::SeqCst);
        });
        assert!(wait_until(
            || counter.load(Ordering::SeqCst) == 1,
            Duration::from_secs(5)
        ));

        // The drain has exited; a new submission must start a fresh one.
        let counter_second = counter.clone();
        queue.dispatch_async(move || {
            counter_second.fetch_add(1, Ordering::SeqCst);
        });
        assert!(wait_until(
            || counter.load(Ordering::SeqCst) == 2,
            Duration::from_secs(5)
        ));
    }

    #[test]
    fn test_current_queue_resolves_inside_operation() {
        let pool = NaivePool::new();
        let queue = create_serial_queue(
            "test-current",
            Arc::new(pool.clone()),
            QueuePriority::Default,
            BackendType::Naive,
        );

        let seen_label = Arc::new(Mutex::new(String::new()));
        let seen_label_clone = seen_label.clone();
        queue.dispatch_async(move || {
            let current = crate::operation::current_queue().unwrap();
            *seen_label_clone.lock().unwrap() = current.label().to_string();
        });

        assert!(wait_until(
            || !seen_label.lock().unwrap().is_empty(),
            Duration::from_secs(5)
        ));
        assert_eq!(*seen_label.lock().unwrap(), "test-current");
    }
}
