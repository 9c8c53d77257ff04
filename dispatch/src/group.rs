// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Counting barrier over a set of queued operations. See [`Group`].

use crate::{backend::BackendType, error::DispatchError, operation::Operation,
            queue::Queue};
use smallvec::SmallVec;
use std::{fmt,
          sync::{Arc, Condvar, Mutex},
          time::{Duration, Instant}};

/// Outcome of [`Group::wait()`].
///
/// # Why Not Just `bool`?
///
/// `bool` requires remembering what `true` means. `WaitResult::Completed` is
/// unambiguous at the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum WaitResult {
    /// The group's outstanding-work counter reached zero before the timeout.
    Completed,
    /// The timeout elapsed while work was still outstanding.
    TimedOut,
}

impl WaitResult {
    /// `true` iff the wait observed the counter at zero.
    #[must_use]
    pub fn is_completed(self) -> bool { matches!(self, Self::Completed) }
}

/// Counting synchronizer over a set of operations, with on-zero notifications.
///
/// The counter starts at zero. [`enter()`] increments it, [`leave()`] decrements it;
/// [`dispatch_async()`] brackets an operation with the pair automatically. When a
/// [`leave()`] takes the counter from positive to zero, every registered notification
/// is submitted to its target queue exactly once and waiters unblock. Notifications
/// never fire on the initial zero state - only on the edge.
///
/// Handles are cheap clones sharing one group; the group may outlive its last submitted
/// operation.
///
/// [`dispatch_async()`]: Self::dispatch_async
/// [`enter()`]: Self::enter
/// [`leave()`]: Self::leave
#[derive(Clone)]
pub struct Group {
    inner: Arc<GroupState>,
}

struct GroupState {
    backend_type: BackendType,
    state: Mutex<GroupInner>,
    done: Condvar,
}

struct GroupInner {
    count: usize,
    notifiers: SmallVec<[(Operation, Queue); 2]>,
}

impl Group {
    /// Creates a group tagged with `backend_type`.
    ///
    /// The counting machinery is backend-independent; the tag only feeds the
    /// mismatch check, so host backends construct their groups through this too.
    #[must_use]
    pub fn new(backend_type: BackendType) -> Self {
        Self {
            inner: Arc::new(GroupState {
                backend_type,
                state: Mutex::new(GroupInner {
                    count: 0,
                    notifiers: SmallVec::new(),
                }),
                done: Condvar::new(),
            }),
        }
    }

    /// The backend family this group belongs to.
    #[must_use]
    pub fn backend_type(&self) -> BackendType { self.inner.backend_type }

    /// Manually increments the outstanding-work counter. Pair with [`Self::leave()`].
    pub fn enter(&self) {
        let mut state = self.inner.state.lock().unwrap();
        state.count += 1;
    }

    /// Manually decrements the outstanding-work counter. On the positive→zero edge,
    /// wakes waiters and submits every registered notification to its target queue
    /// (each at most once per edge).
    pub fn leave(&self) {
        let edge_notifiers = {
            let mut state = self.inner.state.lock().unwrap();
            debug_assert!(state.count > 0, "unbalanced leave() call");
            state.count = state.count.saturating_sub(1);
            if state.count == 0 {
                self.inner.done.notify_all();
                std::mem::take(&mut state.notifiers)
            } else {
                SmallVec::new()
            }
        };

        for (op, queue) in edge_notifiers {
            queue.dispatch_async_operation(op);
        }
    }

    /// Submits `work` to `queue` and tracks it in this group: the counter is
    /// incremented up front and decremented when the operation finishes - even when it
    /// panics.
    ///
    /// # Errors
    ///
    /// [`DispatchError::BackendMismatch`] when `queue` belongs to a different backend;
    /// the counter is left untouched in that case.
    pub fn dispatch_async(
        &self,
        work: impl FnOnce() + Send + 'static,
        queue: &Queue,
    ) -> Result<(), DispatchError> {
        self.check_backend(queue)?;
        self.enter();

        let leave_guard = LeaveOnDrop {
            group: self.clone(),
        };
        queue.dispatch_async(move || {
            let _leave = leave_guard;
            work();
        });
        Ok(())
    }

    /// Registers `work` to run on `queue` once the counter reaches zero. If the
    /// counter is already zero, submits immediately.
    ///
    /// # Errors
    ///
    /// [`DispatchError::BackendMismatch`] when `queue` belongs to a different backend.
    pub fn notify(
        &self,
        work: impl FnOnce() + Send + 'static,
        queue: &Queue,
    ) -> Result<(), DispatchError> {
        self.check_backend(queue)?;
        let op = Operation::new(work);

        let mut state = self.inner.state.lock().unwrap();
        if state.count == 0 {
            drop(state);
            queue.dispatch_async_operation(op);
        } else {
            state.notifiers.push((op, queue.clone()));
        }
        Ok(())
    }

    /// Blocks the calling thread until the counter reaches zero or `timeout` elapses.
    ///
    /// A counter already at zero returns [`WaitResult::Completed`] immediately, so
    /// `wait(Duration::ZERO)` doubles as a non-blocking poll.
    pub fn wait(&self, timeout: Duration) -> WaitResult {
        // `Duration::MAX` overflows `Instant` arithmetic; treat it as no deadline.
        let deadline = Instant::now().checked_add(timeout);

        let mut state = self.inner.state.lock().unwrap();
        while state.count > 0 {
            match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return WaitResult::TimedOut;
                    }
                    let (guard, _) = self
                        .inner
                        .done
                        .wait_timeout(state, deadline - now)
                        .unwrap();
                    state = guard;
                }
                None => state = self.inner.done.wait(state).unwrap(),
            }
        }
        WaitResult::Completed
    }

    /// Blocks the calling thread until the counter reaches zero, without a timeout.
    pub fn wait_forever(&self) {
        let mut state = self.inner.state.lock().unwrap();
        while state.count > 0 {
            state = self.inner.done.wait(state).unwrap();
        }
    }

    fn check_backend(&self, queue: &Queue) -> Result<(), DispatchError> {
        if self.inner.backend_type == queue.backend_type() {
            Ok(())
        } else {
            Err(DispatchError::BackendMismatch {
                expected: self.inner.backend_type,
                found: queue.backend_type(),
            })
        }
    }
}

impl fmt::Debug for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock().unwrap();
        f.debug_struct("Group")
            .field("backend_type", &self.inner.backend_type)
            .field("count", &state.count)
            .field("notifiers", &state.notifiers.len())
            .finish()
    }
}

/// Calls [`Group::leave()`] when dropped, so tracked operations balance their
/// [`Group::enter()`] on every exit path - normal return and unwinding alike.
struct LeaveOnDrop {
    group: Group,
}

impl Drop for LeaveOnDrop {
    fn drop(&mut self) { self.group.leave(); }
}

#[cfg(test)]
mod tests {
    use super::{Group, WaitResult};
    use crate::{backend::BackendType,
                operation::Operation,
                pool::NaivePool,
                priority::QueuePriority,
                queue::{Queue, QueueImpl, serial_queue::create_serial_queue}};
    use pretty_assertions::assert_eq;
    use std::sync::{Arc,
                    atomic::{AtomicUsize, Ordering}};
    use std::time::Duration;

    fn test_queue(pool: &NaivePool, label: &str) -> Queue {
        create_serial_queue(
            label,
            Arc::new(pool.clone()),
            QueuePriority::Default,
            BackendType::Naive,
        )
    }

    struct ForeignQueueImpl;

    impl QueueImpl for ForeignQueueImpl {
        fn dispatch_async_operation(&self, _op: Operation) {
            unreachable!("a mismatched queue must never receive work");
        }

        fn label(&self) -> &str { "foreign" }

        fn priority(&self) -> QueuePriority { QueuePriority::Default }

        fn backend_type(&self) -> BackendType { BackendType::Qt5 }
    }

    #[test]
    fn test_wait_on_fresh_group_completes_immediately() {
        let group = Group::new(BackendType::Naive);
        assert_eq!(group.wait(Duration::ZERO), WaitResult::Completed);
    }

    #[test]
    fn test_barrier_over_tracked_operations() {
        let pool = NaivePool::new();
        let queue = test_queue(&pool, "group-barrier");
        let group = Group::new(BackendType::Naive);
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..10 {
            let counter = counter.clone();
            group
                .dispatch_async(
                    move || {
                        std::thread::sleep(Duration::from_millis(2));
                        counter.fetch_add(1, Ordering::SeqCst);
                    },
                    &queue,
                )
                .unwrap();
        }

        assert_eq!(group.wait(Duration::from_secs(5)), WaitResult::Completed);
        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_wait_times_out_while_work_is_outstanding() {
        let group = Group::new(BackendType::Naive);
        group.enter();
        assert_eq!(
            group.wait(Duration::from_millis(20)),
            WaitResult::TimedOut
        );
        group.leave();
        assert_eq!(group.wait(Duration::ZERO), WaitResult::Completed);
    }

    #[test]
    fn test_notify_fires_exactly_once_after_last_completion() {
        let pool = NaivePool::new();
        let queue = test_queue(&pool, "group-notify");
        let group = Group::new(BackendType::Naive);
        let notified = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            group
                .dispatch_async(
                    || std::thread::sleep(Duration::from_millis(10)),
                    &queue,
                )
                .unwrap();
        }

        let notified_clone = notified.clone();
        group
            .notify(
                move || {
                    notified_clone.fetch_add(1, Ordering::SeqCst);
                },
                &queue,
            )
            .unwrap();

        assert_eq!(group.wait(Duration::from_secs(5)), WaitResult::Completed);
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while notified.load(Ordering::SeqCst) == 0 && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(notified.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_notify_on_idle_group_submits_immediately() {
        let pool = NaivePool::new();
        let queue = test_queue(&pool, "group-notify-idle");
        let group = Group::new(BackendType::Naive);
        let notified = Arc::new(AtomicUsize::new(0));

        let notified_clone = notified.clone();
        group
            .notify(
                move || {
                    notified_clone.fetch_add(1, Ordering::SeqCst);
                },
                &queue,
            )
            .unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while notified.load(Ordering::SeqCst) == 0 && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(notified.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_operation_still_leaves_the_group() {
        let pool = NaivePool::new();
        let queue = test_queue(&pool, "group-panic");
        let group = Group::new(BackendType::Naive);

        group
            .dispatch_async(|| panic!("deliberate panic for testing"), &queue)
            .unwrap();

        assert_eq!(group.wait(Duration::from_secs(5)), WaitResult::Completed);
    }

    #[test]
    fn test_backend_mismatch_rejected_and_count_untouched() {
        let group = Group::new(BackendType::Naive);
        let foreign = Queue::new(Arc::new(ForeignQueueImpl));

        let result = group.dispatch_async(|| {}, &foreign);
        assert!(matches!(
            result,
            Err(crate::error::DispatchError::BackendMismatch { .. })
        ));
        assert_eq!(group.wait(Duration::ZERO), WaitResult::Completed);

        let result = group.notify(|| {}, &foreign);
        assert!(matches!(
            result,
            Err(crate::error::DispatchError::BackendMismatch { .. })
        ));
    }
}
