// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The in-crate OS-thread worker pool. See [`NaivePool`].

use super::worker_pool::WorkerPool;
use crate::{operation::Operation, priority::QueuePriority};
use std::{collections::VecDeque,
          num::NonZeroUsize,
          sync::{Arc, Condvar, Mutex, OnceLock},
          thread,
          time::Duration};

/// How long an idle worker waits before checking whether it is over the soft cap and
/// should retire. Workers at or under the cap simply go back to waiting.
const IDLE_GRACE_PERIOD: Duration = Duration::from_millis(500);

/// Priority-aware worker pool backed by OS threads.
///
/// - Per-priority FIFO ready queues behind a single [`Mutex`], one [`Condvar`].
/// - Worker count starts at [`std::thread::available_parallelism()`].
/// - Scheduling is work-conserving: a waking worker pops the head of the
///   *highest-priority non-empty* FIFO, so no worker idles while any item is ready.
/// - [`notify_thread_blocked()`] raises a soft cap and spawns a worker when none is
///   idle, so operations that block on the pool's own progress (timer drivers, delayed
///   dispatch) cannot starve it. [`notify_thread_unblocked()`] lowers the cap again;
///   workers over the cap retire after a full idle grace period.
/// - Operations that panic are caught at the worker boundary, reported through the
///   trace sink, and swallowed.
///
/// Handles are cheap clones sharing one pool. The pool shuts down (workers retire,
/// pending operations are dropped) when the last handle is dropped - except for the
/// process-wide default pool, which lives in a `static` and is intentionally never torn
/// down.
///
/// [`notify_thread_blocked()`]: WorkerPool::notify_thread_blocked
/// [`notify_thread_unblocked()`]: WorkerPool::notify_thread_unblocked
#[derive(Clone)]
pub struct NaivePool {
    state: Arc<PoolState>,
    /// Shared by every handle clone; the last drop signals shutdown to the workers.
    /// Worker threads hold [`PoolState`] only, so they never keep the pool alive.
    _shutdown: Arc<ShutdownOnDrop>,
}

struct PoolState {
    thread_label: &'static str,
    signal: Condvar,
    inner: Mutex<PoolInner>,
}

struct PoolInner {
    /// One FIFO per [`QueuePriority`], indexed by [`QueuePriority::index()`].
    ready: [VecDeque<Operation>; QueuePriority::ALL.len()],
    /// Workers currently alive (running or idle).
    thread_count: usize,
    /// Workers currently parked on the condvar.
    idle_count: usize,
    /// Soft cap: base thread count plus one per outstanding blocked-thread
    /// announcement.
    max_threads: usize,
    next_worker_id: usize,
    shutdown: bool,
}

impl NaivePool {
    /// Creates a pool sized to the machine's available parallelism.
    #[must_use]
    pub fn new() -> Self {
        let base_threads = thread::available_parallelism().map_or(1, NonZeroUsize::get);
        Self::with_base_threads(base_threads)
    }

    /// Creates a pool with an explicit base worker count. Useful in tests that need a
    /// deterministic worker count (e.g. exactly one).
    #[must_use]
    pub fn with_base_threads(base_threads: usize) -> Self {
        let base_threads = base_threads.max(1);
        let state = Arc::new(PoolState {
            thread_label: "dispatch-worker",
            signal: Condvar::new(),
            inner: Mutex::new(PoolInner {
                ready: std::array::from_fn(|_| VecDeque::new()),
                thread_count: 0,
                idle_count: 0,
                max_threads: base_threads,
                next_worker_id: 0,
                shutdown: false,
            }),
        });

        {
            let mut inner = state.inner.lock().unwrap();
            for _ in 0..base_threads {
                state.spawn_worker(&mut inner);
            }
        }

        Self {
            _shutdown: Arc::new(ShutdownOnDrop {
                state: Arc::clone(&state),
            }),
            state,
        }
    }
}

impl Default for NaivePool {
    fn default() -> Self { Self::new() }
}

impl std::fmt::Debug for NaivePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.state.inner.lock().unwrap();
        f.debug_struct("NaivePool")
            .field("thread_count", &inner.thread_count)
            .field("idle_count", &inner.idle_count)
            .field("max_threads", &inner.max_threads)
            .finish_non_exhaustive()
    }
}

impl WorkerPool for NaivePool {
    fn execute(&self, op: Operation, priority: QueuePriority) {
        let mut inner = self.state.inner.lock().unwrap();
        inner.ready[priority.index()].push_back(op);
        // A raised cap (helpers currently blocked) may leave the pool short of workers
        // even though nothing is idle.
        if inner.idle_count == 0 && inner.thread_count < inner.max_threads {
            self.state.spawn_worker(&mut inner);
        }
        drop(inner);
        self.state.signal.notify_one();
    }

    fn notify_thread_blocked(&self) {
        let mut inner = self.state.inner.lock().unwrap();
        inner.max_threads += 1;
        if inner.idle_count == 0 {
            self.state.spawn_worker(&mut inner);
        }
    }

    fn notify_thread_unblocked(&self) {
        let mut inner = self.state.inner.lock().unwrap();
        debug_assert!(
            inner.max_threads > 0,
            "unbalanced notify_thread_unblocked() call"
        );
        inner.max_threads = inner.max_threads.saturating_sub(1);
    }
}

impl PoolState {
    /// Registers and spawns one worker. Must be called with the pool lock held (the
    /// `inner` borrow proves it).
    fn spawn_worker(self: &Arc<Self>, inner: &mut PoolInner) {
        let worker_id = inner.next_worker_id;
        inner.next_worker_id += 1;
        inner.thread_count += 1;

        let state = Arc::clone(self);
        let spawn_result = thread::Builder::new()
            .name(format!("{}-{worker_id}", self.thread_label))
            .spawn(move || state.worker_loop());

        if let Err(error) = spawn_result {
            inner.thread_count -= 1;
            tracing::error!(%error, "failed to spawn dispatch worker thread");
        }
    }

    fn worker_loop(self: Arc<Self>) {
        tracing::debug!("dispatch worker started");
        while let Some(op) = self.next_operation() {
            op.invoke_caught();
        }
        tracing::debug!("dispatch worker retired");
    }

    /// Blocks until an operation is ready, this worker should retire, or the pool shuts
    /// down. Returns [`None`] in the latter two cases; the worker's bookkeeping has
    /// already been removed when it does.
    fn next_operation(&self) -> Option<Operation> {
        let mut inner = self.inner.lock().unwrap();
        loop {
            if inner.shutdown {
                inner.thread_count -= 1;
                return None;
            }

            if let Some(op) = Self::pop_ready(&mut inner) {
                return Some(op);
            }

            inner.idle_count += 1;
            let (guard, wait_result) = self
                .signal
                .wait_timeout(inner, IDLE_GRACE_PERIOD)
                .unwrap();
            inner = guard;
            inner.idle_count -= 1;

            // Retire only after a full idle grace period, and only while over the cap.
            if wait_result.timed_out() && inner.thread_count > inner.max_threads {
                inner.thread_count -= 1;
                return None;
            }
        }
    }

    fn pop_ready(inner: &mut PoolInner) -> Option<Operation> {
        inner.ready.iter_mut().rev().find_map(VecDeque::pop_front)
    }
}

/// Flips the shutdown flag and wakes every worker when the last pool handle drops.
struct ShutdownOnDrop {
    state: Arc<PoolState>,
}

impl Drop for ShutdownOnDrop {
    fn drop(&mut self) {
        let mut inner = self.state.inner.lock().unwrap();
        inner.shutdown = true;
        for fifo in &mut inner.ready {
            fifo.clear();
        }
        drop(inner);
        self.state.signal.notify_all();
    }
}

/// The process-wide default pool.
///
/// Lazily initialized on first use and intentionally leaked (it lives in a `static`, so
/// its workers are never joined and its destructor never runs). Tests that need
/// isolation construct private [`NaivePool`]s instead of going through this.
pub(crate) fn default_pool() -> &'static NaivePool {
    static DEFAULT_POOL: OnceLock<NaivePool> = OnceLock::new();
    DEFAULT_POOL.get_or_init(NaivePool::new)
}
