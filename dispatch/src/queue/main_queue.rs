// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The main queue: a serial queue bound to one distinguished thread, plus the
//! machinery behind [`exec()`].
//!
//! [`exec()`]: crate::exec

use super::{queue_handle::Queue, serial_queue::create_serial_queue};
use crate::{backend::BackendType, operation::Operation, pool::WorkerPool,
            priority::QueuePriority};
use std::{collections::VecDeque,
          sync::{Arc, Condvar, Mutex, OnceLock},
          thread,
          thread::JoinHandle};

/// A [`WorkerPool`] whose entire worker set is one lazily-spawned, distinguished
/// thread.
///
/// The main queue is a plain serial queue draining into this executor, which is what
/// keeps the serial-queue contract (FIFO, never two at once) intact: the drain task
/// runs on the single thread like any other operation. Host-integrated backends
/// replace this type with a proxy that posts into the host's main loop - the host loop
/// processes events serially, so the same contract holds there.
pub(crate) struct MainThreadExecutor {
    state: Mutex<MainThreadState>,
    signal: Condvar,
}

struct MainThreadState {
    fifo: VecDeque<Operation>,
    started: bool,
    /// Taken (at most once) by [`exec_forever()`] to block the calling thread on the
    /// main thread, which never exits.
    join_handle: Option<JoinHandle<()>>,
}

impl MainThreadExecutor {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(MainThreadState {
                fifo: VecDeque::new(),
                started: false,
                join_handle: None,
            }),
            signal: Condvar::new(),
        })
    }

    /// Spawns the distinguished thread on first use. Must be called with the state
    /// lock held (the `state` borrow proves it).
    fn ensure_thread(self: &Arc<Self>, state: &mut MainThreadState) {
        if state.started {
            return;
        }
        state.started = true;

        let executor = Arc::clone(self);
        let spawn_result = thread::Builder::new()
            .name("dispatch-main".into())
            .spawn(move || executor.run_loop());
        match spawn_result {
            Ok(handle) => state.join_handle = Some(handle),
            Err(error) => {
                state.started = false;
                tracing::error!(%error, "failed to spawn the dispatch main thread");
            }
        }
    }

    /// The distinguished thread's body: pop one operation at a time, forever.
    fn run_loop(self: Arc<Self>) {
        tracing::debug!("dispatch main thread started");
        loop {
            let op = {
                let mut state = self.state.lock().unwrap();
                loop {
                    match state.fifo.pop_front() {
                        Some(op) => break op,
                        None => state = self.signal.wait(state).unwrap(),
                    }
                }
            };
            op.invoke_caught();
        }
    }

    /// Blocks the calling thread for the rest of the program, after making sure the
    /// main thread exists.
    pub(crate) fn exec_forever(self: &Arc<Self>) -> ! {
        let join_handle = {
            let mut state = self.state.lock().unwrap();
            self.ensure_thread(&mut state);
            state.join_handle.take()
        };

        // The main thread never exits, so joining it blocks forever. A second caller
        // (or a failed spawn) finds no handle and parks instead.
        if let Some(join_handle) = join_handle {
            drop(join_handle.join());
        }
        loop {
            thread::park();
        }
    }
}

impl WorkerPool for MainThreadExecutor {
    fn execute(&self, op: Operation, _priority: QueuePriority) {
        let mut state = self.state.lock().unwrap();
        state.fifo.push_back(op);
        drop(state);
        self.signal.notify_one();
    }

    fn notify_thread_blocked(&self) {
        // The distinguished thread cannot be compensated for; blocking it blocks the
        // main queue by definition.
    }

    fn notify_thread_unblocked(&self) {}
}

struct MainQueueSingleton {
    executor: Arc<MainThreadExecutor>,
    queue: Queue,
}

fn main_queue_singleton() -> &'static MainQueueSingleton {
    static MAIN_QUEUE: OnceLock<MainQueueSingleton> = OnceLock::new();
    MAIN_QUEUE.get_or_init(|| {
        let executor = MainThreadExecutor::new();
        {
            let mut state = executor.state.lock().unwrap();
            executor.ensure_thread(&mut state);
        }
        let queue = create_serial_queue(
            "r3bl.dispatch.main",
            executor.clone(),
            QueuePriority::Default,
            BackendType::Naive,
        );
        MainQueueSingleton { executor, queue }
    })
}

/// The main queue: the serial queue running on the process's distinguished dispatch
/// thread. There is exactly one; repeated calls return handles to it.
#[must_use]
pub fn main_queue() -> Queue { main_queue_singleton().queue.clone() }

/// Executes operations submitted to the main queue; never returns. Public surface:
/// [`exec()`].
///
/// For the naive backend the distinguished thread is internal, so this simply blocks
/// the calling thread forever while that thread drains the main queue. Host-integrated
/// backends instead delegate to the host's run function.
///
/// [`exec()`]: crate::exec
pub(crate) fn exec_forever() -> ! { main_queue_singleton().executor.exec_forever() }
