// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! One-shot units of work and the current-queue back-reference. See [`Operation`] and
//! [`current_queue()`].
//!
//! [`current_queue()`]: current_queue

use crate::{error::DispatchError, queue::Queue};
use std::{cell::RefCell,
          fmt,
          panic::{AssertUnwindSafe, catch_unwind}};

thread_local! {
    /// The queue on which the operation currently executing on this thread was
    /// dispatched. Installed by [`CurrentQueueGuard`] immediately before invocation,
    /// restored after.
    static CURRENT_QUEUE: RefCell<Option<Queue>> = const { RefCell::new(None) };
}

/// A one-shot callable handed to the runtime.
///
/// The runtime keeps the operation alive until its single invocation completes, then
/// releases it. Invocation consumes the operation, so "exactly once" is enforced by the
/// type system rather than by a runtime flag.
pub struct Operation {
    work: Box<dyn FnOnce() + Send + 'static>,
}

impl Operation {
    /// Wraps a closure into an operation.
    #[must_use]
    pub fn new(work: impl FnOnce() + Send + 'static) -> Self {
        Self {
            work: Box::new(work),
        }
    }

    /// Invokes the operation, consuming it. Panics propagate to the caller; the
    /// in-crate executors apply a catching panic barrier at their boundary instead.
    pub fn invoke(self) { (self.work)(); }

    /// Invokes the operation with the worker-boundary panic contract applied: a panic
    /// is caught, reported through the trace sink, and swallowed. Workers stay alive no
    /// matter what user code does.
    pub(crate) fn invoke_caught(self) {
        if let Err(panic_payload) = catch_unwind(AssertUnwindSafe(move || self.invoke())) {
            let message: &str = if let Some(text) = panic_payload.downcast_ref::<&str>() {
                text
            } else if let Some(text) = panic_payload.downcast_ref::<String>() {
                text.as_str()
            } else {
                "<non-string panic payload>"
            };
            tracing::error!(panic = %message, "operation panicked during execution");
        }
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation").finish_non_exhaustive()
    }
}

/// The queue the currently-executing operation was dispatched on.
///
/// # Errors
///
/// Returns [`DispatchError::NoCurrentQueue`] when the calling thread is not inside a
/// dispatched operation.
pub fn current_queue() -> Result<Queue, DispatchError> {
    CURRENT_QUEUE
        .with_borrow(Clone::clone)
        .ok_or(DispatchError::NoCurrentQueue)
}

/// RAII guard installing the current-queue back-reference around one invocation.
///
/// Saves the previous value and restores it on drop, so a serial drain running inside a
/// pool worker (or any other nested dispatch) sees the innermost queue while it runs and
/// the outer one afterwards. Restoration happens during unwinding too, so a panicking
/// handler cannot leak a stale back-reference.
pub(crate) struct CurrentQueueGuard {
    previous: Option<Queue>,
}

impl CurrentQueueGuard {
    pub(crate) fn install(queue: Queue) -> Self {
        let previous = CURRENT_QUEUE.replace(Some(queue));
        Self { previous }
    }
}

impl Drop for CurrentQueueGuard {
    fn drop(&mut self) { CURRENT_QUEUE.set(self.previous.take()); }
}
