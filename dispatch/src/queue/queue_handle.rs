// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The [`Queue`] handle and the [`QueueImpl`] trait behind it.

use crate::{backend::BackendType,
            operation::{CurrentQueueGuard, Operation},
            pool::{WorkerPool, default_pool},
            priority::QueuePriority};
use std::{fmt, sync::Arc, thread, time::Duration};

/// Contract every queue implementation satisfies.
///
/// Implementations decide *where and when* an accepted operation runs; the [`Queue`]
/// handle layers the cross-cutting pieces on top (current-queue back-reference,
/// delayed dispatch). Out-of-crate backends implement this trait and hand the result to
/// [`Queue::new()`].
pub trait QueueImpl: Send + Sync {
    /// Accepts ownership of `op` for later execution. Never blocks; may acquire
    /// short-lived internal locks only.
    fn dispatch_async_operation(&self, op: Operation);

    /// Human-readable label, used in traces.
    fn label(&self) -> &str;

    /// The priority this queue submits work at.
    fn priority(&self) -> QueuePriority;

    /// The backend family this queue belongs to.
    fn backend_type(&self) -> BackendType;
}

/// Reference-counted handle to a queue.
///
/// Clones are cheap and share the underlying queue. A queue stays alive while *any*
/// holder exists - including operations still waiting in it and drain tasks already
/// submitted to a pool - so enqueueing onto a destroyed queue cannot happen through
/// this handle.
///
/// Invariants by flavor:
///
/// | Flavor     | Ordering                              | Overlap               |
/// | :--------- | :------------------------------------ | :-------------------- |
/// | serial     | submission order (FIFO)               | never two at once     |
/// | concurrent | none                                  | unrestricted          |
/// | main       | submission order (FIFO)               | never two at once, on one distinguished thread |
#[derive(Clone)]
pub struct Queue {
    inner: Arc<dyn QueueImpl>,
}

impl Queue {
    /// Wraps a queue implementation in a handle. This is the seam out-of-crate
    /// backends use.
    #[must_use]
    pub fn new(inner: Arc<dyn QueueImpl>) -> Self { Self { inner } }

    /// Submits `work` for asynchronous execution on this queue. Never blocks.
    ///
    /// Inside `work`, [`current_queue()`] resolves to this queue.
    ///
    /// [`current_queue()`]: crate::current_queue
    pub fn dispatch_async(&self, work: impl FnOnce() + Send + 'static) {
        self.dispatch_async_operation(Operation::new(work));
    }

    /// [`Self::dispatch_async()`] for an already-boxed [`Operation`].
    pub fn dispatch_async_operation(&self, op: Operation) {
        let bound = self.bind_current_queue(op);
        self.inner.dispatch_async_operation(bound);
    }

    /// Submits `work` to run on this queue no earlier than `delay` from now.
    ///
    /// The wait happens on the default pool (bracketed by the blocked-thread
    /// announcement so it cannot starve it); the final dispatch goes through this
    /// queue's own backend, so ordering and backend semantics are those of
    /// [`Self::dispatch_async()`] at expiry time.
    pub fn dispatch_after(&self, delay: Duration, work: impl FnOnce() + Send + 'static) {
        let queue = self.clone();
        let pool = default_pool();
        pool.execute(
            Operation::new(move || {
                let pool = default_pool();
                pool.notify_thread_blocked();
                thread::sleep(delay);
                pool.notify_thread_unblocked();
                queue.dispatch_async(work);
            }),
            self.priority(),
        );
    }

    /// Human-readable label, used in traces.
    #[must_use]
    pub fn label(&self) -> &str { self.inner.label() }

    /// The priority this queue submits work at.
    #[must_use]
    pub fn priority(&self) -> QueuePriority { self.inner.priority() }

    /// The backend family this queue belongs to.
    #[must_use]
    pub fn backend_type(&self) -> BackendType { self.inner.backend_type() }

    /// Wraps `op` so the current-queue back-reference points at this queue for exactly
    /// the duration of the invocation.
    fn bind_current_queue(&self, op: Operation) -> Operation {
        let queue = self.clone();
        Operation::new(move || {
            let _current = CurrentQueueGuard::install(queue);
            op.invoke();
        })
    }
}

impl fmt::Debug for Queue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue")
            .field("label", &self.label())
            .field("priority", &self.priority())
            .field("backend_type", &self.backend_type())
            .finish()
    }
}
