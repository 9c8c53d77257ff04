// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The [`WorkerPool`] capability trait.

use crate::{operation::Operation, priority::QueuePriority};

/// Execution substrate for queues, timers and groups.
///
/// A pool accepts prioritized one-shot operations and runs them on threads it owns.
/// Serial queues are built *on top of* a pool (the drain task is itself an operation),
/// which is what makes the main queue possible: it is a serial queue whose "pool" is a
/// single distinguished thread.
///
/// # The Blocked-Thread Contract
///
/// Some operations executed *by* the pool block on things only the pool itself can make
/// progress on - the canonical example is a timer driver that sleeps between ticks and
/// submits its handler back into the pool. Without compensation, enough such operations
/// would occupy every worker and deadlock the process.
///
/// [`notify_thread_blocked()`] is the escape hatch: a currently-executing operation
/// announces that it is about to block, and the pool guarantees at least one additional
/// worker remains available. [`notify_thread_unblocked()`] reverses the announcement.
/// Calls must be balanced.
///
/// [`notify_thread_blocked()`]: Self::notify_thread_blocked
/// [`notify_thread_unblocked()`]: Self::notify_thread_unblocked
pub trait WorkerPool: Send + Sync {
    /// Takes ownership of `op` and schedules it on some worker. Never blocks; may
    /// acquire short-lived internal locks only.
    fn execute(&self, op: Operation, priority: QueuePriority);

    /// A currently-executing operation announces it is about to block on something the
    /// pool would need a free worker to unblock.
    fn notify_thread_blocked(&self);

    /// Balances a prior [`Self::notify_thread_blocked()`] call.
    fn notify_thread_unblocked(&self);
}
