// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Free-function façade over the default (naive) backend.
//!
//! Most applications never touch the [`Backend`] trait - they create queues, timers
//! and groups through these functions and let the default backend do the rest. The
//! main-queue entry points live with the queue machinery and are re-exported at the
//! crate root: [`main_queue()`], [`global_queue()`], [`current_queue()`].
//!
//! [`Backend`]: super::Backend
//! [`current_queue()`]: crate::current_queue
//! [`global_queue()`]: crate::global_queue
//! [`main_queue()`]: crate::main_queue

use super::backend_type::BackendType;
use crate::{group::Group,
            pool::default_pool,
            priority::QueuePriority,
            queue::{Queue, exec_forever, global_queue, serial_queue::create_serial_queue},
            timer::Timer};
use std::{sync::Arc, time::Duration};

/// A new serial queue with [`QueuePriority::Default`], powered by the default backend.
#[must_use]
pub fn create_queue(label: impl Into<String>) -> Queue {
    create_queue_with_priority(label, QueuePriority::Default)
}

/// A new serial queue submitting its work at `priority`.
#[must_use]
pub fn create_queue_with_priority(
    label: impl Into<String>,
    priority: QueuePriority,
) -> Queue {
    create_serial_queue(
        label,
        Arc::new(default_pool().clone()),
        priority,
        BackendType::Naive,
    )
}

/// A new stopped timer firing every `interval` onto the default global queue. Call
/// [`Timer::start()`] to run it.
#[must_use]
pub fn create_timer(interval: Duration) -> Timer {
    create_timer_on(interval, global_queue(QueuePriority::Default))
}

/// A new stopped timer firing every `interval` onto `target`.
#[must_use]
pub fn create_timer_on(interval: Duration, target: Queue) -> Timer {
    Timer::new(
        interval,
        target,
        Arc::new(default_pool().clone()),
        BackendType::Naive,
    )
}

/// A new group powered by the default backend.
#[must_use]
pub fn create_group() -> Group { Group::new(BackendType::Naive) }

/// Executes operations submitted to the main queue; never returns.
pub fn exec() -> ! { exec_forever() }
