// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Concurrent queues: thin forwarding adapters over a pool, and the five process-wide
//! global queues.

use super::queue_handle::{Queue, QueueImpl};
use crate::{backend::BackendType, operation::Operation,
            pool::{WorkerPool, default_pool},
            priority::QueuePriority};
use std::sync::{Arc, OnceLock};

/// Forwards every operation straight to its pool with the queue's priority tag. No
/// ordering between operations; overlap is whatever the pool's worker count allows.
pub(crate) struct ConcurrentQueueImpl {
    label: String,
    priority: QueuePriority,
    backend_type: BackendType,
    pool: Arc<dyn WorkerPool>,
}

impl ConcurrentQueueImpl {
    pub(crate) fn new(
        label: String,
        pool: Arc<dyn WorkerPool>,
        priority: QueuePriority,
        backend_type: BackendType,
    ) -> Arc<Self> {
        Arc::new(Self {
            label,
            priority,
            backend_type,
            pool,
        })
    }
}

impl QueueImpl for ConcurrentQueueImpl {
    fn dispatch_async_operation(&self, op: Operation) {
        self.pool.execute(op, self.priority);
    }

    fn label(&self) -> &str { &self.label }

    fn priority(&self) -> QueuePriority { self.priority }

    fn backend_type(&self) -> BackendType { self.backend_type }
}

/// The global concurrent queue for `priority`.
///
/// One queue exists per priority class for the lifetime of the process, all draining
/// into the default pool. Repeated calls with the same priority return handles to the
/// same queue.
#[must_use]
pub fn global_queue(priority: QueuePriority) -> Queue {
    static GLOBAL_QUEUES: OnceLock<[Queue; QueuePriority::ALL.len()]> = OnceLock::new();
    let queues = GLOBAL_QUEUES.get_or_init(|| {
        QueuePriority::ALL.map(|priority| {
            Queue::new(ConcurrentQueueImpl::new(
                format!("r3bl.dispatch.global.{priority}"),
                Arc::new(default_pool().clone()),
                priority,
                BackendType::Naive,
            ))
        })
    });
    queues[priority.index()].clone()
}
