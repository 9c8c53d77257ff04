// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The in-crate OS-thread backend. See [`NaiveBackend`].

use super::{backend_type::BackendType, capability::Backend};
use crate::{error::DispatchError,
            group::Group,
            pool::default_pool,
            priority::QueuePriority,
            queue::{Queue, exec_forever, main_queue, serial_queue::create_serial_queue},
            timer::Timer};
use std::{sync::Arc, time::Duration};

/// The default implementation family: queues drain into the process-wide
/// [`NaivePool`], the main queue runs on an internal dedicated thread, timers are
/// pool-driven. No host environment required.
///
/// [`NaivePool`]: crate::NaivePool
#[derive(Debug, Clone, Copy, Default)]
pub struct NaiveBackend;

impl Backend for NaiveBackend {
    fn backend_type(&self) -> BackendType { BackendType::Naive }

    fn create_serial_queue(&self, label: &str, priority: QueuePriority) -> Queue {
        create_serial_queue(
            label,
            Arc::new(default_pool().clone()),
            priority,
            BackendType::Naive,
        )
    }

    fn create_main_queue(&self) -> Result<Queue, DispatchError> { Ok(main_queue()) }

    fn create_timer(&self, interval: Duration, target: Queue) -> Timer {
        Timer::new(
            interval,
            target,
            Arc::new(default_pool().clone()),
            BackendType::Naive,
        )
    }

    fn create_group(&self) -> Group { Group::new(BackendType::Naive) }

    fn exec(&self) -> Result<i32, DispatchError> { exec_forever() }
}
