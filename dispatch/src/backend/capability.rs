// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The [`Backend`] capability trait.

use super::backend_type::BackendType;
use crate::{error::DispatchError, group::Group, priority::QueuePriority, queue::Queue,
            timer::Timer};
use std::time::Duration;

/// Everything an implementation family must be able to do.
///
/// The in-crate [`NaiveBackend`] is one implementor; host-event-loop adapters (Qt,
/// libdispatch) are others, living out of crate. Primitives created by different
/// backends refuse to cooperate - the [`BackendType`] tag carried by each primitive is
/// compared wherever two of them meet.
///
/// Adapters reuse the in-crate machinery at the seams designed for it: a serial queue
/// over a custom [`WorkerPool`] proxy (that's how a host main loop becomes a main
/// queue), [`Timer`]s driven by a custom pool, [`Group::new()`] with the adapter's tag.
///
/// [`NaiveBackend`]: super::NaiveBackend
/// [`WorkerPool`]: crate::WorkerPool
pub trait Backend {
    /// The tag stamped onto every primitive this backend creates.
    fn backend_type(&self) -> BackendType;

    /// A new serial queue draining into this backend's execution substrate.
    fn create_serial_queue(&self, label: &str, priority: QueuePriority) -> Queue;

    /// The queue bound to the host's distinguished main thread.
    ///
    /// # Errors
    ///
    /// [`DispatchError::UninitializedHost`] when the host event loop this backend
    /// wraps has not been constructed yet.
    fn create_main_queue(&self) -> Result<Queue, DispatchError>;

    /// A new stopped timer firing onto `target`.
    fn create_timer(&self, interval: Duration, target: Queue) -> Timer;

    /// A new group tagged for this backend.
    fn create_group(&self) -> Group;

    /// Runs the main loop, executing operations submitted to the main queue.
    ///
    /// Returns the host loop's exit code - except for backends whose main loop never
    /// exits (the naive backend), which never return.
    ///
    /// # Errors
    ///
    /// [`DispatchError::UninitializedHost`] when the host event loop has not been
    /// constructed yet.
    fn exec(&self) -> Result<i32, DispatchError>;
}
