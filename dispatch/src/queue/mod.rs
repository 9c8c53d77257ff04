// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Queues: ordered or concurrent streams of user work.
//!
//! - **`queue_handle`**: the reference-counted [`Queue`] handle and the [`QueueImpl`]
//!   trait it wraps.
//! - **`serial_queue`**: FIFO, non-overlapping execution on top of any
//!   [`WorkerPool`].
//! - **`concurrent_queue`**: thin forwarding adapter with a priority tag; the five
//!   process-wide global queues.
//! - **`main_queue`**: the serial queue bound to one distinguished thread, plus the
//!   machinery behind [`exec()`].
//!
//! # How The Pieces Stack
//!
//! ```text
//! Queue (handle, Clone)
//!   └── Arc<dyn QueueImpl>
//!        ├── SerialQueueImpl ──── drain task ────┐
//!        ├── ConcurrentQueueImpl ── forwards ────┤
//!        └── SerialQueueImpl (main) ── drain ──┐ │
//!                                              │ │
//!                          MainThreadExecutor ─┘ └─ NaivePool
//!                          (WorkerPool with         (WorkerPool with
//!                           exactly one thread)      many workers)
//! ```
//!
//! The serial queue machinery is pool-agnostic - the main queue *is* a serial queue
//! whose pool happens to own a single distinguished thread.
//!
//! [`WorkerPool`]: crate::WorkerPool
//! [`exec()`]: crate::exec

pub mod concurrent_queue;
pub mod main_queue;
pub mod queue_handle;
pub mod serial_queue;

pub use concurrent_queue::*;
pub use main_queue::*;
pub use queue_handle::*;
pub use serial_queue::*;
