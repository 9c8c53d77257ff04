// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// cspell:words libdispatch condvar coalescing

//! # r3bl_dispatch
//!
//! A task-dispatch runtime: express "run this work on that execution context" without
//! managing threads directly.
//!
//! - **Queues** - ordered ([serial], [main]) or concurrent ([global]) streams of user
//!   work.
//! - **[`Group`]** - counting barrier over a set of queued operations, with on-zero
//!   notifications and timed waits.
//! - **[`Timer`]** - periodic or delayed deferred work targeting any queue.
//! - **[`Signal`]** - multi-subscriber notifications whose delivery is queued per
//!   subscriber, with opt-in coalescing.
//!
//! Everything drains into a priority-aware [worker pool][`NaivePool`] that grows while
//! submitted work announces itself blocked, so work that blocks on the pool's own
//! progress (timers, delayed dispatch) cannot starve it.
//!
//! # Quick Start
//!
//! ```
//! use r3bl_dispatch::{WaitResult, create_group, create_queue};
//! use std::{sync::{Arc, Mutex}, time::Duration};
//!
//! let queue = create_queue("my-app.ingest");
//! let group = create_group();
//! let log = Arc::new(Mutex::new(Vec::new()));
//!
//! for index in 0..4 {
//!     let log = log.clone();
//!     group
//!         .dispatch_async(move || log.lock().unwrap().push(index), &queue)
//!         .unwrap();
//! }
//!
//! assert_eq!(group.wait(Duration::from_secs(5)), WaitResult::Completed);
//! // Serial queue: submission order, never two at once.
//! assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3]);
//! ```
//!
//! # Architecture Overview
//!
//! ```text
//! free functions: create_queue() / global_queue() / main_queue() / create_timer()
//!        │                          create_group() / exec()
//!        ▼
//! ┌───────────────────────────────────────────────────────────────────────┐
//! │ Queue (Clone handle) ──► Arc<dyn QueueImpl>                           │
//! │   ├── serial:     FIFO + busy flag ──► drain task ──┐                 │
//! │   ├── concurrent: forwards with priority tag ───────┤                 │
//! │   └── main:       serial over the main executor ──┐ │                 │
//! │                                                   │ │                 │
//! │ Timer ── driver task (blocked-announced) ─────────┼─┤                 │
//! │ Group ── enter/leave counter + notifiers ─────────┼─┤                 │
//! │ Signal ─ per-job deliveries via internal group ───┼─┤                 │
//! │                                                   ▼ ▼                 │
//! │                        MainThreadExecutor      NaivePool              │
//! │                        (one distinguished      (available_parallelism │
//! │                         thread, exec())         workers, soft cap)    │
//! └───────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Backends
//!
//! Every primitive carries a [`BackendType`] tag; primitives from different backends
//! refuse to cooperate (see [`DispatchError::BackendMismatch`]). The [naive] backend
//! ships in this crate. Host-event-loop families (Qt, libdispatch) implement the
//! [`Backend`] capability trait out of crate, reusing the serial-queue and timer
//! machinery over their own [`WorkerPool`] proxies.
//!
//! # Diagnostics
//!
//! The runtime emits through [`tracing`] (worker lifecycle at `debug`, swallowed
//! handler panics at `error`) and never installs a subscriber; [`init_tracing()`] is
//! available for binaries and tests that want the diagnostics on stderr, filtered by
//! the `R3BL_DISPATCH_LOG` environment variable.
//!
//! [serial]: create_queue
//! [main]: main_queue
//! [global]: global_queue
//! [naive]: NaiveBackend

// Connect to source files.
pub mod backend;
pub mod error;
pub mod group;
pub mod operation;
pub mod pool;
pub mod priority;
pub mod queue;
pub mod signal;
pub mod timer;
pub mod tracing_init;

// Re-export.
pub use backend::*;
pub use error::*;
pub use group::*;
pub use operation::*;
pub use pool::*;
pub use priority::*;
pub use queue::*;
pub use signal::*;
pub use timer::*;
pub use tracing_init::*;
