// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Worker pools: the execution substrate every queue ultimately drains into.
//!
//! - **`worker_pool`**: the [`WorkerPool`] capability trait (execute + blocked-thread
//!   accounting).
//! - **`naive_pool`**: the in-crate OS-thread implementation ([`NaivePool`]) and the
//!   process-wide default pool.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        NaivePool                                 │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  PoolState                                                       │
//! │  ├── Mutex<PoolInner>                                            │
//! │  │   ├── ready: [VecDeque<Operation>; 5]   (one FIFO / priority) │
//! │  │   ├── thread_count / idle_count                               │
//! │  │   └── max_threads  (soft cap, grows while helpers block)      │
//! │  └── Condvar           (work arrival + idle retirement timer)    │
//! │                                                                  │
//! │  worker threads: pop highest-priority non-empty FIFO, run the    │
//! │  operation behind a panic barrier, park on the condvar when idle │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

pub mod naive_pool;
pub mod worker_pool;

pub use naive_pool::*;
pub use worker_pool::*;
