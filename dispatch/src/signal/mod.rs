// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Multi-subscriber signals with queued, per-subscriber delivery.
//!
//! - **`signal_core`**: [`Signal`], its per-subscriber job control blocks, and
//!   [`NotificationMode`].
//! - **`connection`**: [`Connection`] (weak handle used to disconnect) and
//!   [`ScopedConnection`] (disconnects on drop).
//! - **`connection_manager`**: [`ConnectionManager`], owning a batch of scoped
//!   connections.
//!
//! # Delivery Model
//!
//! Firing a signal never runs handlers inline. Each subscriber ("job") gets a delivery
//! task submitted to *its* queue through the signal's internal group:
//!
//! ```text
//! emit(args) ──┬── job 1: schedule? ──► group ──► queue A ──► handler(args)
//!              ├── job 2: schedule? ──► group ──► queue B ──► handler(args)
//!              └── job 3: coalesce (batch mode, delivery already in flight)
//! ```
//!
//! Per job, at most one delivery is executing at any time, and under
//! [`NotificationMode::BatchUpdates`] at most one *additional* delivery is ever
//! scheduled while one is in flight - rapid-fire bursts collapse into a single
//! follow-up. [`NotificationMode::SingleUpdates`] opts out of coalescing: every fire
//! schedules a delivery.
//!
//! The handler receives the arguments snapshotted by the fire that *scheduled* its
//! delivery. Under coalescing this means intermediate fires' arguments are dropped -
//! intentional, and worth knowing when arguments carry state.

pub mod connection;
pub mod connection_manager;
pub mod signal_core;

pub use connection::*;
pub use connection_manager::*;
pub use signal_core::*;
