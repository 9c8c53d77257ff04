// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Backend selection: tags, the capability trait, and the default-backend façade.
//!
//! - **`backend_type`**: [`BackendType`] tags naming implementation families.
//! - **`capability`**: the [`Backend`] trait every family implements.
//! - **`naive_backend`**: [`NaiveBackend`], the in-crate OS-thread family.
//! - **`api`**: free functions ([`create_queue()`], [`create_timer()`], ...) bound to
//!   the default backend, mirroring how most applications consume the crate.
//!
//! [`create_queue()`]: api::create_queue
//! [`create_timer()`]: api::create_timer

pub mod api;
pub mod backend_type;
pub mod capability;
pub mod naive_backend;

pub use api::*;
pub use backend_type::*;
pub use capability::*;
pub use naive_backend::*;
