// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Backend family tags. See [`BackendType`].

/// Names the implementation family a primitive belongs to.
///
/// Queues, groups, timers and signals carry the tag of the backend that created them.
/// Two primitives may cooperate (a group tracking work on a queue, a signal delivering
/// to a queue) only when their tags are equal; mixing is rejected with
/// [`DispatchError::BackendMismatch`].
///
/// Only [`Naive`] ships in this crate. The other tags name host-event-loop adapter
/// families that implement the same capability traits out of crate; they exist here so
/// the tag check has a vocabulary to speak.
///
/// [`DispatchError::BackendMismatch`]: crate::DispatchError::BackendMismatch
/// [`Naive`]: Self::Naive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum BackendType {
    /// The in-crate OS-thread backend: [`NaivePool`] workers, a dedicated main-queue
    /// thread, timers driven by pool tasks.
    ///
    /// [`NaivePool`]: crate::NaivePool
    #[default]
    Naive,
    /// Adapter family delegating to a native libdispatch main loop.
    Libdispatch,
    /// Adapter family posting into a Qt application's main loop.
    Qt5,
}
