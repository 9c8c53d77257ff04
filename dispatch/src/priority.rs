// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Priority classes used when scheduling work onto a pool. See [`QueuePriority`].

/// Scheduling hint for work submitted to a pool.
///
/// Priorities form a total order (derived [`Ord`] follows declaration order):
///
/// ```text
/// Background < Utility < Default < UserInitiated < UserInteractive
/// ```
///
/// Higher priorities are *preferred* when multiple items are runnable; this is a hint,
/// not a guarantee. Scheduling is work-conserving - a pool never idles while any item of
/// any priority is ready.
///
/// # Legacy Three-Class Names
///
/// Older call sites use a three-class scheme (`HIGH` / `DEFAULT` / `LOW`). Those names
/// are synonyms for specific extended values, kept as associated constants so the
/// mapping is explicit:
///
/// | Legacy                 | Extended value     |
/// | :--------------------- | :----------------- |
/// | [`QueuePriority::HIGH`] | [`UserInitiated`] |
/// | `DEFAULT`              | [`Default`]        |
/// | [`QueuePriority::LOW`]  | [`Utility`]       |
///
/// [`UserInitiated`]: Self::UserInitiated
/// [`Default`]: Self::Default
/// [`Utility`]: Self::Utility
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
         strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum QueuePriority {
    /// Maintenance or cleanup work the user is not waiting on.
    Background,
    /// Utility tasks running in the background.
    Utility,
    /// Regular operation execution.
    #[default]
    Default,
    /// Work the user asked for and is actively waiting on.
    UserInitiated,
    /// Work affecting the user interface, to be completed quickly.
    UserInteractive,
}

impl QueuePriority {
    /// Legacy name for [`Self::UserInitiated`].
    pub const HIGH: Self = Self::UserInitiated;

    /// Legacy name for [`Self::Utility`].
    pub const LOW: Self = Self::Utility;

    /// All priority classes, lowest first. Index of each entry equals
    /// [`Self::index()`] of that variant.
    pub(crate) const ALL: [Self; 5] = [
        Self::Background,
        Self::Utility,
        Self::Default,
        Self::UserInitiated,
        Self::UserInteractive,
    ];

    /// Index into per-priority tables (ready queues, global queues).
    pub(crate) const fn index(self) -> usize { self as usize }
}
