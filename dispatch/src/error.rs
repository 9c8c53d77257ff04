// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Error type for the dispatch runtime. See [`DispatchError`].

use crate::backend::BackendType;

/// Errors surfaced synchronously by the dispatch API.
///
/// Argument misuse fails at the call site; nothing in this enum travels across the pool
/// boundary. Two failure classes are deliberately *not* here:
///
/// - Handler panics are caught at the worker boundary, reported via [`tracing::error!`],
///   and swallowed - a panicking operation must never take a worker thread down.
/// - `Group::wait` reports timeout through its [`WaitResult`] return value.
///
/// [`WaitResult`]: crate::WaitResult
/// [`tracing::error!`]: tracing::error
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum DispatchError {
    /// Two primitives from different backends were combined, e.g. a group created by
    /// the naive backend asked to track work on a Qt queue.
    #[error("cannot mix backends: this primitive uses `{expected}`, the queue uses `{found}`")]
    #[diagnostic(
        code(r3bl_dispatch::backend_mismatch),
        help(
            "Groups, timers and signals can only cooperate with queues created by \
             the same backend. Create both primitives from the same backend, or \
             route the work through a queue of the matching backend."
        )
    )]
    BackendMismatch {
        /// Backend of the primitive the call was made on.
        expected: BackendType,
        /// Backend of the foreign queue passed in.
        found: BackendType,
    },

    /// [`current_queue()`] was called from a thread that is not currently executing a
    /// dispatched operation.
    ///
    /// [`current_queue()`]: crate::current_queue
    #[error("current_queue() called outside of a dispatched operation")]
    #[diagnostic(
        code(r3bl_dispatch::no_current_queue),
        help(
            "The current queue is only known while an operation submitted through a \
             queue is executing. Capture the queue handle in your closure instead."
        )
    )]
    NoCurrentQueue,

    /// The host event loop required by a host-integrated backend does not exist yet.
    ///
    /// The naive backend never returns this; it is part of the adapter contract for
    /// backends that post into a host main loop (Qt, libdispatch, ...).
    #[error("the host event loop is not initialized")]
    #[diagnostic(
        code(r3bl_dispatch::uninitialized_host),
        help(
            "Construct the host application / event loop before asking its backend \
             for a main queue or invoking exec()."
        )
    )]
    UninitializedHost,

    /// [`std::thread::Builder::spawn()`] failed.
    #[error("failed to spawn a dispatch thread")]
    #[diagnostic(
        code(r3bl_dispatch::thread_spawn),
        help(
            "The system may have reached its thread limit - check `ulimit -u` for the \
             per-user limit."
        )
    )]
    ThreadSpawn(#[source] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::DispatchError;
    use crate::backend::BackendType;

    #[test]
    fn test_backend_mismatch_names_both_backends() {
        let error = DispatchError::BackendMismatch {
            expected: BackendType::Naive,
            found: BackendType::Qt5,
        };
        let rendered = error.to_string();
        assert!(rendered.contains("naive"));
        assert!(rendered.contains("qt5"));
    }
}
